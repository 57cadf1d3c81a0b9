//! Identifier, slug, and filename helpers.
//!
//! Everything here is a pure function of its inputs so the allocation rules
//! can be tested without a filesystem.

use crate::config::NamingStrategy;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Maximum slug length in characters.
pub const SLUG_MAX_LEN: usize = 50;

/// Number of digits in a formatted sequence number.
pub const SEQUENCE_WIDTH: usize = 6;

const SLUG_FALLBACK: &str = "issue";
const PLAN_STEP_PREFIX: &str = "plan-step-";

static SLUG_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_\s-]").expect("valid slug strip pattern"));
static SLUG_COLLAPSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_-]+").expect("valid slug collapse pattern"));
// At most six digits: 13-digit epoch-millis filenames are not legacy ids.
static LEGACY_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,6})-").expect("valid legacy id pattern"));

/// Converts a title into a filename-safe slug.
///
/// Lowercases, drops anything that is not a word character, whitespace, or
/// hyphen, collapses separator runs into one hyphen, trims hyphens, and
/// truncates to [`SLUG_MAX_LEN`]. A leading `plan-step-` is removed. Empty
/// results fall back to `issue`.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = SLUG_STRIP.replace_all(&lowered, "");
    let collapsed = SLUG_COLLAPSE.replace_all(&stripped, "-");
    let trimmed = collapsed.trim_matches('-');
    let truncated: String = trimmed.chars().take(SLUG_MAX_LEN).collect();

    let slug = match truncated.strip_prefix(PLAN_STEP_PREFIX) {
        Some(rest) => rest.to_string(),
        None => truncated,
    };

    if slug.is_empty() {
        SLUG_FALLBACK.to_string()
    } else {
        slug
    }
}

/// Formats an artifact id, e.g. `ISS-000042`.
pub fn format_id(prefix: &str, sequence: u32) -> String {
    format!("{}-{:0width$}", prefix, sequence, width = SEQUENCE_WIDTH)
}

/// Extracts the sequence number of a `{prefix}-{digits}` id found anywhere
/// in `name`.
pub fn prefixed_sequence(name: &str, prefix: &str) -> Option<u32> {
    let needle = format!("{}-", prefix);
    let mut search_from = 0;

    while let Some(pos) = name[search_from..].find(&needle) {
        let start = search_from + pos;
        // The prefix must not be the tail of a longer word (e.g. "XISS-").
        let boundary = name[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        let digits: String = name[start + needle.len()..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();

        if boundary && !digits.is_empty() {
            if let Ok(n) = digits.parse::<u32>() {
                return Some(n);
            }
        }
        search_from = start + needle.len();
    }

    None
}

/// Extracts the sequence number of a legacy bare-numeric name (`0042-foo.md`).
pub fn legacy_sequence(name: &str) -> Option<u32> {
    LEGACY_NUMERIC
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Returns the next free sequence number for `prefix` given every name
/// currently present in a collection (root and archived).
///
/// Recognizes both `{prefix}-{digits}` and legacy bare-numeric names and
/// returns `max + 1`, or `1` when nothing matches.
pub fn next_sequence<'a>(names: impl IntoIterator<Item = &'a str>, prefix: &str) -> u32 {
    names
        .into_iter()
        .filter_map(|name| prefixed_sequence(name, prefix).or_else(|| legacy_sequence(name)))
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Derives an id from a filename for files whose header carries none.
pub fn id_from_filename(file_name: &str, prefix: &str) -> Option<String> {
    if let Some(n) = prefixed_sequence(file_name, prefix) {
        return Some(format_id(prefix, n));
    }
    LEGACY_NUMERIC
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Builds the filename for a new artifact.
pub fn artifact_filename(
    strategy: NamingStrategy,
    id: &str,
    slug: &str,
    now: DateTime<Utc>,
) -> String {
    match strategy {
        NamingStrategy::Counter => format!("{}-{}.md", id, slug),
        NamingStrategy::Slug => format!("{}-{}.md", slug, id),
        NamingStrategy::Timestamp => format!("{}-{}.md", now.timestamp_millis(), slug),
    }
}
