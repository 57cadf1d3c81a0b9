//! Workspace handle bundling configuration and both stores.

use crate::artifact_store::ArtifactStore;
use crate::config::{Config, CONFIG_FILE};
use crate::error::{Result, WorkstateError};
use crate::session_store::SessionStore;
use crate::TimeProvider;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A workspace base directory with its artifact and session stores.
///
/// The stores are independent; the workspace only constructs them from the
/// same configuration.
pub struct Workspace {
    config: Config,
    artifacts: ArtifactStore,
    sessions: SessionStore,
}

impl Workspace {
    /// Opens the workspace at `base`, reading `workstate.toml` if present.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for an invalid configuration file and
    /// `PathTraversalDenied` if a configured directory escapes `base`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use workstate_core::Workspace;
    ///
    /// let ws = Workspace::open(".").unwrap();
    /// println!("types: {:?}", ws.artifacts().types());
    /// ```
    pub fn open(base: impl AsRef<Path>) -> Result<Self> {
        let config = Config::load(base.as_ref())?;
        Self::from_config(config)
    }

    /// Initializes a new workspace: writes the default configuration and
    /// creates every collection and the sessions directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `workstate.toml` already exists or directory
    /// creation fails.
    pub fn init(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        if base.join(CONFIG_FILE).exists() {
            return Err(WorkstateError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("workspace already initialized: {}", base.display()),
            )));
        }

        fs::create_dir_all(base)?;
        let config = Config::with_base(base);
        config.save(base)?;

        let workspace = Self::from_config(config)?;
        for collection in workspace.artifacts.collections() {
            fs::create_dir_all(collection.root())?;
        }
        fs::create_dir_all(workspace.sessions.root())?;

        info!(base = %base.display(), "initialized workspace");
        Ok(workspace)
    }

    /// Builds both stores from an already-loaded configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let artifacts = ArtifactStore::new(&config)?;
        let sessions = SessionStore::new(&config)?;
        Ok(Self {
            config,
            artifacts,
            sessions,
        })
    }

    /// Sets one time provider for both stores.
    pub fn with_time_provider(self, provider: impl TimeProvider + 'static) -> Self {
        let shared: Arc<dyn TimeProvider> = Arc::new(provider);
        let for_sessions = Arc::clone(&shared);
        Self {
            config: self.config,
            artifacts: self.artifacts.with_time_provider(move || shared.now()),
            sessions: self.sessions.with_time_provider(move || for_sessions.now()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
