//! E2E test harness for workstate.
//!
//! Builders, variants, and helpers here are shared by every scenario module;
//! not every scenario uses all of them.

#![allow(dead_code)]

pub mod scenario;
pub mod steps;
pub mod workspace;

pub use assertions::Assertion;
pub use clock::MockClock;
pub use scenario::Scenario;
pub use workspace::TestWorkspace;
