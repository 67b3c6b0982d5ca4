//! Sandboxed assertion execution
//!
//! Executes an optional user test script against the normalized response
//! inside an isolated, time-bounded QuickJS context that exposes a frozen,
//! Postman-compatible `pm` object. Two independent containment layers apply:
//! `pm.test` swallows assertion throws into recorded failures, and the
//! engine boundary converts uncaught script errors or deadline overruns
//! into a single synthetic failing result, so no script content can crash
//! the host process.

pub mod pm;
pub mod sandbox;

pub use pm::{PmContext, VariableStores};
pub use sandbox::SandboxEngine;

use serde::Serialize;

/// One named pass/fail result recorded by `pm.test`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
        }
    }

    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregated per-item test results, in recording order
#[derive(Debug, Clone, Serialize)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<TestResult>,
}

impl TestSummary {
    pub fn from_results(results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|t| t.passed).count();
        let failed = results.len() - passed;
        Self {
            passed,
            failed,
            results,
        }
    }
}

/// Terminal state of one sandbox run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// An uncaught script-level error ended the run early
    ScriptError,
    /// The wall-clock execution budget expired
    TimedOut,
}

/// Result of one assertion run
#[derive(Debug, Clone)]
pub struct AssertionRun {
    pub summary: TestSummary,
    pub outcome: RunOutcome,
}
