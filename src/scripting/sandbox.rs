//! QuickJS sandbox for assertion scripts
//!
//! Each run gets a fresh context: the `__pm` snapshot and the native test
//! recorder are injected, the bootstrap builds the frozen `pm` object, then
//! the user script is evaluated under a memory limit and a wall-clock
//! deadline enforced through the runtime's interrupt handler. Failures of
//! the script itself are contained here and never propagate as host errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Function, Runtime, Value};
use tracing::debug;

use crate::errors::{RestmanError, Result};

use super::pm::{PmContext, PM_BOOTSTRAP};
use super::{AssertionRun, RunOutcome, TestResult, TestSummary};

/// Wall-clock execution budget for one script run
pub const EXECUTION_BUDGET: Duration = Duration::from_millis(3000);

/// Memory limit per runtime, to stop runaway scripts
const MEMORY_LIMIT: usize = 64 * 1024 * 1024;

/// Max stack size
const MAX_STACK_SIZE: usize = 1024 * 1024;

/// Assertion sandbox engine
pub struct SandboxEngine {
    runtime: Runtime,
    budget: Duration,
}

impl SandboxEngine {
    /// Create an engine with the default 3-second budget
    pub fn new() -> Result<Self> {
        Self::with_budget(EXECUTION_BUDGET)
    }

    /// Create an engine with a custom wall-clock budget
    pub fn with_budget(budget: Duration) -> Result<Self> {
        let runtime = Runtime::new()
            .map_err(|e| RestmanError::Script(format!("Failed to create JS runtime: {}", e)))?;
        runtime.set_memory_limit(MEMORY_LIMIT);
        runtime.set_max_stack_size(MAX_STACK_SIZE);
        Ok(Self { runtime, budget })
    }

    /// Execute a test script against the given snapshot and collect the
    /// recorded results.
    ///
    /// Returns `Err` only for engine-level faults (context creation or
    /// bootstrap failure); anything the user script does wrong comes back
    /// as failing test results inside `Ok`.
    pub fn run(&self, script: &str, pm: &PmContext) -> Result<AssertionRun> {
        let results: Arc<Mutex<Vec<TestResult>>> = Arc::new(Mutex::new(Vec::new()));
        let timed_out = Arc::new(AtomicBool::new(false));

        let deadline = Instant::now() + self.budget;
        {
            let timed_out = Arc::clone(&timed_out);
            self.runtime.set_interrupt_handler(Some(Box::new(move || {
                if Instant::now() >= deadline {
                    timed_out.store(true, Ordering::SeqCst);
                    true
                } else {
                    false
                }
            })));
        }

        let context = Context::full(&self.runtime)
            .map_err(|e| RestmanError::Script(format!("Failed to create JS context: {}", e)))?;

        let script = script.to_string();
        let eval_error = context.with(|ctx| -> Result<Option<String>> {
            self.prepare(&ctx, pm, Arc::clone(&results))?;
            match ctx.eval::<Value, _>(script.into_bytes()).catch(&ctx) {
                Ok(_) => Ok(None),
                Err(caught) => Ok(Some(caught_message(caught))),
            }
        });

        // Clear the handler so the deadline cannot leak into a later run.
        self.runtime.set_interrupt_handler(None);
        let eval_error = eval_error?;

        let mut collected = match results.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        let outcome = match eval_error {
            None => RunOutcome::Completed,
            Some(_) if timed_out.load(Ordering::SeqCst) => {
                collected.push(TestResult::fail(
                    "script timeout",
                    format!(
                        "script execution exceeded {} ms and was interrupted",
                        self.budget.as_millis()
                    ),
                ));
                RunOutcome::TimedOut
            }
            Some(message) => {
                collected.push(TestResult::fail("script error", message));
                RunOutcome::ScriptError
            }
        };

        let summary = TestSummary::from_results(collected);
        debug!(
            passed = summary.passed,
            failed = summary.failed,
            outcome = ?outcome,
            "assertion run finished"
        );
        Ok(AssertionRun { summary, outcome })
    }

    /// Inject the snapshot and recorder, then evaluate the bootstrap, which
    /// consumes and removes both injected globals. Only `pm`, `chai`, and
    /// `expect` remain visible to the user script.
    fn prepare<'js>(
        &self,
        ctx: &Ctx<'js>,
        pm: &PmContext,
        results: Arc<Mutex<Vec<TestResult>>>,
    ) -> Result<()> {
        let payload = serde_json::to_string(&pm.to_json())?;
        let snapshot = ctx.json_parse(payload.into_bytes())?;
        ctx.globals().set("__pm", snapshot)?;

        let recorder = Function::new(
            ctx.clone(),
            move |name: String, passed: bool, error: Option<String>| {
                let result = if passed {
                    TestResult::pass(name)
                } else {
                    TestResult::fail(
                        name,
                        error.unwrap_or_else(|| "assertion failed".to_string()),
                    )
                };
                match results.lock() {
                    Ok(mut guard) => guard.push(result),
                    Err(poisoned) => poisoned.into_inner().push(result),
                }
            },
        )?;
        ctx.globals().set("__record", recorder)?;

        ctx.eval::<Value, _>(PM_BOOTSTRAP.as_bytes())
            .catch(ctx)
            .map_err(|e| RestmanError::Script(format!("sandbox bootstrap: {}", caught_message(e))))?;

        Ok(())
    }
}

/// Extract a readable message from a caught JavaScript error
fn caught_message(caught: CaughtError<'_>) -> String {
    match caught {
        CaughtError::Exception(exception) => exception
            .message()
            .unwrap_or_else(|| "unknown script exception".to_string()),
        CaughtError::Value(value) => format!("{:?}", value),
        CaughtError::Error(error) => error.to_string(),
    }
}
