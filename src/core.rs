//! Per-item request pipeline
//!
//! [`Runner`] drives the full flow for each input item: body construction,
//! descriptor assembly, auth resolution, dispatch, response normalization,
//! the optional assertion run, and output composition. Items are strictly
//! sequential; item N fully completes (or fails) before item N+1 begins,
//! and nothing mutable is shared between them.

use std::time::Instant;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::auth::AuthContext;
use crate::client::Transport;
use crate::errors::{RestmanError, Result};
use crate::host::{BinaryStore, CredentialProvider, OAUTH2_CREDENTIAL, POSTMAN_AUTH_CREDENTIAL};
use crate::input::ItemParameters;
use crate::output::{self, OutputItem};
use crate::request::{RequestBody, RequestDescriptor};
use crate::response::NormalizedResponse;
use crate::scripting::{PmContext, RunOutcome, SandboxEngine, TestSummary, VariableStores};

/// Drives one batch of items through the request pipeline
pub struct Runner<T, C, B> {
    transport: T,
    credentials: C,
    binary: B,
    engine: SandboxEngine,
    /// When set, per-item failures become captured error outputs instead of
    /// aborting the batch, and failing assertions do not raise.
    continue_on_fail: bool,
    request_name: String,
}

impl<T, C, B> Runner<T, C, B>
where
    T: Transport,
    C: CredentialProvider,
    B: BinaryStore,
{
    pub fn new(transport: T, credentials: C, binary: B) -> Result<Self> {
        Ok(Self {
            transport,
            credentials,
            binary,
            engine: SandboxEngine::new()?,
            continue_on_fail: false,
            request_name: "Postman Request".to_string(),
        })
    }

    pub fn continue_on_fail(mut self, enabled: bool) -> Self {
        self.continue_on_fail = enabled;
        self
    }

    /// Display name surfaced to scripts as `pm.info.requestName`
    pub fn request_name(mut self, name: impl Into<String>) -> Self {
        self.request_name = name.into();
        self
    }

    /// Process a batch of items in order.
    ///
    /// Under continue-on-fail a failed item yields an `{error, stack}`
    /// output tagged with its index and the batch keeps going; otherwise
    /// the first failure aborts the whole run.
    pub async fn run(&self, items: &[ItemParameters]) -> Result<Vec<OutputItem>> {
        let mut outputs = Vec::with_capacity(items.len());
        for (index, params) in items.iter().enumerate() {
            match self.run_item(index, items.len(), params).await {
                Ok(item) => outputs.push(item),
                Err(error) if self.continue_on_fail => {
                    warn!(item = index, %error, "item failed, continuing");
                    outputs.push(output::error_item(&error, index));
                }
                Err(error) => return Err(error),
            }
        }
        Ok(outputs)
    }

    async fn run_item(
        &self,
        index: usize,
        count: usize,
        params: &ItemParameters,
    ) -> Result<OutputItem> {
        let body = RequestBody::build(params, index, &self.binary)?;
        let mut descriptor = RequestDescriptor::assemble(params, body);

        let auth = AuthContext::from_credential(self.credentials.get(POSTMAN_AUTH_CREDENTIAL));

        debug!(item = index, method = %descriptor.method, url = %descriptor.url, "running item");
        let started = Instant::now();
        let raw = if auth.is_oauth2() {
            let credential = self
                .credentials
                .get(OAUTH2_CREDENTIAL)
                .unwrap_or(JsonValue::Null);
            self.transport.dispatch_oauth2(&credential, &descriptor).await?
        } else {
            auth.apply(&mut descriptor);
            self.transport.dispatch(&descriptor).await?
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        // A response without a content-type inherits the request's own.
        let fallback = descriptor.header("content-type").map(str::to_string);
        let response = NormalizedResponse::from_raw(
            raw,
            params.options.response_format,
            fallback.as_deref(),
            elapsed_ms,
        );

        response.check_status(params.options.fail_on_error)?;

        let summary = self.run_assertions(index, count, params, &descriptor, &response)?;
        if let Some(summary) = &summary {
            if summary.failed > 0 && !self.continue_on_fail {
                return Err(RestmanError::AssertionsFailed(summary.failed));
            }
        }

        output::compose(&params.options, &response, summary.as_ref(), index, &self.binary)
    }

    /// Run the item's test script, if any. The summary always carries the
    /// results recorded so far plus any synthetic script-error or timeout
    /// failure; script misbehavior never surfaces as a host error.
    fn run_assertions(
        &self,
        index: usize,
        count: usize,
        params: &ItemParameters,
        descriptor: &RequestDescriptor,
        response: &NormalizedResponse,
    ) -> Result<Option<TestSummary>> {
        if !params.enable_assertions || params.assertions.trim().is_empty() {
            return Ok(None);
        }

        let stores = VariableStores::default();
        let pm = PmContext::from_parts(
            index,
            count,
            &self.request_name,
            descriptor,
            response,
            &stores,
        );
        let run = self.engine.run(&params.assertions, &pm)?;
        if run.outcome != RunOutcome::Completed {
            debug!(item = index, outcome = ?run.outcome, "assertion run ended early");
        }
        Ok(Some(run.summary))
    }
}
