//! Common test utilities for restman integration tests
//!
//! Provides item-parameter builders and runner helpers shared by the
//! wiremock-backed end-to-end tests.

#![allow(dead_code)]

use std::sync::Once;

use restman::client::HttpTransport;
use restman::core::Runner;
use restman::errors::Result;
use restman::host::{MemoryBinaryStore, MemoryCredentials, NoCredentials};
use restman::http::Method;
use restman::input::ItemParameters;
use restman::output::OutputItem;

static TRACING: Once = Once::new();

/// Install a tracing subscriber honoring RUST_LOG, once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// GET parameters for a bare URL with default options
pub fn get_item(url: &str) -> ItemParameters {
    ItemParameters {
        method: Method::Get,
        url: url.to_string(),
        ..ItemParameters::default()
    }
}

/// Run a single item with no credentials and an empty binary store
pub async fn run_one(params: ItemParameters) -> Result<OutputItem> {
    init_tracing();
    let runner = Runner::new(HttpTransport::new(), NoCredentials, MemoryBinaryStore::new())?;
    let mut outputs = runner.run(&[params]).await?;
    Ok(outputs.remove(0))
}

/// Run a single item under continue-on-fail
pub async fn run_one_continuing(params: ItemParameters) -> Result<OutputItem> {
    init_tracing();
    let runner = Runner::new(HttpTransport::new(), NoCredentials, MemoryBinaryStore::new())?
        .continue_on_fail(true);
    let mut outputs = runner.run(&[params]).await?;
    Ok(outputs.remove(0))
}

/// Run a single item with the given credentials
pub async fn run_one_with_credentials(
    params: ItemParameters,
    credentials: MemoryCredentials,
) -> Result<OutputItem> {
    init_tracing();
    let runner = Runner::new(HttpTransport::new(), credentials, MemoryBinaryStore::new())?;
    let mut outputs = runner.run(&[params]).await?;
    Ok(outputs.remove(0))
}

/// Run a single item with the given binary store
pub async fn run_one_with_binary(
    params: ItemParameters,
    store: MemoryBinaryStore,
) -> Result<OutputItem> {
    init_tracing();
    let runner = Runner::new(HttpTransport::new(), NoCredentials, store)?;
    let mut outputs = runner.run(&[params]).await?;
    Ok(outputs.remove(0))
}
