//! Restman library interface
//!
//! This crate performs Postman-style HTTP requests on behalf of a host
//! workflow runtime and optionally evaluates user-supplied test scripts
//! against the response inside a sandboxed JavaScript engine exposing a
//! Postman-compatible `pm` object.
//!
//! # Module Organization
//!
//! - [`errors`] - Error types (RestmanError, Result)
//! - [`input`] - Per-item parameters consumed from the host
//! - [`request`] - Request body building and descriptor assembly
//! - [`client`] - Transport interface and reqwest implementation
//! - [`response`] - Response normalization
//! - [`scripting`] - The assertion sandbox engine
//! - [`output`] - Output item composition
//! - [`core`] - Per-item execution pipeline

pub mod auth;
pub mod client;
pub mod cookies;
pub mod core;
pub mod errors;
pub mod host;
pub mod http;
pub mod input;
pub mod mime;
pub mod output;
pub mod request;
pub mod response;
pub mod scripting;
