//! HTTP protocol types

pub mod method;

pub use method::Method;
