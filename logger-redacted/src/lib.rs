//! Sensitive-field redaction for audit payloads and log output
//!
//! Audit entries must never persist raw values for credential-ish or
//! identifier-ish fields. Two layers of defense live here:
//!
//! - a key heuristic: any map key containing `password`, `token`, `secret`,
//!   `key`, `ssn`, or `credit_card` (case-insensitive substring) has its
//!   value replaced with the redaction marker before anything is written;
//! - a pattern scrubber: string values are scanned for SSN and card-number
//!   shapes, so PII pasted into an innocuous field is caught too.
//!
//! Scrubbed values can optionally be replaced by a short content hash so log
//! lines remain correlatable without carrying the original value.

pub mod redactor;

pub use redactor::*;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the process-wide tracing subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`. Safe to call once per
/// process; test binaries should prefer `try_init_tracing`.
pub fn init_tracing() {
    let _ = try_init_tracing();
}

/// Fallible variant for tests, where several crates may race to install
/// the subscriber.
pub fn try_init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).try_init()
}
