//! Core error types and timestamp handling shared by every stage of a run.
//!
//! # Modules
//!
//! - `error` - per-layer error enums, [`NotifyError`], and the CLI-facing
//!   [`ErrorContext`] produced by [`user_friendly_error`]
//! - `time` - strict RFC 3339 parsing used by every timestamp comparison

pub mod error;
pub mod time;

pub use error::{
    ConfigError, ErrorContext, FetchError, MailError, NotifyError, StoreError, TemplateError,
    user_friendly_error,
};
pub use time::parse_timestamp;
