//! Global constants used throughout buildpack-notify.
//!
//! Timeouts, page sizes, defaults and fixed strings that are shared across
//! modules live here so magic values stay discoverable.

use std::time::Duration;

/// Timeout for every request against the platform API (10 seconds).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size requested from V3 list endpoints.
pub const V3_PER_PAGE: u32 = 100;

/// Page size requested from V2 list endpoints.
pub const V2_RESULTS_PER_PAGE: u32 = 100;

/// Maximum number of response-body bytes kept in a [`crate::core::FetchError::Status`].
pub const ERROR_BODY_LIMIT: usize = 512;

/// Default SMTP port when `SMTP_PORT` is not set.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Default port of the health-check listener when `PORT` is not set.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default directory holding `mail/notify.tmpl`.
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";

/// Display name used in the `From` header of notification emails.
pub const SENDER_NAME: &str = "cloud.gov";

/// Subject prefix of notification emails.
pub const SUBJECT_PREFIX: &str = "Action required: restage your";
