//! Error handling for buildpack-notify.
//!
//! Each layer owns a strongly-typed error enum built with [`thiserror`]:
//!
//! - [`FetchError`] - platform API requests, pagination and authentication
//! - [`StoreError`] - the persisted buildpack freshness store
//! - [`TemplateError`] - loading and rendering the notification template
//! - [`MailError`] - building and delivering notification emails
//! - [`ConfigError`] - environment and bound-service configuration
//!
//! [`NotifyError`] aggregates them for the run pipeline. Every variant of
//! [`NotifyError`] is fatal to a run; per-item conditions (an app without a
//! current droplet, a user without a valid email address) are logged and
//! skipped and never surface as errors.
//!
//! At the CLI boundary errors travel as [`anyhow::Error`] and are converted
//! by [`user_friendly_error`] into an [`ErrorContext`] that carries details
//! and an actionable suggestion for the operator.

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while talking to the platform API.
///
/// A `FetchError` aborts the whole run: app and buildpack listings must be
/// complete for the outdated-app decision to be correct, so partially fetched
/// listings are discarded rather than returned.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("Unable to create the platform API client")]
    Client {
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be sent or its body could not be read.
    #[error("Request to {path} failed")]
    Request {
        /// Request path (or URL for authentication endpoints)
        path: String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// The platform answered with a non-success status code.
    #[error("Request to {path} returned HTTP {status}")]
    Status {
        /// Request path
        path: String,
        /// HTTP status code
        status: u16,
        /// Start of the response body, for diagnostics
        body: String,
    },

    /// The response body did not match the expected envelope.
    #[error("Unable to decode response from {path}")]
    Decode {
        /// Request path
        path: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A next-page link could not be turned into a request path.
    #[error("Invalid next-page link '{link}'")]
    InvalidLink {
        /// The link as returned by the server
        link: String,
    },

    /// A next-page link pointed back to a page that was already fetched.
    #[error("Pagination loop detected at {path}")]
    PaginationLoop {
        /// The repeated request path
        path: String,
    },

    /// The client-credentials token exchange was rejected.
    #[error("Authentication against {endpoint} failed: {reason}")]
    Auth {
        /// Token endpoint
        endpoint: String,
        /// Short reason (status code or missing token)
        reason: String,
    },
}

/// Failures of the persisted buildpack freshness store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database could not be opened or initialised.
    #[error("Unable to open freshness store at {location}")]
    Open {
        /// Database location as configured
        location: String,
        /// Underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// The directory that should hold the database file could not be created.
    #[error("Unable to create directory {path} for the freshness store")]
    Directory {
        /// Directory path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A statement against an open store failed.
    #[error("Freshness store {operation} failed")]
    Query {
        /// The store operation (load, save, clear)
        operation: &'static str,
        /// Underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },
}

/// Failures of the notification template.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The template file is missing or does not parse.
    #[error("Unable to load template {}", path.display())]
    Load {
        /// Path of the template file
        path: PathBuf,
        /// Underlying Tera error
        #[source]
        source: tera::Error,
    },

    /// The template failed while rendering an email.
    #[error("Unable to render template {name}")]
    Render {
        /// Registered template name
        name: String,
        /// Underlying Tera error
        #[source]
        source: tera::Error,
    },
}

/// Failures while building or delivering an email.
#[derive(Error, Debug)]
pub enum MailError {
    /// An address could not be parsed.
    #[error("Invalid email address '{address}'")]
    Address {
        /// The rejected address
        address: String,
        /// Underlying parse error
        #[source]
        source: lettre::address::AddressError,
    },

    /// TLS parameters or the trusted certificate could not be set up.
    #[error("Unable to configure SMTP TLS")]
    Tls(#[source] lettre::transport::smtp::Error),

    /// The message could not be assembled.
    #[error("Unable to build email message")]
    Build(#[source] lettre::error::Error),

    /// The SMTP server rejected or failed to accept the message.
    #[error("SMTP delivery failed")]
    Transport(#[source] lettre::transport::smtp::Error),

    /// Sending is disabled (dry-run).
    #[error("Email delivery is disabled")]
    Disabled,
}

/// Failures while reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required variables are absent from both the environment and `VCAP_SERVICES`.
    #[error("Missing required configuration: {}", variables.join(", "))]
    Missing {
        /// Names of every missing variable
        variables: Vec<String>,
    },

    /// A variable is present but unusable.
    #[error("Invalid value for {variable}: {reason}")]
    Invalid {
        /// Variable name
        variable: String,
        /// Why the value was rejected
        reason: String,
    },

    /// `VCAP_SERVICES` is not valid JSON in the bound-services shape.
    #[error("Unable to parse VCAP_SERVICES")]
    VcapServices(#[source] serde_json::Error),
}

/// Fatal errors of a notification run.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// See [`FetchError`].
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// See [`StoreError`].
    #[error(transparent)]
    Store(#[from] StoreError),

    /// See [`TemplateError`].
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// See [`MailError`].
    #[error(transparent)]
    Mail(#[from] MailError),

    /// A timestamp did not follow RFC 3339. This indicates an API contract
    /// violation (or a corrupted store row), never a per-app condition.
    #[error("Malformed timestamp '{value}' on {subject}")]
    InvalidTimestamp {
        /// What the timestamp belongs to, with its GUID
        subject: String,
        /// The raw value
        value: String,
        /// Underlying chrono error
        #[source]
        source: chrono::ParseError,
    },

    /// The health-check listener could not bind or serve.
    #[error("Health-check listener on {addr} failed")]
    Server {
        /// Bind address
        addr: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl NotifyError {
    /// The per-layer error this variant wraps, if any.
    fn layer(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(error) => Some(error),
            Self::Fetch(error) => Some(error),
            Self::Store(error) => Some(error),
            Self::Template(error) => Some(error),
            Self::Mail(error) => Some(error),
            Self::InvalidTimestamp { .. } | Self::Server { .. } => None,
        }
    }
}

/// User-facing presentation of an error, with optional details and suggestion.
///
/// # Examples
///
/// ```rust,no_run
/// use buildpack_notify::core::ErrorContext;
///
/// let context = ErrorContext::new(anyhow::anyhow!("Unable to reach the platform API"))
///     .with_suggestion("Check CF_API and network connectivity")
///     .with_details("The run was aborted before any email was sent");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: anyhow::Error,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error with no details or suggestion.
    #[must_use]
    pub const fn new(error: anyhow::Error) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {:#}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with operator guidance.
///
/// The error chain is searched for the typed errors of this crate so that the
/// guidance still applies when the error was wrapped with extra context.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(fetch) = find_in_chain::<FetchError>(&error) {
        let (details, suggestion) = fetch_guidance(fetch);
        return ErrorContext::new(error).with_details(details).with_suggestion(suggestion);
    }

    if let Some(store) = find_in_chain::<StoreError>(&error) {
        let details = match store {
            StoreError::Open { .. } | StoreError::Directory { .. } => {
                "The freshness database could not be opened"
            }
            StoreError::Query { .. } => "The freshness database rejected a statement",
        };
        return ErrorContext::new(error)
            .with_details(details)
            .with_suggestion(
                "Check DATABASE_URL and file permissions, or run with --clear to reset the store",
            );
    }

    if let Some(config) = find_in_chain::<ConfigError>(&error) {
        let suggestion = match config {
            ConfigError::Missing { .. } => {
                "Set the missing variables in the environment or bind a service that provides them"
            }
            ConfigError::Invalid { .. } => "Correct the variable and run again",
            ConfigError::VcapServices(_) => {
                "VCAP_SERVICES must be the JSON object provided by the platform"
            }
        };
        return ErrorContext::new(error).with_suggestion(suggestion);
    }

    if let Some(template) = find_in_chain::<TemplateError>(&error) {
        let missing_file = matches!(template, TemplateError::Load { .. });
        let context = ErrorContext::new(error);
        return if missing_file {
            context
                .with_suggestion("Run from the directory containing templates/ or set TEMPLATE_DIR")
        } else {
            context.with_details("The notification template references data that was not provided")
        };
    }

    match find_in_chain::<NotifyError>(&error) {
        Some(NotifyError::InvalidTimestamp { .. }) => ErrorContext::new(error)
            .with_details("The platform API returned a timestamp that is not RFC 3339")
            .with_suggestion(
                "Inspect the named resource through the API; no notifications were sent",
            ),
        Some(NotifyError::Server { .. }) => {
            ErrorContext::new(error).with_suggestion("Check that PORT is free and valid")
        }
        _ => ErrorContext::new(error),
    }
}

/// Find `E` in the chain, looking through the transparent [`NotifyError`] variants.
fn find_in_chain<E: std::error::Error + 'static>(error: &anyhow::Error) -> Option<&E> {
    error.chain().find_map(|cause| {
        cause.downcast_ref::<E>().or_else(|| {
            cause
                .downcast_ref::<NotifyError>()
                .and_then(NotifyError::layer)
                .and_then(|layer| layer.downcast_ref::<E>())
        })
    })
}

fn fetch_guidance(error: &FetchError) -> (&'static str, &'static str) {
    match error {
        FetchError::Auth { .. } => (
            "The client-credentials token exchange was rejected",
            "Verify CLIENT_ID and CLIENT_SECRET and that the client has cloud_controller.admin_read_only",
        ),
        FetchError::Client { .. } | FetchError::Request { .. } => (
            "The platform API could not be reached",
            "Check CF_API, network connectivity, and set INSECURE=1 only for self-signed test environments",
        ),
        FetchError::Status { .. } => (
            "The platform API answered with an error status",
            "Re-run the job; if it persists inspect the API response body with --verbose",
        ),
        FetchError::Decode { .. }
        | FetchError::InvalidLink { .. }
        | FetchError::PaginationLoop { .. } => (
            "The platform API returned a response this job does not understand",
            "Check that CF_API points at a Cloud Foundry API with V2 and V3 endpoints enabled",
        ),
    }
}
