//! Error handling for Rally Tools
//!
//! This module provides the error types and user-friendly error reporting used across
//! the crate. The error system is designed around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`RallyError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Environment guards**: [`RallyError::UnconfiguredEnv`], [`RallyError::ProtectedEnv`]
//! - **Remote API**: [`RallyError::ApiError`], [`RallyError::MalformedPagination`],
//!   [`RallyError::Timeout`], [`RallyError::NetworkError`]
//! - **Lookup**: [`RallyError::EntityNotFound`]
//! - **Configuration and I/O**: [`RallyError::ConfigError`], [`RallyError::Io`],
//!   [`RallyError::Json`], [`RallyError::Toml`]
//!
//! None of these errors are retried. Library code propagates them through
//! [`anyhow::Result`] with added context; the CLI converts whatever reaches the top
//! level with [`user_friendly_error`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use rally_cli::core::{RallyError, user_friendly_error};
//!
//! let error = anyhow::Error::from(RallyError::UnconfiguredEnv {
//!     env: "DEV".to_string(),
//! });
//! let ctx = user_friendly_error(error);
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for Rally Tools operations
///
/// Each variant describes one specific failure mode and carries the data needed to
/// explain it to a user (environment name, HTTP status, offending link).
///
/// # Examples
///
/// ```rust,no_run
/// use rally_cli::core::RallyError;
///
/// fn handle_error(error: RallyError) {
///     match error {
///         RallyError::UnconfiguredEnv { env } => {
///             eprintln!("Add an [api.{env}] section to your config");
///         }
///         RallyError::ApiError { status, .. } if status == 401 => {
///             eprintln!("Check your API key");
///         }
///         _ => eprintln!("Unexpected error: {error}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum RallyError {
    /// No API configuration exists for the requested environment
    #[error("Unconfigured environment: {env}")]
    UnconfiguredEnv {
        /// The environment that was requested
        env: String,
    },

    /// A mutating operation targeted a guarded environment without `--no-protect`
    ///
    /// `PROD` is always guarded; `UAT` is guarded when `restrict_uat` is set.
    #[error("Protected environment: {env}")]
    ProtectedEnv {
        /// The guarded environment
        env: String,
    },

    /// The remote service answered with an unexpected status code
    #[error("Request returned {status}: {method} {url}")]
    ApiError {
        /// HTTP status code returned by the service
        status: u16,
        /// HTTP method of the failed request
        method: String,
        /// Full URL of the failed request
        url: String,
        /// Response body, kept for diagnostics
        body: String,
    },

    /// The `last` pagination link did not carry a `page=<N>p<size>` marker
    #[error("Malformed pagination link: {link}")]
    MalformedPagination {
        /// The link that failed to parse (empty if it was missing)
        link: String,
    },

    /// A request did not complete within the configured timeout
    #[error("Request timed out after {seconds}s: {url}")]
    Timeout {
        /// URL of the request that timed out
        url: String,
        /// The timeout that elapsed
        seconds: u64,
    },

    /// The request could not be sent or its body could not be read
    #[error("Network error during {operation}: {reason}")]
    NetworkError {
        /// What was being attempted
        operation: String,
        /// Underlying transport error
        reason: String,
    },

    /// A named entity could not be found in an environment
    #[error("No {kind} found by name '{name}' in {env}")]
    EntityNotFound {
        /// Entity kind, e.g. "rule"
        kind: String,
        /// The name that was searched for
        name: String,
        /// Environment that was searched
        env: String,
    },

    /// Global configuration is missing a required value or is invalid
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// I/O error from [`std::io::Error`]
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error from [`serde_json::Error`]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error from [`toml::de::Error`]
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Anything else, with a free-form message
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for RallyError {
    fn clone(&self) -> Self {
        match self {
            Self::UnconfiguredEnv {
                env,
            } => Self::UnconfiguredEnv {
                env: env.clone(),
            },
            Self::ProtectedEnv {
                env,
            } => Self::ProtectedEnv {
                env: env.clone(),
            },
            Self::ApiError {
                status,
                method,
                url,
                body,
            } => Self::ApiError {
                status: *status,
                method: method.clone(),
                url: url.clone(),
                body: body.clone(),
            },
            Self::MalformedPagination {
                link,
            } => Self::MalformedPagination {
                link: link.clone(),
            },
            Self::Timeout {
                url,
                seconds,
            } => Self::Timeout {
                url: url.clone(),
                seconds: *seconds,
            },
            Self::NetworkError {
                operation,
                reason,
            } => Self::NetworkError {
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::EntityNotFound {
                kind,
                name,
                env,
            } => Self::EntityNotFound {
                kind: kind.clone(),
                name: name.clone(),
                env: env.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io/json/toml errors are not Clone; keep their message
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Json(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::Toml(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying a suggestion and extra details for CLI display
///
/// # Examples
///
/// ```rust,no_run
/// use rally_cli::core::{RallyError, ErrorContext};
///
/// let context = ErrorContext::new(RallyError::ProtectedEnv { env: "PROD".into() })
///     .with_suggestion("Pass --no-protect if you really mean to modify PROD")
///     .with_details("Mutating requests against PROD are refused by default");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: RallyError,
    /// Actionable next step for the user
    pub suggestion: Option<String>,
    /// Extra explanation of what went wrong
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: RallyError) -> Self {
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

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

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
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognises [`RallyError`] anywhere in the error chain (so `.context(..)` wrappers
/// added on the way up do not hide it), plus a few standard library errors. Anything
/// else is reported with its full cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(ctx) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: ctx.error.clone(),
            suggestion: ctx.suggestion.clone(),
            details: ctx.details.clone(),
        };
    }

    if let Some(rally_error) = error.chain().find_map(|e| e.downcast_ref::<RallyError>()) {
        let mut ctx = create_error_context(rally_error.clone());
        // Outer context messages say what was being attempted
        let attempted: Vec<String> = error
            .chain()
            .take_while(|e| e.downcast_ref::<RallyError>().is_none())
            .map(|e| e.to_string())
            .collect();
        if !attempted.is_empty() {
            let attempted = attempted.join(": ");
            ctx.details = Some(match ctx.details.take() {
                Some(details) => format!("{attempted}\n{details}"),
                None => attempted,
            });
        }
        return ctx;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(RallyError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check the permissions of the repository directory")
                .with_details("Rally Tools could not read or write a file");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(RallyError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(RallyError::Other {
        message,
    })
}

fn create_error_context(error: RallyError) -> ErrorContext {
    match &error {
        RallyError::UnconfiguredEnv {
            env,
        } => {
            let env = env.clone();
            ErrorContext::new(error)
                .with_suggestion(format!(
                    "Add an [api.{env}] section with `url` and `key` to ~/.rally/config.toml"
                ))
                .with_details("Every environment needs its own API URL and key")
        }
        RallyError::ProtectedEnv {
            env,
        } => {
            let env = env.clone();
            ErrorContext::new(error)
                .with_suggestion("Re-run with --no-protect if the change is intended")
                .with_details(format!("Mutating requests against {env} are refused by default"))
        }
        RallyError::ApiError {
            status,
            body,
            ..
        } => {
            let suggestion = match *status {
                401 | 403 => "Check the API key configured for this environment",
                404 => "Check that the entity still exists on the remote environment",
                s if s >= 500 => "The Rally API may be down; try again later",
                _ => "Run with --verbose to see every request that was issued",
            };
            let details = if body.is_empty() {
                "The response body was empty".to_string()
            } else {
                format!("Response body: {body}")
            };
            ErrorContext::new(error).with_suggestion(suggestion).with_details(details)
        }
        RallyError::MalformedPagination {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check that the API URL points at the Rally v2 API")
            .with_details("Collection responses must carry a `links.last` URL containing `page=<N>p<size>`"),
        RallyError::Timeout {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Raise `request_timeout_secs` in the global config or check your network connection",
        ),
        RallyError::NetworkError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check your network connection and the configured API URL"),
        RallyError::EntityNotFound {
            kind,
            env,
            ..
        } => {
            let hint = format!("Use 'rally {kind} list --env {env}' to see available names");
            ErrorContext::new(error).with_suggestion(hint)
        }
        RallyError::ConfigError {
            ..
        }
        | RallyError::Toml(_) => ErrorContext::new(error)
            .with_suggestion("Check the syntax of ~/.rally/config.toml (or the file passed with --config)"),
        _ => ErrorContext::new(error),
    }
}
