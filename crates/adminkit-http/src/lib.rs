//! AdminKit Request Pipeline
//!
//! Every API call goes through [`RequestPipeline::request`]:
//! - JSON defaults and the bearer token from the session store
//! - exactly one transport attempt, never retried here
//! - outcomes classified into Network / Unauthorized / Http / Parse
//! - a 401 tears down the whole session
//! - one user-facing notice per failure unless the caller opts out

mod error;
mod notify;
mod pipeline;
mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{status_message, ErrorKind, RequestError};
pub use notify::{LogNotifier, Notice, NoticeLevel, NotificationBus, Notifier};
pub use pipeline::{RequestOptions, RequestPipeline};
pub use transport::{HttpTransport, OutboundRequest, Transport, TransportError, TransportResponse};

pub use reqwest::Method;

/// Result of one pipeline execution
pub type RequestOutcome<T> = std::result::Result<T, RequestError>;
