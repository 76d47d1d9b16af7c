//! Transports for the Liferay JSON web services.
//!
//! The fetcher only depends on the [`Transport`] trait. A live [`HttpTransport`]
//! can be wrapped by a [`RecordingTransport`] to archive every exchange, and a
//! [`ReplayTransport`] serves a previous recording without network access.

pub mod archive;
pub mod client;
pub mod transport;
pub mod types;

pub use archive::{Archive, ArchivedExchange, RecordingTransport, ReplayTransport};
pub use client::{Credentials, HttpTransport};
pub use transport::Transport;
pub use types::{urijoin, Method, Payload, Response};
