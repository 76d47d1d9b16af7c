//! Liferay connector library.
//!
//! Collects users, blog entries and message board messages from a Liferay
//! site through its JSON web services, enriching entries and messages with
//! the identity of their author.

pub mod api;
pub mod collector;
pub mod envelope;
pub mod error;
pub mod fetcher;
pub mod identity;
pub mod records;

#[cfg(test)]
mod test_helpers;

pub use api::{Archive, Credentials, HttpTransport, RecordingTransport, ReplayTransport, Transport};
pub use collector::{CollectorStats, ItemStream, LiferayCollector};
pub use envelope::ItemEnvelope;
pub use error::{LiferayError, Result};
pub use fetcher::{PageCursor, PaginatedFetcher, MAX_RESULTS};
pub use identity::{Identity, IdentityIndex};
pub use records::{CategoryId, EntityId, EntityRecord, GroupId, Item, ResourceKind, UserId};
