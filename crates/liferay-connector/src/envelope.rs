//! JSON document written for every collected item.

use crate::error::Result;
use crate::records::{Item, ResourceKind};
use chrono::Utc;
use serde::Serialize;

pub const BACKEND_NAME: &str = "liferay";
pub const BACKEND_VERSION: &str = env!("CARGO_PKG_VERSION");

/// An item together with the metadata derived from it
#[derive(Debug, Clone, Serialize)]
pub struct ItemEnvelope {
    pub backend_name: &'static str,
    pub backend_version: &'static str,
    pub origin: String,
    pub tag: String,
    pub uuid: String,
    pub updated_on: f64,
    pub category: ResourceKind,
    /// Wall-clock time the item was collected, seconds since the epoch
    pub fetched_on: f64,
    pub data: Item,
}

impl ItemEnvelope {
    /// Wrap an item; fails when the item has no `uuid` or `modifiedDate`
    ///
    /// The tag defaults to the origin.
    pub fn wrap(item: Item, origin: &str, tag: Option<&str>) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            backend_name: BACKEND_NAME,
            backend_version: BACKEND_VERSION,
            origin: origin.to_string(),
            tag: tag.unwrap_or(origin).to_string(),
            uuid: item.metadata_id()?,
            updated_on: item.metadata_updated_on()?,
            category: item.category(),
            fetched_on: now.timestamp_micros() as f64 / 1_000_000.0,
            data: item,
        })
    }
}
