//! Entity records returned by the Liferay JSON web services.
//!
//! Records are kept schema-on-read: the raw JSON object is preserved as-is and
//! the handful of fields the connector relies on are exposed through typed
//! accessors.

use crate::error::{LiferayError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub const USER_ID: &str = "userId";
pub const SCREEN_NAME: &str = "screenName";
pub const EMAIL_ADDRESS: &str = "emailAddress";
pub const ENTRY_ID: &str = "entryId";
pub const MESSAGE_ID: &str = "messageId";
pub const UUID: &str = "uuid";
pub const MODIFIED_DATE: &str = "modifiedDate";
pub const CATEGORY_ID: &str = "categoryId";

/// Identifier as reported by the API: Liferay mostly uses integers, but
/// nothing stops a deployment from returning strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Int(i64),
    Str(String),
}

/// Site scope for every query
pub type GroupId = EntityId;
/// Message board category
pub type CategoryId = EntityId;
/// Key of the identity index
pub type UserId = EntityId;

impl EntityId {
    /// Read an identifier from a JSON value; floats, booleans and nulls are not ids
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(id) = n.as_i64() {
                    return Some(EntityId::Int(id));
                }
                // Some servers encode ids as integral doubles
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                        Some(EntityId::Int(f as i64))
                    }
                    _ => {
                        warn!(id = %n, "Id is not a 64-bit integer, ignoring it");
                        None
                    }
                }
            }
            Value::String(s) => Some(EntityId::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            EntityId::Int(n) => Value::from(*n),
            EntityId::Str(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{}", n),
            EntityId::Str(s) => f.write_str(s),
        }
    }
}

impl FromStr for EntityId {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => EntityId::Int(n),
            Err(_) => EntityId::Str(s.to_string()),
        })
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Int(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Str(s.to_string())
    }
}

/// The three kinds of entity the connector walks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    BlogEntry,
    Message,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::BlogEntry => "blog_entry",
            ResourceKind::Message => "message",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user, blog entry, or message board message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRecord(Map<String, Value>);

/// The unit yielded to consumers: a record, enriched when its author is known
pub type Item = EntityRecord;

impl EntityRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.get(USER_ID).and_then(EntityId::from_json)
    }

    pub fn screen_name(&self) -> Option<&str> {
        self.get(SCREEN_NAME).and_then(Value::as_str)
    }

    pub fn email_address(&self) -> Option<&str> {
        self.get(EMAIL_ADDRESS).and_then(Value::as_str)
    }

    /// Classify by structure: `entryId` wins over `messageId`, anything else is a user
    pub fn category(&self) -> ResourceKind {
        if self.contains(ENTRY_ID) {
            ResourceKind::BlogEntry
        } else if self.contains(MESSAGE_ID) {
            ResourceKind::Message
        } else {
            ResourceKind::User
        }
    }

    /// Stable identifier of the record within a Liferay server
    pub fn metadata_id(&self) -> Result<String> {
        match self.get(UUID) {
            None | Some(Value::Null) => Err(LiferayError::missing(UUID)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
        }
    }

    /// Last modification time in seconds since the Unix epoch
    ///
    /// `modifiedDate` carries milliseconds.
    pub fn metadata_updated_on(&self) -> Result<f64> {
        match self.get(MODIFIED_DATE) {
            None | Some(Value::Null) => Err(LiferayError::missing(MODIFIED_DATE)),
            Some(value) => value
                .as_f64()
                .map(|millis| millis / 1000.0)
                .ok_or(LiferayError::Schema {
                    field: MODIFIED_DATE,
                    problem: "not numeric",
                }),
        }
    }
}

/// Decode one page of a list call into records
pub fn parse_page(url: &str, text: &str) -> Result<Vec<EntityRecord>> {
    serde_json::from_str(text).map_err(|e| LiferayError::parse(url, e))
}
