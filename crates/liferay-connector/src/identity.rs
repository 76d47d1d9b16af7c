//! Identity index built from the user walk.
//!
//! Maps a user id to the screen name and email address that get stitched onto
//! blog entries and messages written by that user.

use crate::records::{EntityRecord, UserId, EMAIL_ADDRESS, SCREEN_NAME};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Author identity copied onto enriched items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub screen_name: String,
    pub email_address: String,
}

/// user id -> identity
#[derive(Debug, Default)]
pub struct IdentityIndex {
    identities: HashMap<UserId, Identity>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a user record
    ///
    /// Records without `userId`, `screenName` and `emailAddress` are skipped.
    /// A repeated user id replaces the earlier identity.
    pub fn observe(&mut self, user: &EntityRecord) -> bool {
        let (Some(user_id), Some(screen_name), Some(email_address)) =
            (user.user_id(), user.screen_name(), user.email_address())
        else {
            warn!(
                user_id = ?user.user_id(),
                "User record lacks identity fields, not indexed"
            );
            return false;
        };

        let identity = Identity {
            screen_name: screen_name.to_string(),
            email_address: email_address.to_string(),
        };
        if self.identities.insert(user_id.clone(), identity).is_some() {
            debug!(user_id = %user_id, "Duplicate user id, keeping latest identity");
        }
        true
    }

    pub fn get(&self, user_id: &UserId) -> Option<&Identity> {
        self.identities.get(user_id)
    }

    /// Copy the author's identity onto a record, overwriting existing values
    ///
    /// Returns false, leaving the record untouched, when the author is unknown.
    pub fn enrich(&self, record: &mut EntityRecord) -> bool {
        let Some(identity) = record.user_id().and_then(|id| self.get(&id)) else {
            return false;
        };
        let identity = identity.clone();
        record.insert(SCREEN_NAME, identity.screen_name);
        record.insert(EMAIL_ADDRESS, identity.email_address);
        true
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
