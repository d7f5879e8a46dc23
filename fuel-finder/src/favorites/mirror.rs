//! Local favorites persistence.
//!
//! One JSON document under `favorites-v1` holds the anonymous set plus an
//! offline copy of each signed-in user's last observed remote set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::persistence::{KeyValueStore, StoreKey, get_json, put_json};

use super::set::{FavoriteSet, UserId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct LocalDocument {
    #[serde(default)]
    pub anonymous: FavoriteSet,

    #[serde(default)]
    pub accounts: BTreeMap<UserId, FavoriteSet>,
}

pub(crate) struct LocalMirror<S> {
    store: S,
}

impl<S: KeyValueStore> LocalMirror<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read the document. Missing, unreadable or corrupt storage all yield
    /// an empty document.
    pub async fn load(&self) -> LocalDocument {
        match get_json(&self.store, StoreKey::Favorites).await {
            Ok(doc) => doc.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "could not read local favorites, starting empty");
                LocalDocument::default()
            }
        }
    }

    /// Write the document. Failures are logged; favorites keep working in
    /// memory.
    pub async fn save(&self, doc: &LocalDocument) {
        if let Err(e) = put_json(&self.store, StoreKey::Favorites, doc).await {
            warn!(error = %e, "could not persist local favorites");
        }
    }
}
