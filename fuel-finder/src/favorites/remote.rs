//! Remote per-user favorites documents.
//!
//! Each signed-in user owns one document holding their full favorite set.
//! Writes replace the set wholesale; subscribers see every new value.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::set::{FavoriteSet, UserId};

/// Errors from the remote document store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote store unavailable: {message}")]
    Unavailable { message: String },

    #[error("write rejected: {message}")]
    Rejected { message: String },
}

/// A live listener on one user's document.
///
/// Each observation is the document's favorite set, or `None` when the
/// document does not exist. Dropping the subscription detaches it.
pub struct RemoteSubscription {
    rx: watch::Receiver<Option<FavoriteSet>>,
    delivered_initial: bool,
}

impl RemoteSubscription {
    pub fn new(rx: watch::Receiver<Option<FavoriteSet>>) -> Self {
        Self {
            rx,
            delivered_initial: false,
        }
    }

    /// Next observation. The first call yields the current document.
    /// Returns `None` once the remote side has gone away.
    pub async fn next(&mut self) -> Option<Option<FavoriteSet>> {
        if self.delivered_initial {
            self.rx.changed().await.ok()?;
        }
        self.delivered_initial = true;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// The remote favorites document store.
pub trait RemoteFavorites: Send + Sync + 'static {
    /// Read a user's document once.
    fn get(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<FavoriteSet>, RemoteError>> + Send;

    /// Write the full favorite set into the user's document, creating it
    /// if needed.
    fn merge_write(
        &self,
        user: &UserId,
        favorites: &FavoriteSet,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Attach a listener to the user's document.
    fn subscribe(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<RemoteSubscription, RemoteError>> + Send;
}

impl<T: RemoteFavorites> RemoteFavorites for Arc<T> {
    fn get(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<FavoriteSet>, RemoteError>> + Send {
        (**self).get(user)
    }

    fn merge_write(
        &self,
        user: &UserId,
        favorites: &FavoriteSet,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send {
        (**self).merge_write(user, favorites)
    }

    fn subscribe(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<RemoteSubscription, RemoteError>> + Send {
        (**self).subscribe(user)
    }
}

/// In-process document store.
///
/// Clones share the same documents, so two clones behave like two devices
/// talking to one backend. Failures can be switched on to exercise error
/// paths.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    documents: Mutex<HashMap<UserId, watch::Sender<Option<FavoriteSet>>>>,
    reject_writes: AtomicBool,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`RemoteError::Rejected`].
    pub fn set_reject_writes(&self, reject: bool) {
        self.inner.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Make every subsequent call fail with [`RemoteError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Current document content, bypassing failure switches.
    pub fn peek(&self, user: &UserId) -> Option<FavoriteSet> {
        self.with_document(user, |doc| doc.borrow().clone())
    }

    fn with_document<T>(
        &self,
        user: &UserId,
        f: impl FnOnce(&watch::Sender<Option<FavoriteSet>>) -> T,
    ) -> T {
        let mut documents = self
            .inner
            .documents
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let doc = documents
            .entry(user.clone())
            .or_insert_with(|| watch::channel(None).0);
        f(doc)
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable {
                message: "offline".to_string(),
            });
        }
        Ok(())
    }
}

impl RemoteFavorites for MemoryDocumentStore {
    async fn get(&self, user: &UserId) -> Result<Option<FavoriteSet>, RemoteError> {
        self.check_online()?;
        Ok(self.peek(user))
    }

    async fn merge_write(&self, user: &UserId, favorites: &FavoriteSet) -> Result<(), RemoteError> {
        self.check_online()?;
        if self.inner.reject_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected {
                message: "permission denied".to_string(),
            });
        }

        self.with_document(user, |doc| doc.send_replace(Some(favorites.clone())));
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self, user: &UserId) -> Result<RemoteSubscription, RemoteError> {
        self.check_online()?;
        Ok(RemoteSubscription::new(
            self.with_document(user, |doc| doc.subscribe()),
        ))
    }
}
