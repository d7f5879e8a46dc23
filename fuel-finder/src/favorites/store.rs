//! Favorites synchronization task.
//!
//! A single task owns the favorite set. It follows the identity provider,
//! keeps one live listener on the signed-in user's remote document, and
//! executes toggles one at a time. Remote notifications are only applied
//! between toggles, never while a write is in flight.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::domain::StationId;
use crate::persistence::KeyValueStore;

use super::FavoritesError;
use super::mirror::{LocalDocument, LocalMirror};
use super::remote::{RemoteFavorites, RemoteSubscription};
use super::set::{FavoriteSet, UserId};

const COMMAND_CAPACITY: usize = 32;

/// Where the favorite set is currently sourced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SyncStatus {
    /// Nobody signed in; favorites live in local persistence only.
    Anonymous,
    /// Signed in and listening to the user's remote document.
    Syncing { user: UserId },
    /// Signed in, but the last remote operation failed. The set shown is
    /// the last known good one.
    Error { user: UserId, message: String },
}

/// Favorites policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FavoritesConfig {
    /// Refuse toggles while nobody is signed in.
    pub require_sign_in: bool,
}

impl FavoritesConfig {
    pub fn with_require_sign_in(mut self, require: bool) -> Self {
        self.require_sign_in = require;
        self
    }
}

enum Command {
    Toggle {
        id: StationId,
        reply: oneshot::Sender<Result<bool, FavoritesError>>,
    },
}

/// Cloneable handle to the favorites task.
///
/// The task stops once every handle is dropped.
#[derive(Clone)]
pub struct FavoritesHandle {
    commands: mpsc::Sender<Command>,
    favorites: watch::Receiver<FavoriteSet>,
    status: watch::Receiver<SyncStatus>,
}

impl FavoritesHandle {
    /// Flip a station's membership. Returns whether it is now a favorite.
    ///
    /// Toggles are queued and run one after another.
    pub async fn toggle(&self, id: StationId) -> Result<bool, FavoritesError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Toggle { id, reply })
            .await
            .map_err(|_| FavoritesError::Closed)?;
        rx.await.map_err(|_| FavoritesError::Closed)?
    }

    pub fn favorites(&self) -> FavoriteSet {
        self.favorites.borrow().clone()
    }

    pub fn is_favorite(&self, id: &StationId) -> bool {
        self.favorites.borrow().contains(id)
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoriteSet> {
        self.favorites.clone()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }
}

/// Starts the favorites task.
pub struct FavoritesStore;

impl FavoritesStore {
    /// Load the local mirror, adopt the current identity, then hand the
    /// store over to a background task.
    ///
    /// `identity` carries the signed-in user, `None` when signed out.
    pub async fn spawn<R, S>(
        remote: R,
        local: S,
        identity: watch::Receiver<Option<UserId>>,
        config: FavoritesConfig,
    ) -> FavoritesHandle
    where
        R: RemoteFavorites,
        S: KeyValueStore,
    {
        let mirror = LocalMirror::new(local);
        let document = mirror.load().await;

        let (favorites_tx, favorites_rx) = watch::channel(document.anonymous.clone());
        let (status_tx, status_rx) = watch::channel(SyncStatus::Anonymous);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);

        let mut actor = Actor {
            remote,
            mirror,
            document,
            config,
            session: None,
            favorites: favorites_tx,
            status: status_tx,
        };

        let mut identity = identity;
        let initial = identity.borrow_and_update().clone();
        actor.switch_user(initial).await;

        tokio::spawn(actor.run(commands_rx, identity));

        FavoritesHandle {
            commands: commands_tx,
            favorites: favorites_rx,
            status: status_rx,
        }
    }
}

struct UserSession {
    user: UserId,
    /// `None` when the listener could not be attached or has ended.
    listener: Option<RemoteSubscription>,
}

struct Actor<R, S> {
    remote: R,
    mirror: LocalMirror<S>,
    document: LocalDocument,
    config: FavoritesConfig,
    session: Option<UserSession>,
    favorites: watch::Sender<FavoriteSet>,
    status: watch::Sender<SyncStatus>,
}

impl<R, S> Actor<R, S>
where
    R: RemoteFavorites,
    S: KeyValueStore,
{
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut identity: watch::Receiver<Option<UserId>>,
    ) {
        let mut identity_open = true;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Toggle { id, reply }) => {
                        let result = self.toggle(id).await;
                        let _ = reply.send(result);
                    }
                    None => break,
                },
                changed = identity.changed(), if identity_open => match changed {
                    Ok(()) => {
                        let user = identity.borrow_and_update().clone();
                        self.switch_user(user).await;
                    }
                    Err(_) => {
                        debug!("identity provider closed");
                        identity_open = false;
                    }
                },
                observed = next_observation(&mut self.session) => {
                    if let Err(message) = self.apply_observation(observed).await {
                        self.report_error(message);
                    }
                }
            }
        }

        debug!("favorites task stopped");
    }

    fn current_user(&self) -> Option<&UserId> {
        self.session.as_ref().map(|s| &s.user)
    }

    async fn switch_user(&mut self, user: Option<UserId>) {
        if self.current_user() == user.as_ref() {
            return;
        }

        // The previous listener is dropped here, never layered.
        self.session = None;

        let Some(user) = user else {
            info!("signed out, favorites back to local set");
            self.favorites.send_replace(self.document.anonymous.clone());
            self.status.send_replace(SyncStatus::Anonymous);
            return;
        };

        info!(user = %user, "signed in, attaching favorites listener");
        match self.remote.subscribe(&user).await {
            Ok(mut listener) => {
                let first = listener.next().await;
                self.session = Some(UserSession {
                    user: user.clone(),
                    listener: Some(listener),
                });
                match self.apply_observation(first).await {
                    Ok(()) => {
                        self.status.send_replace(SyncStatus::Syncing { user });
                    }
                    Err(message) => self.report_error(message),
                }
            }
            Err(e) => {
                warn!(user = %user, error = %e, "favorites listener unavailable, serving offline copy");
                let offline = self.document.accounts.get(&user).cloned().unwrap_or_default();
                self.favorites.send_replace(offline);
                self.status.send_replace(SyncStatus::Error {
                    user: user.clone(),
                    message: e.to_string(),
                });
                self.session = Some(UserSession {
                    user,
                    listener: None,
                });
            }
        }
    }

    /// Apply one delivery from the remote listener.
    ///
    /// Only the set changes here; the status is left to the caller.
    async fn apply_observation(
        &mut self,
        observed: Option<Option<FavoriteSet>>,
    ) -> Result<(), String> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let user = session.user.clone();

        match observed {
            None => {
                warn!(user = %user, "favorites listener ended");
                session.listener = None;
                Err("remote listener ended".to_string())
            }
            Some(None) => {
                debug!(user = %user, "creating empty favorites document");
                let empty = FavoriteSet::new();
                match self.remote.merge_write(&user, &empty).await {
                    Ok(()) => {
                        self.adopt_remote(user, empty).await;
                        Ok(())
                    }
                    Err(e) => {
                        warn!(user = %user, error = %e, "could not create favorites document");
                        self.favorites.send_replace(empty);
                        Err(e.to_string())
                    }
                }
            }
            Some(Some(remote)) => {
                self.adopt_remote(user, remote).await;
                Ok(())
            }
        }
    }

    /// The remote set replaces the in-memory one wholesale.
    async fn adopt_remote(&mut self, user: UserId, remote: FavoriteSet) {
        debug!(user = %user, favorites = remote.len(), "remote favorites observed");
        self.favorites.send_replace(remote.clone());
        self.document.accounts.insert(user, remote);
        self.mirror.save(&self.document).await;
    }

    fn report_error(&self, message: String) {
        if let Some(user) = self.current_user() {
            self.status.send_replace(SyncStatus::Error {
                user: user.clone(),
                message,
            });
        }
    }

    async fn toggle(&mut self, id: StationId) -> Result<bool, FavoritesError> {
        let Some(user) = self.current_user().cloned() else {
            return self.toggle_local(&id).await;
        };

        let (next, added) = self.favorites.borrow().toggled(&id);

        if let Err(e) = self.remote.merge_write(&user, &next).await {
            warn!(user = %user, station = %id, error = %e, "favorite toggle rejected");
            let message = e.to_string();
            self.report_error(message.clone());
            return Err(FavoritesError::RemoteWriteFailed { message });
        }

        self.adopt_remote(user.clone(), next).await;
        self.reattach_if_detached(&user).await;
        self.status.send_replace(SyncStatus::Syncing { user });
        Ok(added)
    }

    async fn toggle_local(&mut self, id: &StationId) -> Result<bool, FavoritesError> {
        if self.config.require_sign_in {
            return Err(FavoritesError::AuthRequired);
        }

        let (next, added) = self.document.anonymous.toggled(id);
        self.document.anonymous = next.clone();
        self.mirror.save(&self.document).await;
        self.favorites.send_replace(next);
        Ok(added)
    }

    /// After a successful write, try to get the listener back.
    async fn reattach_if_detached(&mut self, user: &UserId) {
        let detached = self
            .session
            .as_ref()
            .is_some_and(|s| s.listener.is_none());
        if !detached {
            return;
        }

        match self.remote.subscribe(user).await {
            Ok(mut listener) => {
                // Current value was just written by us.
                let _ = listener.next().await;
                if let Some(session) = self.session.as_mut() {
                    session.listener = Some(listener);
                }
                info!(user = %user, "favorites listener reattached");
            }
            Err(e) => debug!(user = %user, error = %e, "favorites listener still unavailable"),
        }
    }
}

/// Wait for the next remote delivery, or forever when there is no listener.
async fn next_observation(session: &mut Option<UserSession>) -> Option<Option<FavoriteSet>> {
    match session.as_mut().and_then(|s| s.listener.as_mut()) {
        Some(listener) => listener.next().await,
        None => std::future::pending().await,
    }
}
