//! Favorite stations, kept in sync between local storage and a remote
//! per-user document.
//!
//! Anonymous users keep favorites in local persistence. Once signed in, the
//! remote document is authoritative: every observed change replaces the
//! in-memory set, and toggles write the full set back.

mod mirror;
mod remote;
mod set;
mod store;

pub use remote::{MemoryDocumentStore, RemoteError, RemoteFavorites, RemoteSubscription};
pub use set::{FavoriteSet, UserId};
pub use store::{FavoritesConfig, FavoritesHandle, FavoritesStore, SyncStatus};

/// Errors returned by [`FavoritesHandle::toggle`].
///
/// None of these leave a partial change behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FavoritesError {
    #[error("sign in to save favorites")]
    AuthRequired,

    #[error("could not save favorite: {message}")]
    RemoteWriteFailed { message: String },

    #[error("favorites service stopped")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            FavoritesError::AuthRequired.to_string(),
            "sign in to save favorites"
        );
        assert_eq!(
            FavoritesError::RemoteWriteFailed {
                message: "write rejected: permission denied".into()
            }
            .to_string(),
            "could not save favorite: write rejected: permission denied"
        );
    }
}
