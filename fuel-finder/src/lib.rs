//! Fuel station finder.
//!
//! A client-side pipeline over the Spanish fuel price dataset: fetch and
//! cache the full station list, follow the user's position, filter, sort
//! and aggregate stations under debounced criteria, and keep a favorites
//! set in sync with a remote per-user document.

pub mod clock;
pub mod config;
pub mod dataset;
pub mod debounce;
pub mod domain;
pub mod favorites;
pub mod filter;
pub mod geo;
pub mod persistence;
pub mod preferences;
pub mod session;
