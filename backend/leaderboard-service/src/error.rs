//! Ratings error types
//!
//! Usage errors (`InvalidScope`) fail fast: the caller asked for a
//! scope the user cannot be ranked in. Store errors propagate
//! unmodified; there is no retry layer here. Consistency misses (a
//! member missing from a set during a remove or rank lookup) are not
//! errors at all: the engine logs them and degrades, relying on the
//! scheduled rebuild for repair.

use crate::models::Scope;
use rank_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RatingsError {
    #[error("scope {scope:?} requires city data, user {user_id} has none")]
    InvalidScope { scope: Scope, user_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RatingsResult<T> = Result<T, RatingsError>;
