//! Rating key schema and scope resolution
//!
//! All ranking state lives under the `ratings:` prefix so the rebuild
//! path can wipe it with one pattern.
//!
//! Key format:
//! - `ratings:global`            Global ordered set
//! - `ratings:country:{code}`    per-country ordered set
//! - `ratings:city:{city_id}`    per-city ordered set
//! - `ratings:user:{user_id}`    per-user detail hash

use crate::error::{RatingsError, RatingsResult};
use crate::models::{Scope, User};

const KEY_PREFIX: &str = "ratings";

/// Rating key builder
pub struct RatingKey;

impl RatingKey {
    pub fn global() -> String {
        format!("{}:global", KEY_PREFIX)
    }

    pub fn country(code: &str) -> String {
        format!("{}:country:{}", KEY_PREFIX, code)
    }

    pub fn city(city_id: &str) -> String {
        format!("{}:city:{}", KEY_PREFIX, city_id)
    }

    /// Detail hash holding the denormalized display fields.
    pub fn user_details(user_id: &str) -> String {
        format!("{}:user:{}", KEY_PREFIX, user_id)
    }

    /// Pattern covering every managed key, for the rebuild wipe.
    pub fn all_pattern() -> String {
        format!("{}:*", KEY_PREFIX)
    }
}

/// Resolve the ordered-set key for a scope and user.
///
/// Country and City are usage errors for users without city data;
/// a missing country code on a user that has a city violates the
/// city-implies-country invariant and is rejected the same way.
pub fn resolve_key(scope: Scope, user: &User) -> RatingsResult<String> {
    let invalid = || RatingsError::InvalidScope {
        scope,
        user_id: user.id.clone(),
    };

    match scope {
        Scope::Global => Ok(RatingKey::global()),
        Scope::Country => {
            user.unique_city_id.as_deref().ok_or_else(invalid)?;
            let code = user.country_short_name.as_deref().ok_or_else(invalid)?;
            Ok(RatingKey::country(code))
        }
        Scope::City => {
            let city_id = user.unique_city_id.as_deref().ok_or_else(invalid)?;
            Ok(RatingKey::city(city_id))
        }
    }
}
