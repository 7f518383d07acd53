//! Member-key codec
//!
//! The string stored as an ordered-set member encodes the user id plus
//! an optional tie-break hint: the user's last known global place,
//! rendered as a fixed-width, zero-padded decimal prefix. Equal-score
//! members compare lexicographically in the store, so the fixed width
//! makes that comparison equal numeric order of prior rank at any
//! magnitude.
//!
//! Format: `{place:010}:{user_id}`, or the bare user id when no prior
//! place is known.

use crate::models::User;

const PLACE_PREFIX_WIDTH: usize = 10;

/// Encode the ordered-set member string for a user.
pub fn encode(user: &User) -> String {
    match user.last_rating_place {
        Some(place) => format!(
            "{:0width$}:{}",
            place,
            user.id,
            width = PLACE_PREFIX_WIDTH
        ),
        None => user.id.clone(),
    }
}

/// Extract the user id back out of a stored member string.
///
/// Left inverse of [`encode`]: the right-hand side of the first `:`
/// is the user id only when the left-hand side is exactly the
/// fixed-width digit prefix; anything else is a bare user id.
pub fn decode(member: &str) -> &str {
    match member.split_once(':') {
        Some((prefix, user_id))
            if prefix.len() == PLACE_PREFIX_WIDTH
                && prefix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            user_id
        }
        _ => member,
    }
}
