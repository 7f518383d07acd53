pub mod engine;
pub mod member_key;
pub mod scope;

pub use engine::RatingsEngine;
pub use scope::{resolve_key, RatingKey};
