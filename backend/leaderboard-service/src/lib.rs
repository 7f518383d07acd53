pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{RatingsError, RatingsResult};
pub use models::{RatingInfo, RatingsWithUserCount, Scope, User};
pub use services::RatingsEngine;
