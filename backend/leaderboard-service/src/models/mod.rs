use serde::{Deserialize, Serialize};

/// User record as resolved by the upstream identity/geo collaborators.
/// Consumed read-only; the engine never mutates or persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Absent means the user has not been scored yet.
    pub points: Option<i64>,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub avatar_url: String,
    /// Presence of a city implies presence of a country.
    pub country_short_name: Option<String>,
    pub unique_city_id: Option<String>,
    /// Most recently computed 1-based global rank; only a tie-break
    /// hint for the member-key codec.
    pub last_rating_place: Option<u64>,
}

/// Leaderboard partition. Country and City are only valid for users
/// carrying city data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Country,
    City,
}

/// One leaderboard row. `place` is 1-based; `-1` marks the synthetic
/// row for a requester who has no points yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingInfo {
    pub user_id: String,
    pub nick_name: String,
    pub avatar_url: String,
    pub points: i64,
    pub place: i64,
}

/// Leaderboard view: leaders first, then (if the requester is not a
/// leader) their neighbour window, plus the scope's total member
/// count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingsWithUserCount {
    pub ratings: Vec<RatingInfo>,
    pub users_count: u64,
}
