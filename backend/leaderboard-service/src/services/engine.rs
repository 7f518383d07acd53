//! Ranking engine
//!
//! Orchestrates the three ordered-set views (Global, Country, City)
//! and the per-user detail hashes. Every operation is a sequence of
//! independently-atomic store calls; nothing spans keys
//! transactionally. A remove-then-add pair racing another writer can
//! leave a stale or missing member, which is tolerated, logged and
//! repaired by the next scheduled rebuild.

use crate::error::RatingsResult;
use crate::models::{RatingInfo, RatingsWithUserCount, Scope, User};
use crate::services::member_key;
use crate::services::scope::{resolve_key, RatingKey};
use rank_store::RankStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Rows shown at the top of every leaderboard view.
pub const LEADERS_COUNT: usize = 10;
/// Rows fetched around a non-leader requester's own rank.
pub const NEIGHBOURS_COUNT_ONE_SIDE: usize = 2;

const FIELD_NAME: &str = "Name";
const FIELD_PHOTO_URL: &str = "PhotoUrl";

#[derive(Clone)]
pub struct RatingsEngine {
    store: Arc<dyn RankStore>,
}

impl RatingsEngine {
    pub fn new(store: Arc<dyn RankStore>) -> Self {
        Self { store }
    }

    /// Full repair path: wipe every managed key, then re-add every
    /// scored user to their scopes and rewrite every detail hash.
    ///
    /// Destructive; must not run concurrently with itself or with
    /// live updates. The scheduler serializes it externally.
    pub async fn rebuild_all(&self, users: &[User]) -> RatingsResult<()> {
        let cleared = self.store.delete_matching(&RatingKey::all_pattern()).await?;
        info!(cleared, users = users.len(), "rebuilding rating sets");

        for user in users {
            if let Some(points) = user.points {
                let member = member_key::encode(user);
                for key in self.member_set_keys(user) {
                    self.store.add_or_update(&key, &member, points).await?;
                }
            }
            // Display data exists even for users without points.
            self.write_details(user).await?;
        }

        Ok(())
    }

    /// 1-based (global, country, city) ranks, `-1` for any scope that
    /// does not apply. Best-effort: a member missing from a set is a
    /// consistency miss, not a failure.
    pub async fn get_user_ranks(&self, user: &User) -> RatingsResult<(i64, i64, i64)> {
        let Some(points) = user.points else {
            return Ok((-1, -1, -1));
        };

        let global = self.scope_rank(&RatingKey::global(), user, points).await?;

        if user.unique_city_id.is_none() {
            return Ok((global, -1, -1));
        }

        let country = match resolve_key(Scope::Country, user) {
            Ok(key) => self.scope_rank(&key, user, points).await?,
            // City without country: invariant violation upstream,
            // already logged by the write path.
            Err(_) => -1,
        };
        let city_key = resolve_key(Scope::City, user)?;
        let city = self.scope_rank(&city_key, user, points).await?;

        Ok((global, country, city))
    }

    /// Leaders + neighbour-window view for one scope.
    ///
    /// Top `LEADERS_COUNT` rows always; if the requester is not among
    /// them, up to `2 * NEIGHBOURS_COUNT_ONE_SIDE` rows around their
    /// own rank, clamped away from the leader block. A requester with
    /// no points gets a single synthetic `place = -1` row instead.
    pub async fn get_ratings(
        &self,
        scope: Scope,
        user: &User,
    ) -> RatingsResult<RatingsWithUserCount> {
        let key = resolve_key(scope, user)?;

        let leaders = self
            .store
            .range_by_rank_desc(&key, 0, LEADERS_COUNT as isize - 1)
            .await?;

        let mut ratings = Vec::with_capacity(LEADERS_COUNT + 2 * NEIGHBOURS_COUNT_ONE_SIDE);
        let mut user_is_leader = false;

        for (idx, (member, points)) in leaders.iter().enumerate() {
            let user_id = member_key::decode(member);
            if user_id == user.id {
                user_is_leader = true;
            }
            ratings.push(self.rating_info(user_id, *points, idx as i64 + 1).await?);
        }

        if !user_is_leader {
            match user.points {
                None => ratings.push(RatingInfo {
                    user_id: user.id.clone(),
                    nick_name: user.nick_name.clone(),
                    avatar_url: user.avatar_url.clone(),
                    points: 0,
                    place: -1,
                }),
                Some(points) => {
                    if let Some(rank) = self.member_rank(&key, user, points).await? {
                        self.append_neighbour_window(&key, rank, &mut ratings).await?;
                    }
                }
            }
        }

        let users_count = self.store.cardinality(&key).await?;

        Ok(RatingsWithUserCount {
            ratings,
            users_count,
        })
    }

    /// Incremental path after a score change. `new_points` is set by
    /// contract: callers only invoke this once points are assigned.
    ///
    /// The remove-old / add-new steps per scope form a non-atomic
    /// saga; a stale entry that a concurrent writer already moved is
    /// skipped with a warning.
    pub async fn update_user_rating(
        &self,
        user: &User,
        old_points: Option<i64>,
        new_points: i64,
    ) -> RatingsResult<()> {
        let keys = self.member_set_keys(user);

        match old_points {
            Some(old) => {
                for key in &keys {
                    match self.find_member(key, user, old).await? {
                        Some(stale) => {
                            self.store.remove(key, &stale).await?;
                        }
                        None => warn!(
                            user_id = %user.id,
                            key = %key,
                            old_points = old,
                            "stale rating entry not found, repaired on next rebuild"
                        ),
                    }
                }
            }
            // First score: make sure the first insert carries current
            // display data.
            None => self.write_details(user).await?,
        }

        let member = member_key::encode(user);
        for key in &keys {
            self.store.add_or_update(key, &member, new_points).await?;
        }

        Ok(())
    }

    /// Single-field detail write; no ordered-set interaction.
    pub async fn update_avatar(&self, user: &User) -> RatingsResult<()> {
        self.store
            .set_field(
                &RatingKey::user_details(&user.id),
                FIELD_PHOTO_URL,
                &user.avatar_url,
            )
            .await?;
        Ok(())
    }

    /// Single-field detail write; no ordered-set interaction.
    pub async fn update_nickname(&self, user: &User) -> RatingsResult<()> {
        self.store
            .set_field(
                &RatingKey::user_details(&user.id),
                FIELD_NAME,
                &user.nick_name,
            )
            .await?;
        Ok(())
    }

    /// Ordered-set keys a user's score belongs to: Global always,
    /// Country and City when city data is present.
    fn member_set_keys(&self, user: &User) -> Vec<String> {
        let mut keys = vec![RatingKey::global()];
        match (&user.unique_city_id, &user.country_short_name) {
            (Some(city_id), Some(code)) => {
                keys.push(RatingKey::country(code));
                keys.push(RatingKey::city(city_id));
            }
            (Some(city_id), None) => warn!(
                user_id = %user.id,
                city_id = %city_id,
                "user has a city but no country, skipping scoped sets"
            ),
            _ => {}
        }
        keys
    }

    /// Locate the user's member string in a set by equal-score scan.
    /// The member key cannot be recomputed from the current record:
    /// it embeds whatever `last_rating_place` was at insert time.
    async fn find_member(
        &self,
        key: &str,
        user: &User,
        points: i64,
    ) -> RatingsResult<Option<String>> {
        let members = self.store.range_by_score(key, points).await?;
        Ok(members
            .into_iter()
            .find(|member| member_key::decode(member) == user.id))
    }

    /// 0-based descending rank of the user in one set, or `None` on a
    /// consistency miss (logged).
    async fn member_rank(
        &self,
        key: &str,
        user: &User,
        points: i64,
    ) -> RatingsResult<Option<u64>> {
        let Some(member) = self.find_member(key, user, points).await? else {
            warn!(user_id = %user.id, key = %key, "user not found in rating set");
            return Ok(None);
        };
        let rank = self.store.rank_desc(key, &member).await?;
        if rank.is_none() {
            warn!(user_id = %user.id, key = %key, "rating entry vanished during rank lookup");
        }
        Ok(rank)
    }

    /// 1-based rank for one scope, `-1` on a consistency miss.
    async fn scope_rank(&self, key: &str, user: &User, points: i64) -> RatingsResult<i64> {
        Ok(match self.member_rank(key, user, points).await? {
            Some(rank) => rank as i64 + 1,
            None => -1,
        })
    }

    /// Fetch the band around `rank` (0-based) and append it after the
    /// leader block. Lower bound clamps to the leader block so rows
    /// never repeat; the band is capped at twice the per-side count so
    /// a view never exceeds `LEADERS_COUNT + 2 * NEIGHBOURS_COUNT_ONE_SIDE`
    /// rows, trimming the trailing edge. The requester's own row is
    /// always inside the band.
    async fn append_neighbour_window(
        &self,
        key: &str,
        rank: u64,
        ratings: &mut Vec<RatingInfo>,
    ) -> RatingsResult<()> {
        let side = NEIGHBOURS_COUNT_ONE_SIDE as i64;
        let rank = rank as i64;

        let from = (rank - side).max(LEADERS_COUNT as i64);
        let to = (rank + side).min(from + 2 * side - 1);
        if from > to {
            return Ok(());
        }

        let window = self
            .store
            .range_by_rank_desc(key, from as isize, to as isize)
            .await?;

        for (idx, (member, points)) in window.iter().enumerate() {
            let user_id = member_key::decode(member);
            ratings.push(
                self.rating_info(user_id, *points, from + idx as i64 + 1)
                    .await?,
            );
        }

        Ok(())
    }

    /// Join the detail hash onto one row.
    async fn rating_info(
        &self,
        user_id: &str,
        points: i64,
        place: i64,
    ) -> RatingsResult<RatingInfo> {
        let fields = self
            .store
            .get_fields(&RatingKey::user_details(user_id))
            .await?;

        Ok(RatingInfo {
            user_id: user_id.to_string(),
            nick_name: fields.get(FIELD_NAME).cloned().unwrap_or_default(),
            avatar_url: fields.get(FIELD_PHOTO_URL).cloned().unwrap_or_default(),
            points,
            place,
        })
    }

    /// Write the non-empty display fields of the detail hash.
    async fn write_details(&self, user: &User) -> RatingsResult<()> {
        let mut fields = Vec::with_capacity(2);
        if !user.nick_name.is_empty() {
            fields.push((FIELD_NAME.to_string(), user.nick_name.clone()));
        }
        if !user.avatar_url.is_empty() {
            fields.push((FIELD_PHOTO_URL.to_string(), user.avatar_url.clone()));
        }
        if !fields.is_empty() {
            self.store
                .set_fields(&RatingKey::user_details(&user.id), &fields)
                .await?;
        }
        Ok(())
    }
}
