use leaderboard_service::services::engine::{LEADERS_COUNT, NEIGHBOURS_COUNT_ONE_SIDE};
use leaderboard_service::{RatingsEngine, RatingsError, Scope, User};
use rank_store::{HashStore, MemoryRankStore, OrderedSetStore};
use std::sync::Arc;

fn engine() -> (RatingsEngine, Arc<MemoryRankStore>) {
    let store = Arc::new(MemoryRankStore::new());
    (RatingsEngine::new(store.clone()), store)
}

fn user(id: &str, points: Option<i64>) -> User {
    User {
        id: id.to_string(),
        points,
        nick_name: format!("nick-{}", id),
        avatar_url: format!("http://avatars/{}.png", id),
        country_short_name: None,
        unique_city_id: None,
        last_rating_place: None,
    }
}

fn city_user(id: &str, points: Option<i64>, country: &str, city: &str) -> User {
    User {
        country_short_name: Some(country.to_string()),
        unique_city_id: Some(city.to_string()),
        ..user(id, points)
    }
}

/// Twelve users with distinct scores; `u01` ranks first.
fn population_of_12() -> Vec<User> {
    (1..=12)
        .map(|i| user(&format!("u{:02}", i), Some(1000 - i as i64)))
        .collect()
}

#[tokio::test]
async fn rebuild_populates_only_scored_users_globally() {
    let (engine, store) = engine();

    let mut users = population_of_12();
    users.push(user("unscored", None));

    engine.rebuild_all(&users).await.unwrap();

    assert_eq!(store.cardinality("ratings:global").await.unwrap(), 12);
}

#[tokio::test]
async fn rebuild_writes_details_even_without_points() {
    let (engine, store) = engine();

    let newcomer = user("newbie", None);
    engine
        .rebuild_all(&[newcomer, user("top", Some(10))])
        .await
        .unwrap();

    // Display data is written at rebuild even for scoreless users, so
    // it is joinable the moment they first appear in a view.
    let fields = store.get_fields("ratings:user:newbie").await.unwrap();
    assert_eq!(fields.get("Name").map(String::as_str), Some("nick-newbie"));
    assert_eq!(
        fields.get("PhotoUrl").map(String::as_str),
        Some("http://avatars/newbie.png")
    );
}

#[tokio::test]
async fn rebuild_fills_all_scopes_for_city_users() {
    let (engine, store) = engine();

    let users = vec![
        city_user("b1", Some(200), "BY", "minsk-1"),
        city_user("b2", Some(150), "BY", "minsk-1"),
        city_user("d1", Some(180), "DE", "berlin-1"),
        user("nomad", Some(170)),
    ];
    engine.rebuild_all(&users).await.unwrap();

    assert_eq!(store.cardinality("ratings:global").await.unwrap(), 4);
    assert_eq!(store.cardinality("ratings:country:BY").await.unwrap(), 2);
    assert_eq!(store.cardinality("ratings:city:minsk-1").await.unwrap(), 2);
    assert_eq!(store.cardinality("ratings:country:DE").await.unwrap(), 1);
}

#[tokio::test]
async fn ranks_for_user_without_city_are_global_only() {
    let (engine, _) = engine();

    let a = user("a", Some(200));
    let b = city_user("b", Some(200), "BY", "minsk-1");
    engine.rebuild_all(&[a.clone(), b.clone()]).await.unwrap();

    let (a_global, a_country, a_city) = engine.get_user_ranks(&a).await.unwrap();
    assert!(a_global >= 1);
    assert_eq!((a_country, a_city), (-1, -1));

    let (b_global, b_country, b_city) = engine.get_user_ranks(&b).await.unwrap();
    assert!(b_global >= 1);
    assert_eq!(b_country, 1);
    assert_eq!(b_city, 1);
}

#[tokio::test]
async fn ranks_absent_without_points() {
    let (engine, _) = engine();
    engine.rebuild_all(&population_of_12()).await.unwrap();

    let ranks = engine.get_user_ranks(&user("fresh", None)).await.unwrap();
    assert_eq!(ranks, (-1, -1, -1));
}

#[tokio::test]
async fn equal_scores_rank_by_prior_place() {
    let (engine, _) = engine();

    let mut first = user("zed", Some(500));
    first.last_rating_place = Some(3);
    let mut second = user("amy", Some(500));
    second.last_rating_place = Some(40);

    engine.rebuild_all(&[second.clone(), first.clone()]).await.unwrap();

    // Same score: the better prior place wins the tie even though
    // "amy" sorts before "zed" as a raw id.
    let (first_rank, _, _) = engine.get_user_ranks(&first).await.unwrap();
    let (second_rank, _, _) = engine.get_user_ranks(&second).await.unwrap();
    assert_eq!(first_rank, 1);
    assert_eq!(second_rank, 2);
}

#[tokio::test]
async fn rank_counts_strictly_better_members() {
    let (engine, _) = engine();
    let users = population_of_12();
    engine.rebuild_all(&users).await.unwrap();

    for (i, u) in users.iter().enumerate() {
        let (global, _, _) = engine.get_user_ranks(u).await.unwrap();
        assert_eq!(global, i as i64 + 1);
    }
}

#[tokio::test]
async fn leader_view_has_no_neighbour_window() {
    let (engine, _) = engine();
    let users = population_of_12();
    engine.rebuild_all(&users).await.unwrap();

    let view = engine.get_ratings(Scope::Global, &users[0]).await.unwrap();

    assert_eq!(view.ratings.len(), LEADERS_COUNT);
    assert_eq!(view.users_count, 12);
    assert_eq!(view.ratings[0].user_id, "u01");
    assert_eq!(view.ratings[0].place, 1);
    assert_eq!(view.ratings[0].points, 999);
    assert_eq!(view.ratings[0].nick_name, "nick-u01");
}

#[tokio::test]
async fn eleventh_user_gets_leaders_plus_clamped_window() {
    let (engine, _) = engine();
    let users = population_of_12();
    engine.rebuild_all(&users).await.unwrap();

    let requester = &users[10]; // ranked 11th
    let view = engine.get_ratings(Scope::Global, requester).await.unwrap();

    assert_eq!(view.users_count, 12);
    // Top 10, then the window clamped below the leader block: 11, 12.
    assert_eq!(view.ratings.len(), 12);
    let places: Vec<i64> = view.ratings.iter().map(|r| r.place).collect();
    assert_eq!(places, (1..=12).collect::<Vec<i64>>());
    assert_eq!(view.ratings[10].user_id, "u11");
}

#[tokio::test]
async fn view_never_exceeds_leaders_plus_window_cap() {
    let (engine, _) = engine();
    let users: Vec<User> = (1..=20)
        .map(|i| user(&format!("u{:02}", i), Some(1000 - i as i64)))
        .collect();
    engine.rebuild_all(&users).await.unwrap();

    let cap = LEADERS_COUNT + 2 * NEIGHBOURS_COUNT_ONE_SIDE;
    for requester in &users {
        let view = engine.get_ratings(Scope::Global, requester).await.unwrap();
        assert!(view.ratings.len() <= cap, "view too large for {}", requester.id);
        assert!(
            view.ratings.iter().any(|r| r.user_id == requester.id),
            "requester {} missing from their own view",
            requester.id
        );
    }
}

#[tokio::test]
async fn scoreless_requester_gets_synthetic_row() {
    let (engine, _) = engine();
    let users = population_of_12();
    engine.rebuild_all(&users).await.unwrap();

    let fresh = user("fresh", None);
    let view = engine.get_ratings(Scope::Global, &fresh).await.unwrap();

    assert_eq!(view.users_count, 12);
    assert_eq!(view.ratings.len(), LEADERS_COUNT + 1);
    let own = view.ratings.last().unwrap();
    assert_eq!(own.user_id, "fresh");
    assert_eq!(own.place, -1);
    assert_eq!(own.points, 0);
}

#[tokio::test]
async fn scoped_view_requires_city_data() {
    let (engine, _) = engine();

    let err = engine
        .get_ratings(Scope::City, &user("nomad", Some(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, RatingsError::InvalidScope { .. }));
}

#[tokio::test]
async fn score_update_moves_member_in_every_scope() {
    let (engine, store) = engine();

    let mut target = city_user("mover", Some(100), "BY", "minsk-1");
    let others = vec![
        city_user("stay", Some(120), "BY", "minsk-1"),
        user("solo", Some(130)),
    ];
    let mut users = others.clone();
    users.push(target.clone());
    engine.rebuild_all(&users).await.unwrap();

    engine
        .update_user_rating(&target, Some(100), 150)
        .await
        .unwrap();
    target.points = Some(150);

    let (global, country, city) = engine.get_user_ranks(&target).await.unwrap();
    assert_eq!(global, 1);
    assert_eq!(country, 1);
    assert_eq!(city, 1);

    // No member with the old score may remain in any applicable set.
    for key in ["ratings:global", "ratings:country:BY", "ratings:city:minsk-1"] {
        assert!(
            store.range_by_score(key, 100).await.unwrap().is_empty(),
            "stale entry left in {}",
            key
        );
    }
}

#[tokio::test]
async fn first_score_writes_details_and_inserts() {
    let (engine, store) = engine();

    let newcomer = user("rookie", Some(0));
    engine.update_user_rating(&newcomer, None, 75).await.unwrap();

    assert_eq!(store.cardinality("ratings:global").await.unwrap(), 1);

    let view = engine.get_ratings(Scope::Global, &newcomer).await.unwrap();
    assert_eq!(view.ratings[0].user_id, "rookie");
    assert_eq!(view.ratings[0].points, 75);
    assert_eq!(view.ratings[0].nick_name, "nick-rookie");
    assert_eq!(view.ratings[0].avatar_url, "http://avatars/rookie.png");
}

#[tokio::test]
async fn missing_stale_entry_is_tolerated() {
    let (engine, store) = engine();

    // Claimed old score never existed; the update must still land.
    let target = user("ghost", Some(90));
    engine.update_user_rating(&target, Some(42), 90).await.unwrap();

    assert_eq!(store.cardinality("ratings:global").await.unwrap(), 1);
    let (rank, _, _) = engine.get_user_ranks(&target).await.unwrap();
    assert_eq!(rank, 1);
}

#[tokio::test]
async fn nickname_and_avatar_updates_reach_views() {
    let (engine, _) = engine();

    let mut star = user("star", Some(300));
    engine.rebuild_all(std::slice::from_ref(&star)).await.unwrap();

    star.nick_name = "Renamed".to_string();
    star.avatar_url = "http://avatars/new.png".to_string();
    engine.update_nickname(&star).await.unwrap();
    engine.update_avatar(&star).await.unwrap();

    let view = engine.get_ratings(Scope::Global, &star).await.unwrap();
    assert_eq!(view.ratings[0].nick_name, "Renamed");
    assert_eq!(view.ratings[0].avatar_url, "http://avatars/new.png");
}
