use super::*;
use async_trait::async_trait;
use reel_gateway::dto::{UserDataDto, UserProfileDto};
use reel_models::ImageRef;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex as StdMutex;

/// Recording gateway double: every call is appended to `attempts` in order,
/// every successful mutation to `confirmed`. Mutations can be made to fail
/// on demand to exercise the queue's pause-and-retry path.
#[derive(Default)]
struct MockGateway {
    attempts: StdMutex<Vec<String>>,
    confirmed: StdMutex<Vec<String>>,
    fail_mutations: AtomicUsize,
    fail_fetches: AtomicUsize,
    feed_pages: StdMutex<VecDeque<Vec<Movie>>>,
    profile: StdMutex<Option<UserProfileDto>>,
    catalog: StdMutex<HashMap<u32, Movie>>,
}

impl MockGateway {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push_feed(&self, movies: Vec<Movie>) {
        self.feed_pages.lock().unwrap().push_back(movies);
    }

    fn fail_next_mutations(&self, n: usize) {
        self.fail_mutations.store(n, Ordering::SeqCst);
    }

    fn fail_next_fetches(&self, n: usize) {
        self.fail_fetches.store(n, Ordering::SeqCst);
    }

    fn set_profile(&self, profile: UserProfileDto) {
        *self.profile.lock().unwrap() = Some(profile);
    }

    fn add_to_catalog(&self, movies: Vec<Movie>) {
        let mut catalog = self.catalog.lock().unwrap();
        for movie in movies {
            catalog.insert(movie.tmdb_id, movie);
        }
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    fn confirmed(&self) -> Vec<String> {
        self.confirmed.lock().unwrap().clone()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        loop {
            let n = counter.load(Ordering::SeqCst);
            if n == 0 {
                return false;
            }
            if counter
                .compare_exchange(n, n - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn mutation(&self, call: String) -> Result<(), GatewayError> {
        self.attempts.lock().unwrap().push(call.clone());
        if Self::take_failure(&self.fail_mutations) {
            return Err(GatewayError::Server { status: 503 });
        }
        self.confirmed.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl RecommendationGateway for MockGateway {
    async fn fetch_user_profile(&self, _user_id: &str) -> Result<UserProfileDto, GatewayError> {
        self.attempts.lock().unwrap().push("fetch_profile".to_string());
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or(GatewayError::Server { status: 404 })
    }

    async fn fetch_recommendations(&self, _user_id: &str) -> Result<Vec<Movie>, GatewayError> {
        self.attempts.lock().unwrap().push("fetch_recs".to_string());
        if Self::take_failure(&self.fail_fetches) {
            return Err(GatewayError::Server { status: 503 });
        }
        Ok(self.feed_pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn fetch_movies_by_ids(&self, ids: &[u32]) -> Result<Vec<Movie>, GatewayError> {
        self.attempts.lock().unwrap().push("fetch_movies".to_string());
        let catalog = self.catalog.lock().unwrap();
        Ok(ids.iter().filter_map(|id| catalog.get(id).cloned()).collect())
    }

    async fn create_or_update_profile(
        &self,
        name: &str,
        _genres: &[String],
        movie_ids: &[u32],
        _personas: &[String],
    ) -> Result<(), GatewayError> {
        self.mutation(format!("create_profile:{}:{}", name, movie_ids.len()))
    }

    async fn add_to_watchlist(&self, _user_id: &str, movie_id: u32) -> Result<(), GatewayError> {
        self.mutation(format!("watchlist_add:{movie_id}"))
    }

    async fn remove_from_watchlist(&self, _user_id: &str, movie_id: u32) -> Result<(), GatewayError> {
        self.mutation(format!("watchlist_remove:{movie_id}"))
    }

    async fn rate_movie(
        &self,
        _user_id: &str,
        movie_id: u32,
        rating: UserRating,
    ) -> Result<(), GatewayError> {
        self.mutation(format!("rate:{movie_id}:{rating}"))
    }

    async fn sync_shown_movies(&self, _user_id: &str, movie_ids: &[u32]) -> Result<(), GatewayError> {
        let ids = movie_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.mutation(format!("sync_shown:{ids}"))
    }

    async fn fetch_personas(&self) -> Result<Vec<Persona>, GatewayError> {
        self.attempts.lock().unwrap().push("fetch_personas".to_string());
        Ok(vec![Persona {
            title: "Cinephile".to_string(),
            description: "Lives in the art house".to_string(),
            color_name: "purple".to_string(),
            icon: "film".to_string(),
            image: "cinephile.jpg".to_string(),
        }])
    }
}

fn movie(id: u32) -> Movie {
    movie_with_genres(id, "Action · Sci-Fi")
}

fn movie_with_genres(id: u32, subtitle: &str) -> Movie {
    Movie::new(id, format!("Movie {id}"), subtitle, ImageRef::Asset("poster.jpg".into()))
}

fn movies(ids: std::ops::RangeInclusive<u32>) -> Vec<Movie> {
    ids.map(movie).collect()
}

fn engine_with(gateway: &Arc<MockGateway>) -> FeedEngine {
    FeedEngine::new(
        Arc::clone(gateway) as Arc<dyn RecommendationGateway>,
        "tester",
        FeedTuning::default(),
    )
}

fn window_ids(movies: &[Movie]) -> Vec<u32> {
    movies.iter().map(|m| m.tmdb_id).collect()
}

#[tokio::test]
async fn fresh_load_windows_first_ten() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=25));
    let engine = engine_with(&gateway);

    engine.refresh().await.unwrap();

    let window = engine.recommendations().await;
    assert_eq!(window_ids(&window), (1..=10).collect::<Vec<u32>>());

    let status = engine.status().await;
    assert_eq!(status.window_len, 10);
    assert_eq!(status.buffer_len, 15);
    assert_eq!(status.shown_count, 0);
    assert!(engine.inner.state.lock().await.shown_ids.is_empty());
}

#[tokio::test]
async fn fresh_load_failure_leaves_last_good_state() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=10));
    let engine = engine_with(&gateway);
    engine.refresh().await.unwrap();

    gateway.fail_next_fetches(1);
    assert!(engine.refresh().await.is_err());

    // Never replaced with an error state.
    assert_eq!(window_ids(&engine.recommendations().await), (1..=10).collect::<Vec<u32>>());
}

#[tokio::test]
async fn concurrent_fetch_is_dropped_not_queued() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=5));
    let engine = engine_with(&gateway);

    engine.inner.fetch_in_flight.store(true, Ordering::SeqCst);
    engine.refresh().await.unwrap();
    assert!(gateway.attempts().is_empty());

    engine.inner.fetch_in_flight.store(false, Ordering::SeqCst);
    engine.refresh().await.unwrap();
    assert_eq!(gateway.attempts(), vec!["fetch_recs"]);
}

#[tokio::test]
async fn refill_appends_only_unknown_candidates() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=10));
    let engine = engine_with(&gateway);
    engine.refresh().await.unwrap();

    engine.rate(&movie(11), UserRating::Like).await;
    engine.add_to_watchlist(&movie(12)).await;
    engine.mark_as_shown(&movie(1)).await;

    // Candidates overlap the window (1), history (11), watchlist (12), and
    // the shown set (1); only 13 and 14 are genuinely new.
    gateway.push_feed(vec![movie(1), movie(11), movie(12), movie(13), movie(14)]);
    engine.inner.fetch_recommendations(true).await.unwrap();

    let st = engine.inner.state.lock().await;
    let buffer_ids: Vec<u32> = st.all_fetched.iter().map(|m| m.tmdb_id).collect();
    assert_eq!(buffer_ids, (1..=10).chain(13..=14).collect::<Vec<u32>>());

    let appended: HashSet<u32> = [13, 14].into_iter().collect();
    let known: HashSet<u32> = st
        .history
        .iter()
        .chain(&st.watchlist)
        .chain(&st.recommendations[..10])
        .map(|m| m.tmdb_id)
        .chain(st.shown_ids.iter().copied())
        .collect();
    assert!(appended.is_disjoint(&known));
}

#[tokio::test]
async fn refill_with_nothing_new_is_a_noop() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=10));
    let engine = engine_with(&gateway);
    engine.refresh().await.unwrap();

    gateway.push_feed(movies(1..=10));
    engine.inner.fetch_recommendations(true).await.unwrap();

    let st = engine.inner.state.lock().await;
    assert_eq!(st.all_fetched.len(), 10);
    assert_eq!(st.recommendations.len(), 10);
}

#[tokio::test]
async fn rerating_moves_between_disjoint_categories() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);
    let target = movie(42);

    engine.rate(&target, UserRating::Like).await;
    assert_eq!(window_ids(&engine.liked().await), vec![42]);
    assert_eq!(engine.history().await.len(), 1);
    assert!(engine.history().await[0].date_watched.is_some());

    engine.rate(&target, UserRating::Dislike).await;
    assert!(engine.liked().await.is_empty());
    assert!(engine.neutral().await.is_empty());
    assert_eq!(window_ids(&engine.disliked().await), vec![42]);
    // Re-rating does not duplicate history.
    assert_eq!(engine.history().await.len(), 1);
}

#[tokio::test]
async fn genres_track_liked_movies_sorted_and_deduplicated() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);

    let drama = movie_with_genres(1, "Drama · Thriller");
    let action = movie_with_genres(2, "Action · Drama");
    engine.rate(&drama, UserRating::Like).await;
    engine.rate(&action, UserRating::Like).await;
    assert_eq!(engine.genres().await, vec!["Action", "Drama", "Thriller"]);

    // Disliking removes its tokens unless another liked movie carries them.
    engine.rate(&drama, UserRating::Dislike).await;
    assert_eq!(engine.genres().await, vec!["Action", "Drama"]);
}

#[tokio::test]
async fn queue_is_strict_fifo_and_pauses_on_failure() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);

    gateway.fail_next_mutations(1);
    engine.rate(&movie(1), UserRating::Like).await;
    // Head failed; it and anything behind it stay queued.
    assert_eq!(engine.pending_actions().await.len(), 1);

    engine.add_to_watchlist(&movie(2)).await;
    assert!(engine.pending_actions().await.is_empty());

    let attempts = gateway.attempts();
    assert_eq!(attempts, vec!["rate:1:like", "rate:1:like", "watchlist_add:2"]);
    // The later action was never attempted before the head succeeded, and
    // the head's side effects happened exactly once.
    assert_eq!(gateway.confirmed(), vec!["rate:1:like", "watchlist_add:2"]);
}

#[tokio::test]
async fn like_then_dislike_applies_in_user_order() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);
    let target = movie(7);

    // Both ratings happen before anything reaches the backend.
    gateway.fail_next_mutations(2);
    engine.rate(&target, UserRating::Like).await;
    engine.rate(&target, UserRating::Dislike).await;

    assert_eq!(
        engine.pending_actions().await,
        vec![
            PendingAction::Rate { movie_id: 7, rating: UserRating::Like, title: "Movie 7".into() },
            PendingAction::Rate { movie_id: 7, rating: UserRating::Dislike, title: "Movie 7".into() },
        ]
    );

    engine.process_queue().await;
    assert_eq!(gateway.confirmed(), vec!["rate:7:like", "rate:7:dislike"]);
    assert!(engine.liked().await.is_empty());
    assert_eq!(window_ids(&engine.disliked().await), vec![7]);
}

#[tokio::test]
async fn shown_set_flushes_at_threshold() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);

    // Keep the flush queued so it can be inspected.
    gateway.fail_next_mutations(usize::MAX);

    engine.mark_as_shown(&movie(3)).await;
    engine.mark_as_shown(&movie(3)).await; // idempotent re-mark
    engine.mark_as_shown(&movie(1)).await;
    assert!(engine.pending_actions().await.is_empty());

    engine.mark_as_shown(&movie(2)).await;
    assert_eq!(
        engine.pending_actions().await,
        vec![PendingAction::SyncShown { movie_ids: vec![1, 2, 3] }]
    );

    let st = engine.inner.state.lock().await;
    assert!(st.shown_ids.is_empty());
    assert_eq!(st.shown_session.len(), 3);
}

#[tokio::test]
async fn status_counts_unseen_against_window_membership() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=10));
    let engine = engine_with(&gateway);
    engine.refresh().await.unwrap();

    // Shown ids outside the window must not eat into the unseen count,
    // even after their flush drains the pending set.
    engine.mark_as_shown(&movie(100)).await;
    engine.mark_as_shown(&movie(101)).await;
    engine.mark_as_shown(&movie(102)).await;
    assert!(engine.pending_actions().await.is_empty());

    let status = engine.status().await;
    assert_eq!(status.shown_count, 3);
    assert_eq!(status.unseen_in_window, 10);
    assert_eq!(status.total_remaining, 10);

    engine.mark_as_shown(&movie(1)).await;
    let status = engine.status().await;
    assert_eq!(status.shown_count, 4);
    assert_eq!(status.unseen_in_window, 9);

    // Re-marking a flushed id stays idempotent: no new sync is queued.
    engine.mark_as_shown(&movie(100)).await;
    let syncs = gateway
        .attempts()
        .iter()
        .filter(|c| c.starts_with("sync_shown"))
        .count();
    assert_eq!(syncs, 1);
    assert_eq!(engine.status().await.shown_count, 4);
}

#[tokio::test]
async fn queue_processing_skips_when_nothing_is_queued() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);

    engine.process_queue().await;

    assert!(gateway.attempts().is_empty());
    assert!(engine.pending_actions().await.is_empty());
}

#[tokio::test]
async fn load_more_below_low_water_refills_and_pages() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=22));
    let engine = engine_with(&gateway);
    engine.refresh().await.unwrap();

    engine.mark_as_shown(&movie(1)).await;
    engine.mark_as_shown(&movie(2)).await;

    gateway.push_feed(movies(30..=39));
    // 12 unseen of 22 is below the low-water mark of 15.
    let outcome = engine.load_more().await;
    assert_eq!(outcome.appended, 10);
    assert_eq!(engine.status().await.window_len, 20);

    let refill = outcome.refill.expect("refill should have been triggered");
    refill.await.unwrap();

    // The flush went out ahead of the refill and the buffer grew.
    assert!(gateway.confirmed().contains(&"sync_shown:1,2".to_string()));
    assert_eq!(engine.inner.state.lock().await.all_fetched.len(), 32);
    assert!(engine.pending_actions().await.is_empty());
}

#[tokio::test]
async fn load_more_above_low_water_only_pages() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=30));
    let engine = engine_with(&gateway);
    engine.refresh().await.unwrap();

    let outcome = engine.load_more().await;
    assert_eq!(outcome.appended, 10);
    assert!(outcome.refill.is_none());
    assert_eq!(engine.status().await.window_len, 20);
    assert!(engine.pending_actions().await.is_empty());
}

#[tokio::test]
async fn load_more_clamps_to_remaining_buffer() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=13));
    let engine = engine_with(&gateway);
    engine.refresh().await.unwrap();

    let outcome = engine.load_more().await;
    assert_eq!(outcome.appended, 3);
    assert_eq!(engine.status().await.window_len, 13);

    if let Some(handle) = outcome.refill {
        handle.await.unwrap();
    }

    // Nothing left to page; never reads out of bounds.
    let outcome = engine.load_more().await;
    assert_eq!(outcome.appended, 0);
    if let Some(handle) = outcome.refill {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn refill_cadence_counts_confirmed_ratings_only() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=5));
    let engine = engine_with(&gateway);
    engine.refresh().await.unwrap();

    engine.rate(&movie(101), UserRating::Like).await;
    engine.rate(&movie(102), UserRating::Neutral).await;
    let fetches = |gw: &MockGateway| {
        gw.attempts().iter().filter(|c| c.as_str() == "fetch_recs").count()
    };
    assert_eq!(fetches(&gateway), 1);

    // Third confirmed rating triggers the refill.
    engine.rate(&movie(103), UserRating::Like).await;
    assert_eq!(fetches(&gateway), 2);
}

#[tokio::test]
async fn unconfirmed_ratings_do_not_trigger_refill() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);

    gateway.fail_next_mutations(usize::MAX);
    engine.rate(&movie(1), UserRating::Like).await;
    engine.rate(&movie(2), UserRating::Like).await;
    engine.rate(&movie(3), UserRating::Like).await;

    let fetches = gateway.attempts().iter().filter(|c| c.as_str() == "fetch_recs").count();
    assert_eq!(fetches, 0);
    assert_eq!(engine.pending_actions().await.len(), 3);
}

#[tokio::test]
async fn optimistic_state_survives_backend_failure() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);

    gateway.fail_next_mutations(usize::MAX);
    engine.rate(&movie(5), UserRating::Like).await;
    engine.add_to_watchlist(&movie(6)).await;

    // The user sees success immediately; reconciliation is deferred.
    assert_eq!(window_ids(&engine.liked().await), vec![5]);
    assert_eq!(window_ids(&engine.watchlist().await), vec![6]);
    assert_eq!(engine.pending_actions().await.len(), 2);
}

#[tokio::test]
async fn watchlist_add_then_remove_round_trip() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);
    let target = movie(9);

    engine.add_to_watchlist(&target).await;
    engine.add_to_watchlist(&target).await; // no duplicate entry
    assert_eq!(engine.watchlist().await.len(), 1);

    engine.remove_from_watchlist(&target).await;
    assert!(engine.watchlist().await.is_empty());
    assert_eq!(
        gateway.confirmed(),
        vec!["watchlist_add:9", "watchlist_add:9", "watchlist_remove:9"]
    );
}

#[tokio::test]
async fn hydrate_profile_resolves_id_lists() {
    let gateway = MockGateway::new();
    gateway.set_profile(UserProfileDto {
        name: "tester".to_string(),
        genres: None,
        movie_ids: None,
        data: UserDataDto {
            liked: vec![1],
            disliked: vec![2],
            neutral: vec![3],
            watchlist: vec![4],
            history: vec![1, 2, 3],
        },
    });
    gateway.add_to_catalog(vec![
        movie_with_genres(1, "Drama · Mystery"),
        movie(2),
        movie(3),
        movie(4),
    ]);
    gateway.push_feed(movies(10..=14));
    let engine = engine_with(&gateway);

    engine.hydrate_profile().await.unwrap();

    assert_eq!(window_ids(&engine.history().await), vec![1, 2, 3]);
    assert!(engine.history().await.iter().all(|m| m.date_watched.is_some()));
    assert_eq!(window_ids(&engine.watchlist().await), vec![4]);
    assert_eq!(window_ids(&engine.liked().await), vec![1]);
    assert_eq!(window_ids(&engine.disliked().await), vec![2]);
    assert_eq!(window_ids(&engine.neutral().await), vec![3]);
    assert_eq!(engine.genres().await, vec!["Drama", "Mystery"]);
    // Profile load chains into a fresh recommendations fetch.
    assert_eq!(window_ids(&engine.recommendations().await), (10..=14).collect::<Vec<u32>>());
}

#[tokio::test]
async fn hydrate_profile_failure_still_fetches_feed() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=5));
    let engine = engine_with(&gateway);

    assert!(engine.hydrate_profile().await.is_err());
    assert_eq!(engine.recommendations().await.len(), 5);
    assert!(engine.history().await.is_empty());
}

#[tokio::test]
async fn sync_user_profile_uploads_then_refreshes() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);

    engine.rate(&movie_with_genres(1, "Drama"), UserRating::Like).await;
    engine.rate(&movie(2), UserRating::Dislike).await;

    gateway.push_feed(movies(20..=24));
    engine.sync_user_profile(&["Cinephile".to_string()]).await.unwrap();

    assert!(gateway.confirmed().contains(&"create_profile:tester:2".to_string()));
    // Fresh load, not refill: the window is exactly the new page.
    assert_eq!(window_ids(&engine.recommendations().await), (20..=24).collect::<Vec<u32>>());
}

#[tokio::test]
async fn load_personas_caches_descriptors() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);

    let personas = engine.load_personas().await.unwrap();
    assert_eq!(personas.len(), 1);
    assert_eq!(personas[0].title, "Cinephile");
    assert_eq!(engine.personas().await, personas);
}

#[tokio::test]
async fn remove_from_history_is_local_only() {
    let gateway = MockGateway::new();
    let engine = engine_with(&gateway);
    let target = movie_with_genres(1, "Drama");

    engine.rate(&target, UserRating::Like).await;
    let mutations_before = gateway.attempts().len();

    engine.remove_from_history(&target).await;
    assert!(engine.history().await.is_empty());
    assert!(engine.liked().await.is_empty());
    assert!(engine.genres().await.is_empty());
    assert_eq!(gateway.attempts().len(), mutations_before);
}

#[tokio::test]
async fn reset_tears_down_session_state() {
    let gateway = MockGateway::new();
    gateway.push_feed(movies(1..=10));
    let engine = engine_with(&gateway);
    engine.refresh().await.unwrap();

    gateway.fail_next_mutations(usize::MAX);
    engine.rate(&movie(1), UserRating::Like).await;
    engine.mark_as_shown(&movie(2)).await;

    engine.reset().await;

    assert!(engine.recommendations().await.is_empty());
    assert!(engine.history().await.is_empty());
    assert!(engine.genres().await.is_empty());
    assert!(engine.pending_actions().await.is_empty());
    let status = engine.status().await;
    assert_eq!(status.shown_count, 0);
    assert_eq!(status.total_remaining, 0);
}
