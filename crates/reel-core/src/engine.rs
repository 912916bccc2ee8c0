use chrono::Utc;
use reel_config::FeedTuning;
use reel_gateway::{GatewayError, RecommendationGateway};
use reel_models::{Movie, PendingAction, Persona, UserRating};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Stateful core of the client: the recommendation buffer, the visible
/// window, the user's rated/watchlisted state, shown tracking, and the
/// pending-action queue that reconciles optimistic mutations with the
/// backend.
///
/// All feed state lives behind a single mutex (one writer at a time); the
/// lock is never held across a gateway call, so optimistic updates stay
/// synchronous while network I/O is in flight. Cloning the engine is cheap
/// and shares the same state.
#[derive(Clone)]
pub struct FeedEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    gateway: Arc<dyn RecommendationGateway>,
    user_id: String,
    tuning: FeedTuning,
    state: Mutex<FeedState>,
    queue: crate::queue::PendingQueue,
    /// Single in-flight flag for fresh/refill fetches: a second fetch
    /// arriving while one runs is dropped, not queued.
    fetch_in_flight: AtomicBool,
    /// Single in-flight flag for the queue processor.
    queue_in_flight: AtomicBool,
}

#[derive(Default)]
struct FeedState {
    history: Vec<Movie>,
    watchlist: Vec<Movie>,
    liked: Vec<Movie>,
    neutral: Vec<Movie>,
    disliked: Vec<Movie>,
    genres: Vec<String>,
    /// The visible window, in buffer order.
    recommendations: Vec<Movie>,
    /// Full fetched buffer; superset of `recommendations`.
    all_fetched: Vec<Movie>,
    /// Ids scrolled past but not yet flushed to the backend.
    shown_ids: HashSet<u32>,
    /// Every id scrolled past this session; survives flushes.
    shown_session: HashSet<u32>,
    /// Ratings confirmed by the backend; drives the refill cadence.
    confirmed_ratings: u64,
    personas: Vec<Persona>,
}

/// Point-in-time view of the feed for display and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStatus {
    pub window_len: usize,
    /// Buffered entries not yet paged into the window.
    pub buffer_len: usize,
    /// Distinct ids marked shown this session, flushed or not.
    pub shown_count: u64,
    /// Window entries the user has not scrolled past this session.
    pub unseen_in_window: usize,
    pub total_remaining: usize,
    pub pending_actions: usize,
}

/// Result of a windowing step. `refill` is the background task driving the
/// shown-set flush and the deduplicating fetch; windowing itself never
/// blocks on it.
pub struct LoadMoreOutcome {
    pub appended: usize,
    pub refill: Option<JoinHandle<()>>,
}

impl FeedState {
    /// Append up to `page_size` buffered-but-unseen movies to the window,
    /// clamped to what remains.
    fn advance_window(&mut self, page_size: usize) -> usize {
        let current = self.recommendations.len();
        if current >= self.all_fetched.len() {
            return 0;
        }
        let remaining = self.all_fetched.len() - current;
        let batch = page_size.min(remaining);
        self.recommendations
            .extend_from_slice(&self.all_fetched[current..current + batch]);
        batch
    }

    /// Take the accumulated shown ids, leaving the set empty. Sorted so the
    /// flushed payload is deterministic.
    fn drain_shown(&mut self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.shown_ids.drain().collect();
        ids.sort_unstable();
        ids
    }

    /// Ids the feed must never serve again: everything rated, watchlisted,
    /// already fetched, or scrolled past.
    fn known_ids(&self) -> HashSet<u32> {
        let mut ids: HashSet<u32> = self.shown_session.clone();
        ids.extend(self.history.iter().map(|m| m.tmdb_id));
        ids.extend(self.watchlist.iter().map(|m| m.tmdb_id));
        ids.extend(self.all_fetched.iter().map(|m| m.tmdb_id));
        ids.extend(self.recommendations.iter().map(|m| m.tmdb_id));
        ids
    }

    /// Optimistic rating: one membership across the three category lists,
    /// history append on first rating, genres rebuilt.
    fn apply_rating(&mut self, movie: &Movie, rating: UserRating) {
        if !self.history.iter().any(|m| m.tmdb_id == movie.tmdb_id) {
            let mut entry = movie.clone();
            entry.date_watched = Some(Utc::now());
            self.history.push(entry);
        }
        self.remove_from_categories(movie.tmdb_id);
        match rating {
            UserRating::Like => self.liked.push(movie.clone()),
            UserRating::Neutral => self.neutral.push(movie.clone()),
            UserRating::Dislike => self.disliked.push(movie.clone()),
        }
        self.rebuild_genres();
    }

    fn remove_from_categories(&mut self, tmdb_id: u32) {
        self.liked.retain(|m| m.tmdb_id != tmdb_id);
        self.neutral.retain(|m| m.tmdb_id != tmdb_id);
        self.disliked.retain(|m| m.tmdb_id != tmdb_id);
    }

    /// `genres` is always the sorted, deduplicated set of genre tokens of
    /// the currently liked movies.
    fn rebuild_genres(&mut self) {
        let tokens: BTreeSet<String> = self
            .liked
            .iter()
            .flat_map(|m| m.genre_tokens().map(str::to_string).collect::<Vec<_>>())
            .collect();
        self.genres = tokens.into_iter().collect();
    }

    fn status(&self, pending_actions: usize) -> FeedStatus {
        let window_len = self.recommendations.len();
        let buffer_len = self.all_fetched.len().saturating_sub(window_len);
        // Counted against actual window membership; shown ids outside the
        // window do not eat into the unseen count.
        let unseen_in_window = self
            .recommendations
            .iter()
            .filter(|m| !self.shown_session.contains(&m.tmdb_id))
            .count();
        FeedStatus {
            window_len,
            buffer_len,
            shown_count: self.shown_session.len() as u64,
            unseen_in_window,
            total_remaining: unseen_in_window + buffer_len,
            pending_actions,
        }
    }
}

impl FeedEngine {
    pub fn new(
        gateway: Arc<dyn RecommendationGateway>,
        user_id: impl Into<String>,
        tuning: FeedTuning,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                gateway,
                user_id: user_id.into(),
                tuning,
                state: Mutex::new(FeedState::default()),
                queue: crate::queue::PendingQueue::new(),
                fetch_in_flight: AtomicBool::new(false),
                queue_in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// Session start: fetch the profile, hydrate history/watchlist/category
    /// lists by batch-resolving full movie records, rebuild genres, then do
    /// a fresh recommendations fetch if the window is empty. A profile
    /// failure still falls back to the fresh fetch.
    pub async fn hydrate_profile(&self) -> Result<(), GatewayError> {
        self.inner.hydrate_profile().await
    }

    /// Fresh load: replaces the buffer wholesale and resets the window to
    /// its initial size.
    pub async fn refresh(&self) -> Result<(), GatewayError> {
        self.inner.fetch_recommendations(false).await
    }

    /// Windowing step, called when the UI reaches the end of the visible
    /// window. May kick off a background shown-flush + refill when the
    /// unseen buffer drops below the low-water mark.
    pub async fn load_more(&self) -> LoadMoreOutcome {
        let (appended, flush_ids, buffer_low) = {
            let mut st = self.inner.state.lock().await;
            let unseen = st.all_fetched.len().saturating_sub(st.recommendations.len());
            let buffer_low = unseen < self.inner.tuning.low_water_mark;
            let flush_ids = if buffer_low {
                debug!(unseen, "Buffer low, flushing shown set and refilling");
                st.drain_shown()
            } else {
                Vec::new()
            };
            (st.advance_window(self.inner.tuning.page_size), flush_ids, buffer_low)
        };

        if appended > 0 {
            debug!(appended, "Paged movies from buffer into window");
        }
        if !flush_ids.is_empty() {
            self.inner
                .queue
                .enqueue(PendingAction::SyncShown { movie_ids: flush_ids })
                .await;
        }

        let refill = if buffer_low {
            let inner = Arc::clone(&self.inner);
            Some(tokio::spawn(async move {
                inner.process_queue().await;
                let _ = inner.fetch_recommendations(true).await;
            }))
        } else {
            None
        };

        LoadMoreOutcome { appended, refill }
    }

    /// Record that a movie card was displayed. Idempotent per id; reaching
    /// the flush threshold turns the accumulated ids into one `SyncShown`
    /// pending action.
    pub async fn mark_as_shown(&self, movie: &Movie) {
        self.inner.mark_as_shown(movie).await;
    }

    /// Rate a movie: optimistic local categorization, then a queued `Rate`
    /// action reconciled with the backend.
    pub async fn rate(&self, movie: &Movie, rating: UserRating) {
        self.inner.rate(movie, rating).await;
    }

    pub async fn add_to_watchlist(&self, movie: &Movie) {
        self.inner.add_to_watchlist(movie).await;
    }

    pub async fn remove_from_watchlist(&self, movie: &Movie) {
        self.inner.remove_from_watchlist(movie).await;
    }

    /// Local-only un-rate: drops the movie from history and whichever
    /// category list held it.
    pub async fn remove_from_history(&self, movie: &Movie) {
        self.inner.remove_from_history(movie).await;
    }

    /// Bulk profile sync at the end of onboarding: uploads the accumulated
    /// history and genres (plus optional persona picks) as one
    /// profile-replacing call, then fetches fresh recommendations.
    pub async fn sync_user_profile(&self, personas: &[String]) -> Result<(), GatewayError> {
        self.inner.sync_user_profile(personas).await
    }

    pub async fn load_personas(&self) -> Result<Vec<Persona>, GatewayError> {
        self.inner.load_personas().await
    }

    /// Drive the pending-action queue. No-op if a processor is already
    /// running; pauses on the first failure, leaving the failed action and
    /// everything behind it queued.
    pub async fn process_queue(&self) {
        self.inner.process_queue().await;
    }

    /// Tear down all per-user state on sign-out. Nothing leaks into the
    /// next session.
    pub async fn reset(&self) {
        self.inner.reset().await;
    }

    pub async fn recommendations(&self) -> Vec<Movie> {
        self.inner.state.lock().await.recommendations.clone()
    }

    pub async fn history(&self) -> Vec<Movie> {
        self.inner.state.lock().await.history.clone()
    }

    pub async fn watchlist(&self) -> Vec<Movie> {
        self.inner.state.lock().await.watchlist.clone()
    }

    pub async fn liked(&self) -> Vec<Movie> {
        self.inner.state.lock().await.liked.clone()
    }

    pub async fn neutral(&self) -> Vec<Movie> {
        self.inner.state.lock().await.neutral.clone()
    }

    pub async fn disliked(&self) -> Vec<Movie> {
        self.inner.state.lock().await.disliked.clone()
    }

    pub async fn genres(&self) -> Vec<String> {
        self.inner.state.lock().await.genres.clone()
    }

    pub async fn personas(&self) -> Vec<Persona> {
        self.inner.state.lock().await.personas.clone()
    }

    pub async fn pending_actions(&self) -> Vec<PendingAction> {
        self.inner.queue.snapshot().await
    }

    pub async fn status(&self) -> FeedStatus {
        let pending = self.inner.queue.len().await;
        self.inner.state.lock().await.status(pending)
    }
}

impl EngineInner {
    #[instrument(skip(self), fields(user = %self.user_id))]
    async fn hydrate_profile(&self) -> Result<(), GatewayError> {
        let profile = match self.gateway.fetch_user_profile(&self.user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(error = %err, "Failed to fetch user profile");
                // Last-good (here: empty) state stays; still try to get a feed.
                if self.state.lock().await.recommendations.is_empty() {
                    let _ = self.fetch_recommendations(false).await;
                }
                return Err(err);
            }
        };
        info!(name = %profile.name, "Profile fetched");

        let ids = profile.data.all_ids();
        if !ids.is_empty() {
            match self.gateway.fetch_movies_by_ids(&ids).await {
                Ok(movies) => {
                    let by_id: HashMap<u32, Movie> =
                        movies.into_iter().map(|m| (m.tmdb_id, m)).collect();
                    let hydrate = |ids: &[u32]| -> Vec<Movie> {
                        ids.iter().filter_map(|id| by_id.get(id).cloned()).collect()
                    };

                    let mut st = self.state.lock().await;
                    st.watchlist = hydrate(&profile.data.watchlist);
                    st.history = hydrate(&profile.data.history)
                        .into_iter()
                        .map(|mut m| {
                            m.date_watched = Some(Utc::now());
                            m
                        })
                        .collect();
                    st.liked = hydrate(&profile.data.liked);
                    st.disliked = hydrate(&profile.data.disliked);
                    st.neutral = hydrate(&profile.data.neutral);
                    st.rebuild_genres();
                    info!(
                        watchlist = st.watchlist.len(),
                        history = st.history.len(),
                        "Profile hydrated"
                    );
                }
                Err(err) => warn!(error = %err, "Failed to hydrate movie details"),
            }
        }

        if self.state.lock().await.recommendations.is_empty() {
            self.fetch_recommendations(false).await?;
        }
        Ok(())
    }

    /// Fresh load replaces the buffer; refill appends only what the user
    /// has never been offered. Reentrancy-guarded: a request arriving while
    /// a fetch is in flight is dropped.
    async fn fetch_recommendations(&self, refill: bool) -> Result<(), GatewayError> {
        if self.fetch_in_flight.swap(true, Ordering::SeqCst) {
            debug!("Recommendation fetch already in flight, dropping request");
            return Ok(());
        }
        let result = self.fetch_recommendations_inner(refill).await;
        self.fetch_in_flight.store(false, Ordering::SeqCst);
        if let Err(err) = &result {
            // State is untouched on failure; the last-good feed stays visible.
            warn!(refill, error = %err, "Failed to fetch recommendations");
        }
        result
    }

    async fn fetch_recommendations_inner(&self, refill: bool) -> Result<(), GatewayError> {
        debug!(refill, "Fetching recommendations");
        let fetched = self.gateway.fetch_recommendations(&self.user_id).await?;

        let mut st = self.state.lock().await;
        if refill {
            let known = st.known_ids();
            let total = fetched.len();
            let fresh: Vec<Movie> = fetched
                .into_iter()
                .filter(|m| !known.contains(&m.tmdb_id))
                .collect();
            debug!(candidates = total, deduped = total - fresh.len(), "Refill candidates");
            if fresh.is_empty() {
                return Ok(());
            }
            st.all_fetched.extend(fresh);
            // Top the window up directly; no re-entrant refill from here.
            let appended = st.advance_window(self.tuning.page_size);
            debug!(appended, buffer = st.all_fetched.len(), "Refill appended to buffer");
        } else {
            st.all_fetched = fetched;
            let initial = self.tuning.initial_window.min(st.all_fetched.len());
            st.recommendations = st.all_fetched[..initial].to_vec();
            info!(total = st.all_fetched.len(), window = initial, "Fresh load complete");
        }
        Ok(())
    }

    async fn mark_as_shown(&self, movie: &Movie) {
        let flush_ids = {
            let mut st = self.state.lock().await;
            if !st.shown_session.insert(movie.tmdb_id) {
                return;
            }
            st.shown_ids.insert(movie.tmdb_id);
            if st.shown_ids.len() >= self.tuning.shown_flush_threshold {
                st.drain_shown()
            } else {
                Vec::new()
            }
        };
        if !flush_ids.is_empty() {
            debug!(count = flush_ids.len(), "Queuing sync for shown ids");
            self.queue
                .enqueue(PendingAction::SyncShown { movie_ids: flush_ids })
                .await;
            self.process_queue().await;
        }
    }

    async fn rate(&self, movie: &Movie, rating: UserRating) {
        {
            let mut st = self.state.lock().await;
            st.apply_rating(movie, rating);
        }
        debug!(title = %movie.title, rating = %rating, "Queuing rating");
        self.queue
            .enqueue(PendingAction::Rate {
                movie_id: movie.tmdb_id,
                rating,
                title: movie.title.clone(),
            })
            .await;
        self.process_queue().await;
    }

    async fn add_to_watchlist(&self, movie: &Movie) {
        {
            let mut st = self.state.lock().await;
            if !st.watchlist.iter().any(|m| m.tmdb_id == movie.tmdb_id) {
                let mut entry = movie.clone();
                entry.date_added = Utc::now();
                st.watchlist.push(entry);
            }
        }
        self.queue
            .enqueue(PendingAction::WatchlistAdd {
                movie_id: movie.tmdb_id,
                title: movie.title.clone(),
            })
            .await;
        self.process_queue().await;
    }

    async fn remove_from_watchlist(&self, movie: &Movie) {
        {
            let mut st = self.state.lock().await;
            st.watchlist.retain(|m| m.tmdb_id != movie.tmdb_id);
        }
        self.queue
            .enqueue(PendingAction::WatchlistRemove {
                movie_id: movie.tmdb_id,
                title: movie.title.clone(),
            })
            .await;
        self.process_queue().await;
    }

    async fn remove_from_history(&self, movie: &Movie) {
        let mut st = self.state.lock().await;
        st.history.retain(|m| m.tmdb_id != movie.tmdb_id);
        st.remove_from_categories(movie.tmdb_id);
        st.rebuild_genres();
    }

    #[instrument(skip(self, personas), fields(user = %self.user_id))]
    async fn sync_user_profile(&self, personas: &[String]) -> Result<(), GatewayError> {
        let (genres, movie_ids) = {
            let st = self.state.lock().await;
            let ids: Vec<u32> = st.history.iter().map(|m| m.tmdb_id).collect();
            (st.genres.clone(), ids)
        };
        self.gateway
            .create_or_update_profile(&self.user_id, &genres, &movie_ids, personas)
            .await?;
        info!(movies = movie_ids.len(), "Profile bulk sync successful");
        self.fetch_recommendations(false).await
    }

    async fn load_personas(&self) -> Result<Vec<Persona>, GatewayError> {
        let personas = self.gateway.fetch_personas().await?;
        self.state.lock().await.personas = personas.clone();
        Ok(personas)
    }

    async fn process_queue(&self) {
        if self.queue.is_empty().await {
            return;
        }
        if self.queue_in_flight.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Processing pending actions");
        while let Some(action) = self.queue.peek().await {
            match self.dispatch(&action).await {
                Ok(()) => {
                    // Dequeue only after the backend confirmed.
                    self.queue.confirm_front().await;
                    if matches!(action, PendingAction::Rate { .. }) {
                        self.note_rating_confirmed().await;
                    }
                }
                Err(err) => {
                    warn!(kind = action.kind(), error = %err, "Pending action failed, pausing queue");
                    self.queue_in_flight.store(false, Ordering::SeqCst);
                    return;
                }
            }
        }
        debug!("Pending action queue drained");
        self.queue_in_flight.store(false, Ordering::SeqCst);
    }

    async fn dispatch(&self, action: &PendingAction) -> Result<(), GatewayError> {
        match action {
            PendingAction::Rate { movie_id, rating, title } => {
                debug!(title = %title, rating = %rating, "Sending rating");
                self.gateway.rate_movie(&self.user_id, *movie_id, *rating).await
            }
            PendingAction::WatchlistAdd { movie_id, title } => {
                debug!(title = %title, "Sending watchlist add");
                self.gateway.add_to_watchlist(&self.user_id, *movie_id).await
            }
            PendingAction::WatchlistRemove { movie_id, title } => {
                debug!(title = %title, "Sending watchlist remove");
                self.gateway.remove_from_watchlist(&self.user_id, *movie_id).await
            }
            PendingAction::SyncShown { movie_ids } => {
                debug!(count = movie_ids.len(), "Sending shown sync");
                self.gateway.sync_shown_movies(&self.user_id, movie_ids).await
            }
        }
    }

    /// Counted only on backend confirmation, never on enqueue, so a rating
    /// that never reached the backend can't trigger a refill.
    async fn note_rating_confirmed(&self) {
        let refill_due = {
            let mut st = self.state.lock().await;
            st.confirmed_ratings += 1;
            st.confirmed_ratings % self.tuning.refill_rating_interval == 0
        };
        if refill_due {
            debug!("Confirmed rating cadence reached, refilling");
            let _ = self.fetch_recommendations(true).await;
        }
    }

    async fn reset(&self) {
        *self.state.lock().await = FeedState::default();
        self.queue.clear().await;
        info!("Feed state reset");
    }
}

#[cfg(test)]
mod tests;
