//! Per-key sliding-window timestamp logs.
//!
//! Every key owns an ascending log of the instants at which an event was admitted. Logs are
//! pruned lazily whenever their key is touched; nothing sweeps them in the background. An
//! entry counts while `now - entry < window`, so the oldest entry stops counting exactly at
//! [`RateLimitState::reset_at`].

// self
use crate::_prelude::*;

type Bucket = Arc<Mutex<VecDeque<Instant>>>;

/// Quota view derived from one key's log at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitState {
	/// Events currently inside the window.
	pub count: usize,
	/// Maximum events admitted per window.
	pub limit: usize,
	/// Whether the next event would be denied.
	pub is_limited: bool,
	/// Events still admissible in the current window.
	pub remaining: usize,
	/// Instant at which the oldest counted event leaves the window.
	pub reset_at: Instant,
	/// Time until a slot frees up; zero unless limited.
	pub retry_after: Duration,
}
impl RateLimitState {
	fn from_log(log: &VecDeque<Instant>, max_requests: usize, window: Duration, now: Instant) -> Self {
		let count = log.len();
		let is_limited = count >= max_requests;
		let reset_at = log.front().map_or(now, |oldest| *oldest + window);
		let retry_after =
			if is_limited { reset_at.saturating_duration_since(now) } else { Duration::ZERO };

		Self {
			count,
			limit: max_requests,
			is_limited,
			remaining: max_requests.saturating_sub(count),
			reset_at,
			retry_after,
		}
	}

	/// State reported for a key that has no log yet.
	pub fn empty(max_requests: usize, now: Instant) -> Self {
		Self::from_log(&VecDeque::new(), max_requests, Duration::ZERO, now)
	}
}

/// Thread-safe map from key to timestamp log with one lock per key.
///
/// The key map sits behind a read/write lock that is only taken for writing when a key is
/// seen for the first time or removed, so check-then-record on distinct keys never contends.
#[derive(Debug, Default)]
pub struct SlidingWindowStore {
	buckets: RwLock<HashMap<String, Bucket>>,
}
impl SlidingWindowStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Prunes the key's log and appends `now` when fewer than `max_requests` events remain in
	/// the window.
	///
	/// Returns whether the event was recorded together with the resulting state: the
	/// post-append state when recorded, the untouched state otherwise. The whole sequence runs
	/// under the key's lock.
	pub fn record_if_below(
		&self,
		key: &str,
		max_requests: usize,
		window: Duration,
		now: Instant,
	) -> (bool, RateLimitState) {
		let bucket = self.bucket_or_insert(key);
		let mut log = bucket.lock();

		Self::prune(&mut log, window, now);

		if log.len() >= max_requests {
			return (false, RateLimitState::from_log(&log, max_requests, window, now));
		}

		log.push_back(now);

		(true, RateLimitState::from_log(&log, max_requests, window, now))
	}

	/// Computes the key's state without recording an event.
	pub fn state(
		&self,
		key: &str,
		max_requests: usize,
		window: Duration,
		now: Instant,
	) -> RateLimitState {
		let Some(bucket) = self.bucket(key) else {
			return RateLimitState::empty(max_requests, now);
		};
		let mut log = bucket.lock();

		Self::prune(&mut log, window, now);

		RateLimitState::from_log(&log, max_requests, window, now)
	}

	/// Drops one key's log. Returns `true` if the key was tracked.
	pub fn clear(&self, key: &str) -> bool {
		self.buckets.write().remove(key).is_some()
	}

	/// Drops every log.
	pub fn clear_all(&self) {
		self.buckets.write().clear();
	}

	/// Number of keys with a log.
	pub fn len(&self) -> usize {
		self.buckets.read().len()
	}

	/// Returns `true` when no key is tracked.
	pub fn is_empty(&self) -> bool {
		self.buckets.read().is_empty()
	}

	fn bucket(&self, key: &str) -> Option<Bucket> {
		self.buckets.read().get(key).cloned()
	}

	fn bucket_or_insert(&self, key: &str) -> Bucket {
		if let Some(bucket) = self.bucket(key) {
			return bucket;
		}

		self.buckets.write().entry(key.to_owned()).or_default().clone()
	}

	fn prune(log: &mut VecDeque<Instant>, window: Duration, now: Instant) {
		while let Some(oldest) = log.front() {
			if now.saturating_duration_since(*oldest) < window {
				break;
			}

			log.pop_front();
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const WINDOW: Duration = Duration::from_secs(10);

	#[test]
	fn unknown_key_reports_full_quota() {
		let store = SlidingWindowStore::new();
		let now = Instant::now();
		let state = store.state("missing", 3, WINDOW, now);

		assert_eq!(state.count, 0);
		assert_eq!(state.remaining, 3);
		assert!(!state.is_limited);
		assert_eq!(state.reset_at, now);
		assert_eq!(state.retry_after, Duration::ZERO);
		assert!(store.is_empty());
	}

	#[test]
	fn records_until_the_limit_then_refuses() {
		let store = SlidingWindowStore::new();
		let start = Instant::now();

		for offset in 0..3 {
			let (recorded, state) =
				store.record_if_below("k", 3, WINDOW, start + Duration::from_secs(offset));

			assert!(recorded);
			assert_eq!(state.count, offset as usize + 1);
		}

		let now = start + Duration::from_secs(4);
		let (recorded, state) = store.record_if_below("k", 3, WINDOW, now);

		assert!(!recorded);
		assert_eq!(state.count, 3);
		assert_eq!(state.remaining, 0);
		assert_eq!(state.reset_at, start + WINDOW);
		assert_eq!(state.retry_after, Duration::from_secs(6));
	}

	#[test]
	fn oldest_entry_stops_counting_at_reset_at() {
		let store = SlidingWindowStore::new();
		let start = Instant::now();

		store.record_if_below("k", 2, WINDOW, start);
		store.record_if_below("k", 2, WINDOW, start + Duration::from_secs(5));

		let before = store.state("k", 2, WINDOW, start + WINDOW - Duration::from_millis(1));

		assert!(before.is_limited);

		let at_reset = store.state("k", 2, WINDOW, start + WINDOW);

		assert!(!at_reset.is_limited);
		assert_eq!(at_reset.count, 1);
		assert_eq!(at_reset.reset_at, start + Duration::from_secs(5) + WINDOW);
	}

	#[test]
	fn keys_are_independent_and_clearable() {
		let store = SlidingWindowStore::new();
		let now = Instant::now();

		store.record_if_below("a", 1, WINDOW, now);
		store.record_if_below("b", 1, WINDOW, now);

		assert_eq!(store.len(), 2);
		assert!(store.state("a", 1, WINDOW, now).is_limited);
		assert!(store.clear("a"));
		assert!(!store.clear("a"));
		assert!(!store.state("a", 1, WINDOW, now).is_limited);
		assert!(store.state("b", 1, WINDOW, now).is_limited);

		store.clear_all();

		assert!(store.is_empty());
	}
}
