//! Sliding-window rate limiting with fixed policies and optional key namespaces.
//!
//! [`RateLimiter::check`] is synchronous and linearizable per key: the prune, count, and
//! append steps run under that key's lock, so two callers racing on the last slot can never
//! both be admitted. A denied check is an ordinary [`RateLimitDecision`], not an error.

pub mod presets;

// std
use std::borrow::Cow;
// self
use crate::{
	_prelude::*,
	obs::{self, Component, Outcome},
	window::{RateLimitState, SlidingWindowStore},
};

/// Fixed `(max_requests, window)` pair applied to every key of a limiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyParts", into = "PolicyParts")]
pub struct RateLimitPolicy {
	max_requests: usize,
	window: Duration,
}
impl RateLimitPolicy {
	/// General API traffic: 100 requests per minute.
	pub const API: Self = Self::preset(100, Duration::from_secs(60));
	/// Search-as-you-type traffic: 30 requests per minute.
	pub const SEARCH: Self = Self::preset(30, Duration::from_secs(60));
	/// Form submissions: 5 per minute.
	pub const FORM_SUBMISSION: Self = Self::preset(5, Duration::from_secs(60));
	/// Authentication attempts: 5 per 15 minutes.
	pub const AUTHENTICATION: Self = Self::preset(5, Duration::from_secs(15 * 60));

	/// Creates a policy after validation.
	pub fn new(max_requests: usize, window: Duration) -> Result<Self, ConfigError> {
		if max_requests == 0 {
			return Err(ConfigError::ZeroMaxRequests);
		}
		if window.is_zero() {
			return Err(ConfigError::ZeroWindow);
		}

		Ok(Self { max_requests, window })
	}

	const fn preset(max_requests: usize, window: Duration) -> Self {
		Self { max_requests, window }
	}

	/// Maximum events admitted per window.
	pub const fn max_requests(&self) -> usize {
		self.max_requests
	}

	/// Length of the sliding window.
	pub const fn window(&self) -> Duration {
		self.window
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PolicyParts {
	max_requests: usize,
	window: Duration,
}
impl TryFrom<PolicyParts> for RateLimitPolicy {
	type Error = ConfigError;

	fn try_from(parts: PolicyParts) -> Result<Self, Self::Error> {
		Self::new(parts.max_requests, parts.window)
	}
}
impl From<RateLimitPolicy> for PolicyParts {
	fn from(policy: RateLimitPolicy) -> Self {
		Self { max_requests: policy.max_requests, window: policy.window }
	}
}

/// Outcome of [`RateLimiter::check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitDecision {
	/// Whether the event was admitted and recorded.
	pub allowed: bool,
	/// Post-append state when allowed, current state when denied.
	pub state: RateLimitState,
}

/// Sliding-window limiter applying one [`RateLimitPolicy`] to independent keys.
#[derive(Debug)]
pub struct RateLimiter {
	policy: RateLimitPolicy,
	key_prefix: Option<String>,
	store: SlidingWindowStore,
	admission_guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}
impl RateLimiter {
	/// Creates a limiter with its own empty store.
	pub fn new(policy: RateLimitPolicy) -> Self {
		Self {
			policy,
			key_prefix: None,
			store: SlidingWindowStore::new(),
			admission_guards: Default::default(),
		}
	}

	/// Namespaces every key as `"{prefix}:{key}"`.
	pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.key_prefix = Some(prefix.into());

		self
	}

	/// Policy applied to every key.
	pub fn policy(&self) -> RateLimitPolicy {
		self.policy
	}

	/// Prefix applied to keys, if any.
	pub fn key_prefix(&self) -> Option<&str> {
		self.key_prefix.as_deref()
	}

	/// Checks the key's quota and records the event when admitted.
	pub fn check(&self, key: &str) -> RateLimitDecision {
		self.check_at(key, Instant::now())
	}

	/// [`RateLimiter::check`] against an explicit instant.
	pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
		let (allowed, state) = self.store.record_if_below(
			&self.storage_key(key),
			self.policy.max_requests,
			self.policy.window,
			now,
		);

		obs::record_outcome(
			Component::RateLimiter,
			if allowed { Outcome::Allowed } else { Outcome::Limited },
		);

		RateLimitDecision { allowed, state }
	}

	/// Reports the key's state without recording anything.
	pub fn state(&self, key: &str) -> RateLimitState {
		self.state_at(key, Instant::now())
	}

	/// [`RateLimiter::state`] against an explicit instant.
	pub fn state_at(&self, key: &str, now: Instant) -> RateLimitState {
		self.store.state(&self.storage_key(key), self.policy.max_requests, self.policy.window, now)
	}

	/// Clears one key.
	pub fn reset(&self, key: &str) {
		self.store.clear(&self.storage_key(key));

		let mut guards = self.admission_guards.lock();

		if guards.get(key).is_some_and(|guard| Arc::strong_count(guard) == 1) {
			guards.remove(key);
		}
	}

	/// Clears every key.
	pub fn reset_all(&self) {
		self.store.clear_all();
		self.admission_guards.lock().retain(|_, guard| Arc::strong_count(guard) > 1);
	}

	/// Number of keys currently holding a log.
	pub fn tracked_keys(&self) -> usize {
		self.store.len()
	}

	/// Waits until the key admits an event, records it, and returns the post-append state.
	///
	/// Concurrent waiters on the same key are admitted in arrival order; callers on other keys
	/// are unaffected. Plain [`RateLimiter::check`] calls are not ordered against waiters.
	pub async fn acquire(&self, key: &str) -> RateLimitState {
		let ticket = self.admission_ticket(key);
		let _admission = ticket.guard.lock().await;

		loop {
			let decision = self.check(key);

			if decision.allowed {
				return decision.state;
			}

			tokio::time::sleep(decision.state.retry_after).await;
		}
	}

	fn storage_key<'a>(&self, key: &'a str) -> Cow<'a, str> {
		match &self.key_prefix {
			Some(prefix) => Cow::Owned(format!("{prefix}:{key}")),
			None => Cow::Borrowed(key),
		}
	}

	fn admission_ticket<'a>(&'a self, key: &'a str) -> AdmissionTicket<'a> {
		let mut guards = self.admission_guards.lock();
		let guard =
			guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone();

		AdmissionTicket { limiter: self, key, guard }
	}
}

/// Shared handle to one key's admission guard; the last ticket out removes the map entry.
struct AdmissionTicket<'a> {
	limiter: &'a RateLimiter,
	key: &'a str,
	guard: Arc<AsyncMutex<()>>,
}
impl Drop for AdmissionTicket<'_> {
	fn drop(&mut self) {
		let mut guards = self.limiter.admission_guards.lock();

		// Only the map and this ticket still reference the guard.
		if Arc::strong_count(&self.guard) == 2
			&& guards.get(self.key).is_some_and(|guard| Arc::ptr_eq(guard, &self.guard))
		{
			guards.remove(self.key);
		}
	}
}

/// Builds a validated limiter, optionally namespaced by `key_prefix`.
pub fn create_rate_limiter(
	max_requests: usize,
	window: Duration,
	key_prefix: Option<&str>,
) -> Result<RateLimiter> {
	let limiter = RateLimiter::new(RateLimitPolicy::new(max_requests, window)?);

	Ok(match key_prefix {
		Some(prefix) => limiter.with_key_prefix(prefix),
		None => limiter,
	})
}
