//! Process-wide limiters for the common call sites.
//!
//! Each limiter is an independent, lazily created instance with its own store and a distinct
//! key prefix, so checking one never consumes quota from another.

// std
use std::sync::LazyLock;
// self
use crate::limit::{RateLimitPolicy, RateLimiter};

static API: LazyLock<RateLimiter> =
	LazyLock::new(|| RateLimiter::new(RateLimitPolicy::API).with_key_prefix("api"));
static SEARCH: LazyLock<RateLimiter> =
	LazyLock::new(|| RateLimiter::new(RateLimitPolicy::SEARCH).with_key_prefix("search"));
static FORM_SUBMISSION: LazyLock<RateLimiter> = LazyLock::new(|| {
	RateLimiter::new(RateLimitPolicy::FORM_SUBMISSION).with_key_prefix("form")
});
static AUTHENTICATION: LazyLock<RateLimiter> =
	LazyLock::new(|| RateLimiter::new(RateLimitPolicy::AUTHENTICATION).with_key_prefix("auth"));

/// Limiter for general API calls ([`RateLimitPolicy::API`]).
pub fn api() -> &'static RateLimiter {
	&API
}

/// Limiter for search requests ([`RateLimitPolicy::SEARCH`]).
pub fn search() -> &'static RateLimiter {
	&SEARCH
}

/// Limiter for form submissions ([`RateLimitPolicy::FORM_SUBMISSION`]).
pub fn form_submission() -> &'static RateLimiter {
	&FORM_SUBMISSION
}

/// Limiter for authentication attempts ([`RateLimitPolicy::AUTHENTICATION`]).
pub fn authentication() -> &'static RateLimiter {
	&AUTHENTICATION
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn presets_are_distinct_policies() {
		let policies = [
			RateLimitPolicy::API,
			RateLimitPolicy::SEARCH,
			RateLimitPolicy::FORM_SUBMISSION,
			RateLimitPolicy::AUTHENTICATION,
		];

		for (idx, policy) in policies.iter().enumerate() {
			for other in &policies[idx + 1..] {
				assert_ne!(policy, other);
			}
		}
	}

	#[test]
	fn preset_limiters_do_not_share_quota() {
		let key = "presets-test-user";

		for _ in 0..RateLimitPolicy::AUTHENTICATION.max_requests() {
			assert!(authentication().check(key).allowed);
		}

		assert!(!authentication().check(key).allowed);
		assert!(form_submission().check(key).allowed);
		assert_eq!(search().state(key).remaining, RateLimitPolicy::SEARCH.max_requests());
		assert_eq!(api().key_prefix(), Some("api"));

		authentication().reset(key);
		form_submission().reset(key);
	}
}
