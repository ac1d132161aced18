//! Toolkit-level error types shared by the limiter, pacers, queue, and retry driver.
//!
//! A denied rate-limit check is not an error; it is reported through
//! [`RateLimitDecision`](crate::limit::RateLimitDecision). Failures of caller-supplied
//! operations are never wrapped either: they flow back to the caller verbatim.

// self
use crate::_prelude::*;

/// Toolkit-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The request was removed by [`RequestQueue::clear`](crate::queue::RequestQueue::clear)
	/// before it was dispatched.
	#[error("Request was cleared from the queue before it was dispatched.")]
	QueueCleared,
	/// Every handle to the queue was dropped before the request was dispatched.
	#[error("Request queue was dropped before the request was dispatched.")]
	Abandoned,
}

/// Configuration and validation failures raised while building toolkit components.
#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum ConfigError {
	/// Rate-limit policies must admit at least one request per window.
	#[error("Rate limit policy must allow at least one request per window.")]
	ZeroMaxRequests,
	/// Rate-limit windows must have a positive duration.
	#[error("Rate limit window must be longer than zero.")]
	ZeroWindow,
	/// Queues need at least one concurrent slot to make progress.
	#[error("Request queue must allow at least one concurrent operation.")]
	ZeroConcurrency,
	/// Backoff multipliers must be finite and not shrink the delay.
	#[error("Backoff multiplier must be a finite value of at least 1.0, got {multiplier}.")]
	InvalidBackoffMultiplier {
		/// Rejected multiplier.
		multiplier: f64,
	},
	/// Timer-driven components were constructed outside an async runtime.
	#[error("{component} requires a Tokio runtime to drive its timers.")]
	MissingRuntime {
		/// Component label.
		component: &'static str,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn config_error_converts_transparently() {
		let config_error = ConfigError::MissingRuntime { component: "Debounce" };
		let error: Error = config_error.clone().into();

		assert!(matches!(error, Error::Config(_)));
		assert_eq!(error.to_string(), config_error.to_string());
		assert!(StdError::source(&error).is_none());
	}

	#[test]
	fn backoff_error_reports_the_multiplier() {
		let error = ConfigError::InvalidBackoffMultiplier { multiplier: 0.5 };

		assert_eq!(
			error.to_string(),
			"Backoff multiplier must be a finite value of at least 1.0, got 0.5."
		);
	}
}
