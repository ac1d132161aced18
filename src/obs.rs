//! Optional observability helpers for governed calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit spans named `request_governor.op` with the `component`
//!   and `stage` fields, plus a debug event for every recorded outcome.
//! - Enable `metrics` to increment the `request_governor_events_total` counter for every
//!   outcome, labeled by `component` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Toolkit components observed by the helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
	/// Sliding-window rate limiter.
	RateLimiter,
	/// Throttle wrapper.
	Throttle,
	/// Debounce wrapper.
	Debounce,
	/// Priority request queue.
	Queue,
	/// Exponential-backoff retry driver.
	Retry,
}
impl Component {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Component::RateLimiter => "rate_limiter",
			Component::Throttle => "throttle",
			Component::Debounce => "debounce",
			Component::Queue => "queue",
			Component::Retry => "retry",
		}
	}
}
impl Display for Component {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded by the components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// A rate-limit check admitted the request.
	Allowed,
	/// A rate-limit check denied the request.
	Limited,
	/// A wrapped function ran.
	Invoked,
	/// Pending work was discarded by a cancel or clear.
	Cancelled,
	/// A queued operation started running.
	Dispatched,
	/// A retry was scheduled after a failed attempt.
	Retried,
	/// The governed operation succeeded.
	Success,
	/// The governed operation failed and the failure was returned to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Allowed => "allowed",
			Outcome::Limited => "limited",
			Outcome::Invoked => "invoked",
			Outcome::Cancelled => "cancelled",
			Outcome::Dispatched => "dispatched",
			Outcome::Retried => "retried",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
