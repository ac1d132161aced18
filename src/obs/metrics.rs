// self
use crate::obs::{Component, Outcome};

/// Records an outcome via the global metrics recorder and the tracing subscriber (when
/// enabled).
pub fn record_outcome(component: Component, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"request_governor_events_total",
			"component" => component.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(component = component.as_str(), outcome = outcome.as_str(), "governor event");
	}

	#[cfg(not(any(feature = "metrics", feature = "tracing")))]
	{
		let _ = (component, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_outcome_is_safe_without_a_recorder() {
		record_outcome(Component::Queue, Outcome::Cancelled);
		record_outcome(Component::RateLimiter, Outcome::Limited);
	}
}
