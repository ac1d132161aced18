// crates.io
use rand::Rng;
// self
use crate::{_prelude::*, retry::RetryConfig};

/// Deterministic retry delay schedule, before jitter.
///
/// Yields `min(current, max_delay)` and then multiplies `current` by the configured
/// multiplier. The iterator never ends; products that are not finite or do not fit in a
/// [`Duration`] saturate at `max_delay`.
#[derive(Clone, Debug)]
pub struct Backoff {
	current: Duration,
	max_delay: Duration,
	multiplier: f64,
}
impl Backoff {
	/// Starts a schedule at `config.initial_delay`.
	pub fn new(config: &RetryConfig) -> Self {
		Self {
			current: config.initial_delay,
			max_delay: config.max_delay,
			multiplier: config.backoff_multiplier,
		}
	}
}
impl Iterator for Backoff {
	type Item = Duration;

	fn next(&mut self) -> Option<Self::Item> {
		let delay = self.current.min(self.max_delay);

		self.current = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
			.map_or(self.max_delay, |next| next.min(self.max_delay));

		Some(delay)
	}
}

/// Scales `delay` by a uniform random factor in `[0.5, 1.5]`, saturating at [`Duration::MAX`].
pub(crate) fn jittered(delay: Duration) -> Duration {
	let factor: f64 = rand::rng().random_range(0.5..=1.5);

	Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config(initial_ms: u64, multiplier: f64, max_ms: u64) -> RetryConfig {
		RetryConfig::default()
			.with_initial_delay(Duration::from_millis(initial_ms))
			.with_backoff_multiplier(multiplier)
			.with_max_delay(Duration::from_millis(max_ms))
	}

	#[test]
	fn schedule_grows_geometrically_until_the_cap() {
		let delays: Vec<u64> =
			Backoff::new(&config(100, 2.0, 1_000)).take(6).map(|d| d.as_millis() as u64).collect();

		assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
	}

	#[test]
	fn initial_delay_above_the_cap_is_clamped() {
		let first = Backoff::new(&config(5_000, 2.0, 1_000)).next();

		assert_eq!(first, Some(Duration::from_secs(1)));
	}

	#[test]
	fn non_finite_products_saturate() {
		let mut backoff = Backoff::new(&config(100, f64::INFINITY, 1_000));

		assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
		assert_eq!(backoff.next(), Some(Duration::from_millis(1_000)));

		let mut backoff = Backoff::new(&config(100, f64::NAN, 1_000));

		backoff.next();

		assert_eq!(backoff.next(), Some(Duration::from_millis(1_000)));
	}

	#[test]
	fn jitter_saturates_instead_of_overflowing() {
		for _ in 0..500 {
			assert!(jittered(Duration::MAX) >= Duration::MAX / 3);
		}
	}

	#[test]
	fn jitter_stays_within_half_to_one_and_a_half() {
		let base = Duration::from_millis(1_000);

		for _ in 0..500 {
			let delay = jittered(base);

			assert!(delay >= Duration::from_millis(500), "{delay:?} below the jitter floor");
			assert!(delay <= Duration::from_millis(1_500), "{delay:?} above the jitter ceiling");
		}
	}
}
