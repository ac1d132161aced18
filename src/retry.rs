//! Exponential-backoff retry driver for fallible async operations.

mod backoff;

pub use backoff::Backoff;

// self
use crate::{
	_prelude::*,
	obs::{self, Component, GovernorSpan, Outcome},
};

type RetryPredicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
type RetryHook<E> = Box<dyn Fn(u32, &E, Duration) + Send + Sync>;

/// Retry budget and delay shape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
	/// Retries after the first attempt; total attempts are `max_retries + 1`.
	pub max_retries: u32,
	/// Delay before the first retry.
	pub initial_delay: Duration,
	/// Upper bound applied before jitter.
	pub max_delay: Duration,
	/// Growth factor between consecutive delays.
	pub backoff_multiplier: f64,
	/// Scales each delay by a random factor in `[0.5, 1.5]`.
	pub jitter: bool,
}
impl RetryConfig {
	/// Overrides the retry budget.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Overrides the first delay.
	pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
		self.initial_delay = initial_delay;

		self
	}

	/// Overrides the delay cap.
	pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
		self.max_delay = max_delay;

		self
	}

	/// Overrides the growth factor.
	pub fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
		self.backoff_multiplier = backoff_multiplier;

		self
	}

	/// Enables or disables jitter.
	pub fn with_jitter(mut self, jitter: bool) -> Self {
		self.jitter = jitter;

		self
	}

	/// Rejects multipliers that are not finite or would shrink the delay.
	///
	/// The driver itself tolerates such values by saturating at `max_delay`; call this when
	/// loading configs from untrusted sources.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
			return Err(ConfigError::InvalidBackoffMultiplier {
				multiplier: self.backoff_multiplier,
			});
		}

		Ok(())
	}
}
impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: 3,
			initial_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(30),
			backoff_multiplier: 2.0,
			jitter: true,
		}
	}
}

/// Configured retry driver.
///
/// Every error is retryable unless [`Retry::retry_if`] says otherwise. The hook installed by
/// [`Retry::on_retry`] observes `(attempt, error, delay)` right before each sleep, where
/// `attempt` is the 1-based number of the attempt that just failed.
pub struct Retry<E> {
	config: RetryConfig,
	is_retryable: RetryPredicate<E>,
	on_retry: Option<RetryHook<E>>,
}
impl<E> Retry<E> {
	/// Creates a driver that retries every error.
	pub fn new(config: RetryConfig) -> Self {
		Self { config, is_retryable: Box::new(|_| true), on_retry: None }
	}

	/// Only retries errors for which `predicate` returns `true`.
	pub fn retry_if<P>(mut self, predicate: P) -> Self
	where
		P: 'static + Send + Sync + Fn(&E) -> bool,
	{
		self.is_retryable = Box::new(predicate);

		self
	}

	/// Installs a hook invoked before each backoff sleep.
	pub fn on_retry<H>(mut self, hook: H) -> Self
	where
		H: 'static + Send + Sync + Fn(u32, &E, Duration),
	{
		self.on_retry = Some(Box::new(hook));

		self
	}

	/// Settings the driver was built with.
	pub fn config(&self) -> &RetryConfig {
		&self.config
	}

	/// Runs `operation` until it succeeds, a non-retryable error occurs, or the budget is
	/// spent. The last error is returned unchanged.
	pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, E>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let span = GovernorSpan::new(Component::Retry, "run");
		let recorder = span.clone();

		span.instrument(async move {
			let mut backoff = Backoff::new(&self.config);
			let mut attempt = 0_u32;

			loop {
				attempt += 1;

				recorder.record_attempt(attempt);

				let error = match operation().await {
					Ok(output) => {
						obs::record_outcome(Component::Retry, Outcome::Success);

						return Ok(output);
					},
					Err(e) => e,
				};

				if attempt > self.config.max_retries || !(self.is_retryable)(&error) {
					obs::record_outcome(Component::Retry, Outcome::Failure);

					return Err(error);
				}

				let delay = backoff.next().unwrap_or(self.config.max_delay);
				let delay = if self.config.jitter { backoff::jittered(delay) } else { delay };

				if let Some(hook) = &self.on_retry {
					hook(attempt, &error, delay);
				}

				obs::record_outcome(Component::Retry, Outcome::Retried);
				tokio::time::sleep(delay).await;
			}
		})
		.await
	}
}
impl<E> Debug for Retry<E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Retry")
			.field("config", &self.config)
			.field("on_retry", &self.on_retry.is_some())
			.finish_non_exhaustive()
	}
}

/// Retries `operation` with `config`, treating every error as retryable.
pub async fn retry_with_backoff<T, E, F, Fut>(operation: F, config: RetryConfig) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	Retry::new(config).run(operation).await
}
