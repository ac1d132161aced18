//! Fire a function at most once per interval.

// self
use crate::{
	_prelude::*,
	obs::Component,
	pace::{Edges, Pacer},
};

/// Edge configuration for [`throttle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleOptions {
	/// Invoke on the first call of an idle period.
	pub leading: bool,
	/// Invoke with the latest arguments once the interval ends.
	pub trailing: bool,
}
impl ThrottleOptions {
	/// Overrides the leading-edge flag.
	pub fn with_leading(mut self, leading: bool) -> Self {
		self.leading = leading;

		self
	}

	/// Overrides the trailing-edge flag.
	pub fn with_trailing(mut self, trailing: bool) -> Self {
		self.trailing = trailing;

		self
	}
}
impl Default for ThrottleOptions {
	fn default() -> Self {
		Self { leading: true, trailing: true }
	}
}

/// Throttled wrapper around a function; clones share the same state.
///
/// A call is eligible to invoke when it is the first call ever, when `wait` has passed since
/// the previous call, or when `wait` has passed since the last real invocation. Calls made
/// inside the interval only replace the pending arguments.
pub struct Throttled<A, R> {
	pacer: Arc<Pacer<A, R>>,
}
impl<A, R> Throttled<A, R>
where
	A: 'static + Send,
	R: 'static + Clone + Send,
{
	/// Wraps `func`; must be called from within a Tokio runtime.
	pub fn new<F>(func: F, wait: Duration, options: ThrottleOptions) -> Result<Self>
	where
		F: 'static + Send + FnMut(A) -> R,
	{
		let edges = Edges {
			wait,
			leading: options.leading,
			trailing: options.trailing,
			max_wait: Some(wait),
		};

		Ok(Self { pacer: Pacer::new(Component::Throttle, func, edges)? })
	}

	/// Calls through the throttle and returns the most recent invocation result, if any.
	pub fn call(&self, args: A) -> Option<R> {
		self.pacer.call(args)
	}

	/// Drops the pending call and timer without invoking.
	pub fn cancel(&self) {
		self.pacer.cancel();
	}

	/// Runs a pending trailing call now; otherwise returns the last result.
	pub fn flush(&self) -> Option<R> {
		self.pacer.flush()
	}

	/// Whether an interval timer is armed.
	pub fn pending(&self) -> bool {
		self.pacer.pending()
	}

	/// Throttle interval.
	pub fn wait(&self) -> Duration {
		self.pacer.edges().wait
	}
}
impl<A, R> Clone for Throttled<A, R> {
	fn clone(&self) -> Self {
		Self { pacer: self.pacer.clone() }
	}
}
impl<A, R> Debug for Throttled<A, R> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Throttled").field("pacer", &self.pacer).finish()
	}
}

/// Wraps `func` so it runs at most once per `wait`.
pub fn throttle<A, R, F>(
	func: F,
	wait: Duration,
	options: ThrottleOptions,
) -> Result<Throttled<A, R>>
where
	A: 'static + Send,
	R: 'static + Clone + Send,
	F: 'static + Send + FnMut(A) -> R,
{
	Throttled::new(func, wait, options)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn recorder() -> (Arc<Mutex<Vec<(u32, Instant)>>>, impl FnMut(u32) -> u32 + Send + 'static) {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let sink = calls.clone();

		(calls, move |value| {
			sink.lock().push((value, Instant::now()));

			value
		})
	}

	async fn advance(ms: u64) {
		tokio::time::sleep(Duration::from_millis(ms)).await;
	}

	#[tokio::test(start_paused = true)]
	async fn burst_fires_leading_and_trailing_once_each() {
		let (calls, func) = recorder();
		let throttled = throttle(func, Duration::from_millis(100), ThrottleOptions::default())
			.expect("Throttle fixture should build.");
		let start = Instant::now();

		for value in 1..=5 {
			throttled.call(value);
			advance(2).await;
		}

		assert_eq!(calls.lock().len(), 1);

		advance(150).await;

		let calls = calls.lock();

		assert_eq!(calls.len(), 2);
		assert_eq!(calls[0], (1, start));
		assert_eq!(calls[1], (5, start + Duration::from_millis(100)));
	}

	#[tokio::test(start_paused = true)]
	async fn trailing_only_waits_for_the_interval() {
		let (calls, func) = recorder();
		let throttled =
			throttle(func, Duration::from_millis(100), ThrottleOptions::default().with_leading(false))
				.expect("Throttle fixture should build.");
		let start = Instant::now();

		assert_eq!(throttled.call(1), None);
		assert!(throttled.pending());
		assert!(calls.lock().is_empty());

		advance(120).await;

		assert_eq!(calls.lock().as_slice(), &[(1, start + Duration::from_millis(100))]);
		assert!(!throttled.pending());
	}

	#[tokio::test(start_paused = true)]
	async fn leading_only_drops_calls_inside_the_window() {
		let (calls, func) = recorder();
		let throttled =
			throttle(func, Duration::from_millis(100), ThrottleOptions::default().with_trailing(false))
				.expect("Throttle fixture should build.");

		assert_eq!(throttled.call(1), Some(1));

		advance(50).await;

		assert_eq!(throttled.call(2), Some(1));

		advance(70).await;

		assert_eq!(throttled.call(3), Some(3));

		advance(200).await;

		let values: Vec<u32> = calls.lock().iter().map(|(value, _)| *value).collect();

		assert_eq!(values, vec![1, 3]);
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_discards_and_flush_invokes_pending() {
		let (calls, func) = recorder();
		let throttled = throttle(func, Duration::from_millis(100), ThrottleOptions::default())
			.expect("Throttle fixture should build.");

		throttled.call(1);
		throttled.call(2);
		throttled.cancel();

		assert!(!throttled.pending());

		advance(200).await;

		assert_eq!(calls.lock().len(), 1);

		throttled.call(3);
		throttled.call(4);

		assert_eq!(throttled.flush(), Some(4));
		assert!(!throttled.pending());
		assert_eq!(throttled.flush(), Some(4));

		let values: Vec<u32> = calls.lock().iter().map(|(value, _)| *value).collect();

		assert_eq!(values, vec![1, 3, 4]);
	}

	#[test]
	fn construction_outside_a_runtime_fails() {
		let result = throttle(|value: u32| value, Duration::from_millis(10), Default::default());

		assert!(matches!(
			result,
			Err(Error::Config(ConfigError::MissingRuntime { component: "throttle" }))
		));
	}
}
