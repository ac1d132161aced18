//! Fire a function once calls have been quiet for a while.

// self
use crate::{
	_prelude::*,
	obs::Component,
	pace::{Edges, Pacer},
};

/// Edge configuration for [`debounce`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceOptions {
	/// Invoke on the first call of a burst.
	pub leading: bool,
	/// Invoke with the latest arguments once the quiet period ends.
	pub trailing: bool,
	/// Upper bound on how long an invocation can be deferred under continuous calling.
	///
	/// Values shorter than the quiet period are honored as-is and produce a fixed cadence.
	pub max_wait: Option<Duration>,
}
impl DebounceOptions {
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

	/// Caps the total deferral.
	pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
		self.max_wait = Some(max_wait);

		self
	}
}
impl Default for DebounceOptions {
	fn default() -> Self {
		Self { leading: false, trailing: true, max_wait: None }
	}
}

/// Debounced wrapper around a function; clones share the same state.
pub struct Debounced<A, R> {
	pacer: Arc<Pacer<A, R>>,
}
impl<A, R> Debounced<A, R>
where
	A: 'static + Send,
	R: 'static + Clone + Send,
{
	/// Wraps `func`; must be called from within a Tokio runtime.
	pub fn new<F>(func: F, wait: Duration, options: DebounceOptions) -> Result<Self>
	where
		F: 'static + Send + FnMut(A) -> R,
	{
		let edges = Edges {
			wait,
			leading: options.leading,
			trailing: options.trailing,
			max_wait: options.max_wait,
		};

		Ok(Self { pacer: Pacer::new(Component::Debounce, func, edges)? })
	}

	/// Calls through the debouncer and returns the most recent invocation result, if any.
	pub fn call(&self, args: A) -> Option<R> {
		self.pacer.call(args)
	}

	/// Clears the timer and discards the pending arguments.
	pub fn cancel(&self) {
		self.pacer.cancel();
	}

	/// Runs the pending trailing invocation now; otherwise returns the last result.
	pub fn flush(&self) -> Option<R> {
		self.pacer.flush()
	}

	/// Whether a deferred invocation is scheduled.
	pub fn pending(&self) -> bool {
		self.pacer.pending()
	}

	/// Quiet period.
	pub fn wait(&self) -> Duration {
		self.pacer.edges().wait
	}

	/// Deferral cap, if any.
	pub fn max_wait(&self) -> Option<Duration> {
		self.pacer.edges().max_wait
	}
}
impl<A, R> Clone for Debounced<A, R> {
	fn clone(&self) -> Self {
		Self { pacer: self.pacer.clone() }
	}
}
impl<A, R> Debug for Debounced<A, R> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Debounced").field("pacer", &self.pacer).finish()
	}
}

/// Wraps `func` so it runs only after `wait` passes without another call.
pub fn debounce<A, R, F>(
	func: F,
	wait: Duration,
	options: DebounceOptions,
) -> Result<Debounced<A, R>>
where
	A: 'static + Send,
	R: 'static + Clone + Send,
	F: 'static + Send + FnMut(A) -> R,
{
	Debounced::new(func, wait, options)
}
