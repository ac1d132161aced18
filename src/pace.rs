//! Timer-driven call pacing shared by [`throttle`] and [`debounce`].
//!
//! Both wrappers run the same state machine over one wrapped function: a single armed timer,
//! the instants of the last call and the last real invocation, and the latest pending
//! arguments. Arguments are overwritten on every call, never queued, so only the most recent
//! call can reach a trailing edge. A throttle is the machine with `max_wait == wait`.
//!
//! Timers run on the Tokio runtime captured at construction and hold only a weak reference
//! to the machine: dropping the last wrapper handle discards any pending invocation.

pub mod debounce;
pub mod throttle;

pub use debounce::{DebounceOptions, Debounced};
pub use throttle::{ThrottleOptions, Throttled};

// crates.io
use parking_lot::MutexGuard;
use tokio::{runtime::Handle, task::JoinHandle};
// self
use crate::{
	_prelude::*,
	obs::{self, Component, Outcome},
};

type PacedFn<A, R> = Box<dyn FnMut(A) -> R + Send>;

/// Edge configuration of one pacer.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Edges {
	pub(crate) wait: Duration,
	pub(crate) leading: bool,
	pub(crate) trailing: bool,
	pub(crate) max_wait: Option<Duration>,
}

struct Timer {
	epoch: u64,
	handle: JoinHandle<()>,
}

struct PacerState<A, R> {
	pending_args: Option<A>,
	last_call: Option<Instant>,
	last_invoke: Option<Instant>,
	timer: Option<Timer>,
	epoch: u64,
	last_result: Option<R>,
}

pub(crate) struct Pacer<A, R> {
	component: Component,
	edges: Edges,
	runtime: Handle,
	func: Mutex<PacedFn<A, R>>,
	state: Mutex<PacerState<A, R>>,
}
impl<A, R> Pacer<A, R>
where
	A: 'static + Send,
	R: 'static + Clone + Send,
{
	pub(crate) fn new<F>(component: Component, func: F, edges: Edges) -> Result<Arc<Self>>
	where
		F: 'static + Send + FnMut(A) -> R,
	{
		let runtime = Handle::try_current()
			.map_err(|_| ConfigError::MissingRuntime { component: component.as_str() })?;

		Ok(Arc::new(Self {
			component,
			edges,
			runtime,
			func: Mutex::new(Box::new(func)),
			state: Mutex::new(PacerState {
				pending_args: None,
				last_call: None,
				last_invoke: None,
				timer: None,
				epoch: 0,
				last_result: None,
			}),
		}))
	}

	pub(crate) fn edges(&self) -> Edges {
		self.edges
	}

	pub(crate) fn call(self: &Arc<Self>, args: A) -> Option<R> {
		let now = Instant::now();
		let mut state = self.state.lock();
		let is_invoking = self.should_invoke(&state, now);

		state.pending_args = Some(args);
		state.last_call = Some(now);

		if is_invoking {
			if state.timer.is_none() {
				return self.leading_edge(state, now);
			}
			if self.edges.max_wait.is_some() {
				self.start_timer(&mut state, self.arm_delay());

				return self.invoke(state, now);
			}
		}
		if state.timer.is_none() {
			self.start_timer(&mut state, self.arm_delay());
		}

		state.last_result.clone()
	}

	pub(crate) fn cancel(&self) {
		let mut state = self.state.lock();

		if let Some(timer) = state.timer.take() {
			timer.handle.abort();
		}

		let discarded = state.pending_args.take().is_some();

		state.last_call = None;
		state.last_invoke = None;

		drop(state);

		if discarded {
			obs::record_outcome(self.component, Outcome::Cancelled);
		}
	}

	pub(crate) fn flush(&self) -> Option<R> {
		let state = self.state.lock();

		if state.timer.is_none() {
			return state.last_result.clone();
		}

		self.trailing_edge(state, Instant::now())
	}

	pub(crate) fn pending(&self) -> bool {
		self.state.lock().timer.is_some()
	}

	// A deferred call waits at most `max_wait`, even when that is shorter than `wait`.
	fn arm_delay(&self) -> Duration {
		self.edges.max_wait.map_or(self.edges.wait, |max_wait| self.edges.wait.min(max_wait))
	}

	fn should_invoke(&self, state: &PacerState<A, R>, now: Instant) -> bool {
		let Some(last_call) = state.last_call else {
			return true;
		};

		now.saturating_duration_since(last_call) >= self.edges.wait
			|| self
				.edges
				.max_wait
				.is_some_and(|max_wait| Self::since(state.last_invoke, now) >= max_wait)
	}

	fn remaining_wait(&self, state: &PacerState<A, R>, now: Instant) -> Duration {
		let waiting = self.edges.wait.saturating_sub(Self::since(state.last_call, now));

		match self.edges.max_wait {
			Some(max_wait) =>
				waiting.min(max_wait.saturating_sub(Self::since(state.last_invoke, now))),
			None => waiting,
		}
	}

	fn since(instant: Option<Instant>, now: Instant) -> Duration {
		instant.map_or(Duration::MAX, |instant| now.saturating_duration_since(instant))
	}

	fn leading_edge(
		self: &Arc<Self>,
		mut state: MutexGuard<'_, PacerState<A, R>>,
		now: Instant,
	) -> Option<R> {
		state.last_invoke = Some(now);

		self.start_timer(&mut state, self.arm_delay());

		if self.edges.leading { self.invoke(state, now) } else { state.last_result.clone() }
	}

	fn trailing_edge(
		&self,
		mut state: MutexGuard<'_, PacerState<A, R>>,
		now: Instant,
	) -> Option<R> {
		if let Some(timer) = state.timer.take() {
			timer.handle.abort();
		}
		if self.edges.trailing && state.pending_args.is_some() {
			return self.invoke(state, now);
		}

		state.pending_args = None;

		state.last_result.clone()
	}

	// Runs the function outside the state lock; the function must not re-enter its own wrapper.
	fn invoke(&self, mut state: MutexGuard<'_, PacerState<A, R>>, now: Instant) -> Option<R> {
		state.last_invoke = Some(now);

		let Some(args) = state.pending_args.take() else {
			return state.last_result.clone();
		};

		drop(state);

		let result = {
			let mut func = self.func.lock();

			(*func)(args)
		};

		self.state.lock().last_result = Some(result.clone());

		obs::record_outcome(self.component, Outcome::Invoked);

		Some(result)
	}

	fn start_timer(self: &Arc<Self>, state: &mut PacerState<A, R>, delay: Duration) {
		state.epoch = state.epoch.wrapping_add(1);

		let epoch = state.epoch;
		let deadline = Instant::now() + delay;
		let pacer = Arc::downgrade(self);
		let handle = self.runtime.spawn(async move {
			tokio::time::sleep_until(deadline).await;

			if let Some(pacer) = pacer.upgrade() {
				pacer.timer_expired(epoch);
			}
		});

		if let Some(previous) = state.timer.replace(Timer { epoch, handle }) {
			previous.handle.abort();
		}
	}

	fn timer_expired(self: &Arc<Self>, epoch: u64) {
		let now = Instant::now();
		let mut state = self.state.lock();

		if state.timer.as_ref().is_none_or(|timer| timer.epoch != epoch) {
			return;
		}
		if self.should_invoke(&state, now) {
			self.trailing_edge(state, now);

			return;
		}

		let remaining = self.remaining_wait(&state, now);

		self.start_timer(&mut state, remaining);
	}
}
impl<A, R> Drop for Pacer<A, R> {
	fn drop(&mut self) {
		if let Some(timer) = self.state.get_mut().timer.take() {
			timer.handle.abort();
		}
	}
}
impl<A, R> Debug for Pacer<A, R> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pacer")
			.field("component", &self.component)
			.field("edges", &self.edges)
			.field("pending", &self.state.lock().timer.is_some())
			.finish()
	}
}
