//! Priority-ordered, bounded-concurrency request queue.
//!
//! [`RequestQueue::add`] enqueues eagerly and returns a future that resolves once the
//! operation has been dispatched and has settled. The operation runs inside that future, so
//! its output type flows through unchanged and a failing operation only affects its own
//! caller. A dispatched request holds a [`Slot`]; dropping the slot (on completion, on panic,
//! or when the caller drops the future) frees capacity and re-runs dispatch.
//!
//! With a non-zero `request_delay`, successive dispatches are spaced at least that far apart
//! even when capacity is free; the next dispatch is scheduled on the runtime captured at
//! construction.

mod entry;

// crates.io
use tokio::{runtime::Handle, sync::oneshot};
// self
use crate::{
	_prelude::*,
	obs::{self, Component, GovernorSpan, Outcome},
};
use entry::{QueuedRequest, Ticket};

/// Boxed future returned by [`RequestQueue::add`].
pub type QueuedFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Capacity and spacing settings for a [`RequestQueue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
	/// Operations allowed to run at once.
	pub max_concurrent: usize,
	/// Minimum gap between two dispatch starts.
	pub request_delay: Duration,
}
impl QueueConfig {
	/// Overrides the concurrency cap.
	pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
		self.max_concurrent = max_concurrent;

		self
	}

	/// Overrides the dispatch spacing.
	pub fn with_request_delay(mut self, request_delay: Duration) -> Self {
		self.request_delay = request_delay;

		self
	}
}
impl Default for QueueConfig {
	fn default() -> Self {
		Self { max_concurrent: 1, request_delay: Duration::ZERO }
	}
}

/// Point-in-time queue counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
	/// Requests waiting for dispatch.
	pub queued: usize,
	/// Dispatched requests that have not settled.
	pub processing: usize,
}

/// Scheduler for async operations; clones share the same queue.
#[derive(Clone)]
pub struct RequestQueue {
	inner: Arc<QueueInner>,
}
impl RequestQueue {
	/// Creates a queue after validating `config`.
	///
	/// A non-zero `request_delay` needs a Tokio runtime to schedule spaced dispatches.
	pub fn new(config: QueueConfig) -> Result<Self> {
		if config.max_concurrent == 0 {
			return Err(ConfigError::ZeroConcurrency.into());
		}

		let runtime = if config.request_delay.is_zero() {
			None
		} else {
			Some(Handle::try_current().map_err(|_| ConfigError::MissingRuntime {
				component: Component::Queue.as_str(),
			})?)
		};

		Ok(Self {
			inner: Arc::new(QueueInner {
				config,
				runtime,
				state: Mutex::new(QueueState {
					pending: BinaryHeap::new(),
					processing: 0,
					next_id: 0,
					last_dispatch: None,
					wake_armed: false,
				}),
			}),
		})
	}

	/// Settings the queue was built with.
	pub fn config(&self) -> QueueConfig {
		self.inner.config
	}

	/// Enqueues `operation` with priority `0`.
	pub fn add<F, Fut, T>(&self, operation: F) -> QueuedFuture<T>
	where
		F: 'static + Send + FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = T>,
		T: 'static + Send,
	{
		self.add_with_priority(operation, 0)
	}

	/// Enqueues `operation`; higher priorities run first, equal priorities in arrival order.
	///
	/// The returned future resolves to the operation's output, or to
	/// [`Error::QueueCleared`] if [`RequestQueue::clear`] ran before dispatch.
	pub fn add_with_priority<F, Fut, T>(&self, operation: F, priority: i32) -> QueuedFuture<T>
	where
		F: 'static + Send + FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = T>,
		T: 'static + Send,
	{
		let (ticket, admission) = oneshot::channel();

		self.inner.enqueue(priority, ticket);
		self.inner.dispatch();

		let enqueued_at = Instant::now();
		let span =
			GovernorSpan::new(Component::Queue, "queued_operation").with_priority(priority);
		let recorder = span.clone();

		Box::pin(span.instrument(async move {
			let slot = match admission.await {
				Ok(admitted) => admitted?,
				Err(_) => return Err(Error::Abandoned),
			};

			recorder.record_queued(enqueued_at.elapsed());

			let output = operation().await;

			drop(slot);

			Ok(output)
		}))
	}

	/// Current queued/processing counters.
	///
	/// Requests whose caller already dropped the future are not counted as queued.
	pub fn stats(&self) -> QueueStats {
		let state = self.inner.state.lock();
		let queued = state.pending.iter().filter(|request| !request.ticket.is_closed()).count();

		QueueStats { queued, processing: state.processing }
	}

	/// Rejects every request that has not been dispatched yet; running operations continue.
	///
	/// Returns how many requests were rejected.
	pub fn clear(&self) -> usize {
		let cleared: Vec<QueuedRequest> = self.inner.state.lock().pending.drain().collect();
		let count = cleared.len();

		for request in cleared {
			let _ = request.ticket.send(Err(Error::QueueCleared));
		}

		if count > 0 {
			obs::record_outcome(Component::Queue, Outcome::Cancelled);
		}

		count
	}
}
impl Debug for RequestQueue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestQueue")
			.field("config", &self.inner.config)
			.field("stats", &self.stats())
			.finish()
	}
}

struct QueueInner {
	config: QueueConfig,
	runtime: Option<Handle>,
	state: Mutex<QueueState>,
}
impl QueueInner {
	fn enqueue(&self, priority: i32, ticket: Ticket) {
		let mut state = self.state.lock();
		let id = state.next_id;

		state.next_id += 1;
		state.pending.push(QueuedRequest { id, priority, enqueued_at: Instant::now(), ticket });
	}

	fn dispatch(self: &Arc<Self>) {
		loop {
			let mut state = self.state.lock();

			if state.processing >= self.config.max_concurrent || state.pending.is_empty() {
				return;
			}

			let now = Instant::now();

			if let Some(at) = state.next_dispatch_at(self.config.request_delay) {
				if at > now {
					self.arm_wake(&mut state, at);

					return;
				}
			}

			let Some(request) = state.pending.pop() else {
				return;
			};

			// The caller dropped its future while waiting.
			if request.ticket.is_closed() {
				continue;
			}

			state.processing += 1;
			state.last_dispatch = Some(now);

			drop(state);

			obs::record_outcome(Component::Queue, Outcome::Dispatched);

			// A failed send drops the slot here, which releases it again.
			let _ = request.ticket.send(Ok(Slot { queue: self.clone() }));
		}
	}

	fn arm_wake(self: &Arc<Self>, state: &mut QueueState, at: Instant) {
		let Some(runtime) = &self.runtime else {
			return;
		};

		if state.wake_armed {
			return;
		}

		state.wake_armed = true;

		let queue = Arc::downgrade(self);

		runtime.spawn(async move {
			tokio::time::sleep_until(at).await;

			if let Some(queue) = queue.upgrade() {
				queue.state.lock().wake_armed = false;
				queue.dispatch();
			}
		});
	}

	fn release(self: &Arc<Self>) {
		{
			let mut state = self.state.lock();

			state.processing = state.processing.saturating_sub(1);
		}

		self.dispatch();
	}
}

struct QueueState {
	pending: BinaryHeap<QueuedRequest>,
	processing: usize,
	next_id: u64,
	last_dispatch: Option<Instant>,
	wake_armed: bool,
}
impl QueueState {
	fn next_dispatch_at(&self, request_delay: Duration) -> Option<Instant> {
		if request_delay.is_zero() {
			return None;
		}

		self.last_dispatch.map(|last| last + request_delay)
	}
}

/// Concurrency slot held by a dispatched request until it settles.
pub(crate) struct Slot {
	queue: Arc<QueueInner>,
}
impl Drop for Slot {
	fn drop(&mut self) {
		self.queue.release();
	}
}
