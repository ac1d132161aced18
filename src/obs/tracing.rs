// self
use crate::{_prelude::*, obs::Component};

/// Future returned by [`GovernorSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`GovernorSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// `request_governor.op` span around one governed operation.
///
/// Besides `component` and `stage`, the span carries governor-specific fields that start
/// empty and are filled in as the operation progresses:
///
/// - `priority`: queue priority the request was submitted with,
/// - `queued_ms`: time a request waited before dispatch,
/// - `attempt`: 1-based retry attempt currently running.
#[derive(Clone, Debug)]
pub struct GovernorSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl GovernorSpan {
	/// Opens a span for `component` at `stage`.
	pub fn new(component: Component, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::debug_span!(
				"request_governor.op",
				component = component.as_str(),
				stage,
				priority = tracing::field::Empty,
				queued_ms = tracing::field::Empty,
				attempt = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (component, stage);

			Self {}
		}
	}

	/// Tags the span with the queue priority.
	pub fn with_priority(self, priority: i32) -> Self {
		#[cfg(feature = "tracing")]
		self.span.record("priority", priority);
		#[cfg(not(feature = "tracing"))]
		let _ = priority;

		self
	}

	/// Records how long a request sat in the queue.
	pub fn record_queued(&self, waited: Duration) {
		#[cfg(feature = "tracing")]
		self.span.record("queued_ms", u64::try_from(waited.as_millis()).unwrap_or(u64::MAX));
		#[cfg(not(feature = "tracing"))]
		let _ = waited;
	}

	/// Records the attempt about to run.
	pub fn record_attempt(&self, attempt: u32) {
		#[cfg(feature = "tracing")]
		self.span.record("attempt", attempt);
		#[cfg(not(feature = "tracing"))]
		let _ = attempt;
	}

	/// Runs `fut` inside the span without holding an entered guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
