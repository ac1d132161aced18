// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, queue::Slot};

/// Sender half that admits (or rejects) one queued request.
pub(super) type Ticket = oneshot::Sender<Result<Slot>>;

/// Request waiting for a concurrency slot.
///
/// Heap order is priority descending, then sequence ascending, so equal priorities keep their
/// arrival order.
pub(super) struct QueuedRequest {
	pub(super) id: u64,
	pub(super) priority: i32,
	pub(super) enqueued_at: Instant,
	pub(super) ticket: Ticket,
}
impl PartialEq for QueuedRequest {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other).is_eq()
	}
}
impl Eq for QueuedRequest {}
impl PartialOrd for QueuedRequest {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for QueuedRequest {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.priority.cmp(&other.priority).then_with(|| other.id.cmp(&self.id))
	}
}
impl Debug for QueuedRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("QueuedRequest")
			.field("id", &self.id)
			.field("priority", &self.priority)
			.field("enqueued_at", &self.enqueued_at)
			.finish()
	}
}
