//! Request governance primitives for outbound calls: sliding-window rate limits, throttle and
//! debounce wrappers, a priority-ordered bounded-concurrency queue, and exponential-backoff
//! retries.
//!
//! The components never call each other. Callers compose them around their own async
//! operations, for example a [`RateLimiter`] gating a [`RequestQueue`] whose operations are
//! wrapped in [`retry_with_backoff`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod error;
pub mod limit;
pub mod obs;
pub mod pace;
pub mod queue;
pub mod retry;
pub mod window;

pub use error::{ConfigError, Error, Result};
pub use limit::{RateLimitDecision, RateLimitPolicy, RateLimiter, create_rate_limiter, presets};
pub use pace::{
	DebounceOptions, Debounced, ThrottleOptions, Throttled, debounce::debounce, throttle::throttle,
};
pub use queue::{QueueConfig, QueueStats, RequestQueue};
pub use retry::{Backoff, Retry, RetryConfig, retry_with_backoff};
pub use window::{RateLimitState, SlidingWindowStore};

mod _prelude {
	pub use std::{
		collections::{BinaryHeap, HashMap, VecDeque},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::{Arc, Weak},
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use tokio::time::Instant;

	pub use crate::error::{ConfigError, Error, Result};
}

#[cfg(test)] use {color_eyre as _, serde_json as _};
