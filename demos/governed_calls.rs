//! Composes a rate limiter, a request queue, and the retry driver around a flaky fake
//! upstream call, then debounces a burst of search keystrokes.

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicU32, Ordering},
	},
	time::Duration,
};
// crates.io
use color_eyre::Result;
// self
use request_governor::{
	DebounceOptions, QueueConfig, RequestQueue, RetryConfig, create_rate_limiter, debounce,
	retry_with_backoff,
};

async fn flaky_upstream(calls: Arc<AtomicU32>, id: u32) -> Result<String, String> {
	let attempt = calls.fetch_add(1, Ordering::SeqCst);

	tokio::time::sleep(Duration::from_millis(20)).await;

	if attempt % 3 == 0 {
		Err(format!("upstream hiccup on request {id}"))
	} else {
		Ok(format!("payload {id}"))
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let limiter = Arc::new(create_rate_limiter(5, Duration::from_secs(1), Some("demo"))?);
	let queue = RequestQueue::new(
		QueueConfig::default()
			.with_max_concurrent(2)
			.with_request_delay(Duration::from_millis(25)),
	)?;
	let retry = RetryConfig::default().with_initial_delay(Duration::from_millis(50));
	let upstream_calls = Arc::new(AtomicU32::new(0));
	let mut handles = Vec::new();

	for id in 0..8_u32 {
		let limiter = limiter.clone();
		let upstream_calls = upstream_calls.clone();
		let priority = if id == 7 { 10 } else { 0 };
		let operation = queue.add_with_priority(
			move || async move {
				let state = limiter.acquire("upstream").await;

				println!("Request {id} admitted with {} slot(s) left.", state.remaining);

				retry_with_backoff(|| flaky_upstream(upstream_calls.clone(), id), retry).await
			},
			priority,
		);

		handles.push(tokio::spawn(operation));
	}

	for handle in handles {
		match handle.await?? {
			Ok(payload) => println!("Received {payload}."),
			Err(error) => println!("Gave up: {error}."),
		}
	}

	println!("Upstream saw {} call(s).", upstream_calls.load(Ordering::SeqCst));

	let search = debounce(
		|query: String| {
			println!("Searching for {query:?}.");

			query.len()
		},
		Duration::from_millis(150),
		DebounceOptions::default(),
	)?;

	for prefix in ["r", "ru", "rus", "rust"] {
		search.call(prefix.to_owned());
		tokio::time::sleep(Duration::from_millis(40)).await;
	}

	tokio::time::sleep(Duration::from_millis(200)).await;

	println!("Last search matched a query of length {:?}.", search.flush());

	Ok(())
}
