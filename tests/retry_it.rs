// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicU32, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use tokio::time::Instant;
// self
use request_governor::{Backoff, Retry, RetryConfig, retry_with_backoff};

#[derive(Debug, PartialEq)]
enum UpstreamError {
	Unavailable(u32),
	BadRequest,
}

fn config() -> RetryConfig {
	RetryConfig::default()
		.with_max_retries(3)
		.with_initial_delay(Duration::from_millis(100))
		.with_max_delay(Duration::from_millis(250))
		.with_jitter(false)
}

#[tokio::test(start_paused = true)]
async fn delays_follow_the_capped_schedule() {
	let start = Instant::now();
	let attempt_times = Arc::new(Mutex::new(Vec::new()));
	let recorded = attempt_times.clone();
	let result: Result<(), UpstreamError> = retry_with_backoff(
		move || {
			let mut times = recorded.lock();

			times.push(start.elapsed());

			let error = UpstreamError::Unavailable(times.len() as u32);

			async move { Err(error) }
		},
		config(),
	)
	.await;

	assert_eq!(result, Err(UpstreamError::Unavailable(4)));
	assert_eq!(attempt_times.lock().as_slice(), &[
		Duration::ZERO,
		Duration::from_millis(100),
		Duration::from_millis(300),
		Duration::from_millis(550),
	]);

	let schedule: Vec<_> = Backoff::new(&config()).take(3).collect();

	assert_eq!(schedule, vec![
		Duration::from_millis(100),
		Duration::from_millis(200),
		Duration::from_millis(250)
	]);
}

#[tokio::test(start_paused = true)]
async fn predicate_stops_on_permanent_errors() {
	let attempts = Arc::new(AtomicU32::new(0));
	let hooks = Arc::new(AtomicU32::new(0));
	let counter = attempts.clone();
	let hook_counter = hooks.clone();
	let result: Result<(), UpstreamError> = Retry::new(config())
		.retry_if(|error: &UpstreamError| matches!(error, UpstreamError::Unavailable(_)))
		.on_retry(move |_, _, _| {
			hook_counter.fetch_add(1, Ordering::SeqCst);
		})
		.run(move || {
			let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;

			async move {
				if attempt < 2 {
					Err(UpstreamError::Unavailable(attempt))
				} else {
					Err(UpstreamError::BadRequest)
				}
			}
		})
		.await;

	assert_eq!(result, Err(UpstreamError::BadRequest));
	assert_eq!(attempts.load(Ordering::SeqCst), 2);
	assert_eq!(hooks.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn driver_is_reusable_across_runs() {
	let retry = Retry::new(config());

	for expected in 0..3_u32 {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = calls.clone();
		let value = retry
			.run(move || {
				let call = counter.fetch_add(1, Ordering::SeqCst);

				async move {
					if call < expected { Err(UpstreamError::Unavailable(call)) } else { Ok(call) }
				}
			})
			.await
			.expect("Run should succeed within the retry budget.");

		assert_eq!(value, expected);
		assert_eq!(calls.load(Ordering::SeqCst), expected + 1);
	}
}
