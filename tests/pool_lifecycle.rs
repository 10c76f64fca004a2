//! Lifecycle and result-delivery tests for the worker pool

use pronto_utils::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("unexpected token '{0}'")]
struct ParseError(String);

#[test]
fn test_map_preserves_input_order() {
    let pool = WorkerPool::new(4).expect("Failed to create pool");

    // Later items finish first
    let delays = vec![40u64, 30, 20, 10, 0];
    let out = pool
        .map(
            |ms: u64| {
                thread::sleep(Duration::from_millis(ms));
                Ok(ms)
            },
            delays.clone(),
        )
        .expect("map failed");

    assert_eq!(out, delays);
}

#[test]
fn test_size_jobs_run_at_the_same_time() {
    for size in [1usize, 2, 4, 8] {
        let pool = WorkerPool::new(size).expect("Failed to create pool");
        let barrier = Arc::new(Barrier::new(size));

        // Each job blocks until all `size` jobs are running at once.
        let handles: Vec<_> = (0..size)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                pool.submit(move || {
                    barrier.wait();
                    Ok(())
                })
                .expect("Failed to submit job")
            })
            .collect();

        for handle in handles {
            assert_eq!(
                handle
                    .wait_timeout(Duration::from_secs(10))
                    .expect("job failed"),
                Some(()),
                "pool of size {} did not run its jobs concurrently",
                size
            );
        }
    }
}

#[test]
fn test_imap_unordered_delivers_every_result() {
    let pool = WorkerPool::new(4).expect("Failed to create pool");
    let sources = vec!["go.obo", "uo.obo", "ms.obo", "pato.obo", "chebi.obo"];

    let mut loaded: Vec<String> = pool
        .imap_unordered(|path: &'static str| Ok(path.trim_end_matches(".obo").to_uppercase()), sources)
        .expect("imap_unordered failed")
        .collect::<Result<_>>()
        .expect("job failed");
    loaded.sort();
    assert_eq!(loaded, vec!["CHEBI", "GO", "MS", "PATO", "UO"]);
}

#[test]
fn test_map_empty_input() {
    let pool = WorkerPool::new(2).expect("Failed to create pool");
    let out: Vec<u32> = pool.map(|x: u32| Ok(x), Vec::new()).expect("map failed");
    assert!(out.is_empty());
}

#[test]
fn test_imap_yields_in_order() {
    let pool = WorkerPool::new(3).expect("Failed to create pool");
    let results = pool
        .imap(|path: &'static str| Ok(path.to_uppercase()), ["go.obo", "uo.obo", "ms.obo"])
        .expect("imap failed");

    assert_eq!(results.len(), 3);
    let out: Vec<String> = results.collect::<Result<_>>().expect("job failed");
    assert_eq!(out, vec!["GO.OBO", "UO.OBO", "MS.OBO"]);
}

#[test]
fn test_submit_after_close_is_rejected() {
    let pool = WorkerPool::new(2).expect("Failed to create pool");
    pool.close();

    match pool.submit(|| Ok(1)) {
        Err(ProntoError::PoolClosed { pool_id }) => assert_eq!(pool_id, pool.id()),
        other => panic!("expected PoolClosed, got {:?}", other.map(|_| ())),
    }
    assert!(pool.execute(|| Ok(())).is_err());
    pool.join().expect("Failed to join pool");
}

#[test]
fn test_close_and_join_are_idempotent() {
    let pool = WorkerPool::new(2).expect("Failed to create pool");
    assert_eq!(pool.state(), PoolState::Open);

    pool.close();
    pool.close();
    assert_eq!(pool.state(), PoolState::Closing);

    pool.join().expect("first join");
    pool.join().expect("second join");
    assert_eq!(pool.state(), PoolState::Joined);
}

#[test]
fn test_join_requires_close() {
    let pool = WorkerPool::new(1).expect("Failed to create pool");
    assert!(matches!(pool.join(), Err(ProntoError::StillOpen { .. })));
    assert!(pool.is_open());
}

#[test]
fn test_queued_jobs_finish_before_join_returns() {
    let pool = WorkerPool::new(1).expect("Failed to create pool");
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let counter = Arc::clone(&counter);
        pool.execute(move || {
            thread::sleep(Duration::from_millis(10));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect("Failed to submit job");
    }

    pool.close();
    pool.join().expect("Failed to join pool");
    assert_eq!(counter.load(Ordering::SeqCst), 5);
    assert_eq!(pool.total_jobs_processed(), 5);
}

#[test]
fn test_job_error_surfaces_on_wait() {
    let pool = WorkerPool::new(2).expect("Failed to create pool");
    let handle = pool
        .submit(|| -> JobResult<u32> { Err(ParseError("[Term".into()).into()) })
        .expect("Failed to submit job");

    let err = handle.wait().expect_err("job should fail");
    assert!(matches!(err, ProntoError::JobExecution { .. }));
    let source = err.job_source().expect("job error should be kept");
    let parse = source
        .downcast_ref::<ParseError>()
        .expect("job error should downcast to its own type");
    assert_eq!(parse.0, "[Term");
}

#[test]
fn test_first_failing_item_fails_map() {
    let pool = WorkerPool::new(2).expect("Failed to create pool");
    let result = pool.map(
        |n: u32| {
            if n % 2 == 1 {
                Err(format!("odd input {}", n).into())
            } else {
                Ok(n)
            }
        },
        vec![0, 2, 3, 5],
    );

    let err = result.expect_err("map should fail");
    assert!(err.to_string().contains("odd input 3"));
}

#[test]
fn test_job_panic_surfaces_on_wait() {
    let pool = WorkerPool::new(1).expect("Failed to create pool");
    let handle = pool
        .submit(|| -> JobResult<()> { panic!("malformed frame") })
        .expect("Failed to submit job");

    match handle.wait() {
        Err(ProntoError::JobPanicked { message, .. }) => assert!(message.contains("malformed frame")),
        other => panic!("expected JobPanicked, got {:?}", other),
    }

    // The worker survives the panic.
    let handle = pool.submit(|| Ok(7)).expect("Failed to submit job");
    assert_eq!(handle.wait().expect("job failed"), 7);
    assert_eq!(pool.total_jobs_panicked(), 1);
}

#[test]
fn test_wait_timeout_on_slow_job() {
    let pool = WorkerPool::new(1).expect("Failed to create pool");
    let handle = pool
        .submit(|| {
            thread::sleep(Duration::from_millis(200));
            Ok("done")
        })
        .expect("Failed to submit job");

    assert_eq!(handle.wait_timeout(Duration::from_millis(1)).expect("wait failed"), None);
    assert_eq!(
        handle.wait_timeout(Duration::from_secs(5)).expect("wait failed"),
        Some("done")
    );
}

#[test]
fn test_pool_from_json_config() {
    let config = PoolConfig::from_json(
        r#"{"size": 2, "max_queue_size": 4, "thread_name_prefix": "obo-loader"}"#,
    )
    .expect("config should parse");
    let pool = WorkerPool::with_config(config).expect("Failed to create pool");

    let name = pool
        .submit(|| Ok(thread::current().name().map(str::to_string)))
        .expect("Failed to submit job")
        .wait()
        .expect("job failed")
        .expect("workers are named");
    assert!(name.starts_with("obo-loader-"));
    assert_eq!(pool.size(), 2);
}

#[test]
fn test_zero_sized_pool_is_rejected() {
    assert!(matches!(
        WorkerPool::new(0),
        Err(ProntoError::InvalidPoolSize { size: 0 })
    ));
}
