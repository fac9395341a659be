use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use workpool::process::{canonical, SyntheticDelay};
use workpool::{
    submit, BatchStatus, Cancellation, LaunchPolicy, Outcome, PoolConfig, PoolError, Result,
    Stats, TaskError, WorkerPool,
};

const POLICIES: [LaunchPolicy; 3] = [
    LaunchPolicy::Bounded,
    LaunchPolicy::Unbounded,
    LaunchPolicy::WorkStealing,
];

fn instant(payload: &str) -> std::result::Result<Stats, String> {
    Ok(canonical(payload))
}

/// Sleeps 10ms per character, then reports canonical stats.
fn sleepy(payload: &str) -> std::result::Result<Stats, String> {
    thread::sleep(Duration::from_millis(10 * payload.len() as u64));
    Ok(canonical(payload))
}

fn payloads(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("payload number {i}")).collect()
}

#[test]
fn every_task_reports_exactly_once() -> Result<()> {
    for policy in POLICIES {
        for n in [0, 1, 7, 32] {
            for max_concurrency in [1, 3, 64] {
                let config = PoolConfig::new(max_concurrency).policy(policy);
                let batch = WorkerPool::new(config, instant)?.run(payloads(n))?;

                let ids: Vec<_> = batch.results.iter().map(|r| r.task_id).collect();
                assert_eq!(ids, (0..n).collect::<Vec<_>>(), "{policy} n={n}");
                assert_eq!(ids.iter().collect::<BTreeSet<_>>().len(), n);
                assert_eq!(batch.summary.total_strings, n);
                assert_eq!(batch.summary.success_count, n);
                assert!(batch.is_complete());
            }
        }
    }
    Ok(())
}

#[test]
fn results_are_sorted_whatever_the_completion_order() -> Result<()> {
    let inputs = vec!["aaaaaaaa", "aaaaaa", "aaaa", "aa"];
    let finished = Arc::new(Mutex::new(Vec::new()));
    let process = {
        let finished = Arc::clone(&finished);
        move |payload: &str| {
            let stats = sleepy(payload);
            finished.lock().unwrap().push(payload.len());
            stats
        }
    };

    let batch = submit(inputs.clone(), inputs.len(), process)?;

    let ids: Vec<_> = batch.results.iter().map(|r| r.task_id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
    let returned: Vec<_> = batch.results.iter().map(|r| r.payload.as_str()).collect();
    assert_eq!(returned, inputs);
    // The shortest payload was dispatched last but finished first.
    assert_eq!(finished.lock().unwrap()[0], 2);
    Ok(())
}

#[test]
fn total_time_is_the_slowest_task() -> Result<()> {
    let batch = submit(vec!["a", "abcd", "ab"], 3, instant)?;
    assert!((batch.summary.total_time - 0.9).abs() < 1e-9);
    Ok(())
}

#[test]
fn canonical_scenario() -> Result<()> {
    let work = SyntheticDelay::new(0.0);
    let batch = submit(vec!["abc", "de", "fghij"], 3, move |p: &str| work.process(p))?;

    let stats: Vec<Stats> = batch.results.iter().map(|r| *r.stats().unwrap()).collect();
    let chars: Vec<_> = stats.iter().map(|s| s.char_count).collect();
    let words: Vec<_> = stats.iter().map(|s| s.word_count).collect();
    assert_eq!(chars, vec![3, 2, 5]);
    assert_eq!(words, vec![1, 1, 1]);
    assert_eq!(batch.summary.total_chars, 10);
    assert_eq!(batch.summary.total_words, 3);
    assert!((batch.summary.total_time - 1.0).abs() < 1e-9);
    assert_eq!(batch.summary.success_count, 3);
    assert_eq!(batch.summary.failure_count, 0);
    Ok(())
}

#[test]
fn one_failure_does_not_stop_the_batch() -> Result<()> {
    let inputs = vec!["one", "two words", "bad", "four", "five six seven"];
    let batch = submit(inputs, 2, |payload: &str| {
        if payload == "bad" {
            Err(format!("cannot process '{payload}'"))
        } else {
            Ok(canonical(payload))
        }
    })?;

    assert_eq!(batch.results.len(), 5);
    assert_eq!(batch.summary.failure_count, 1);
    assert_eq!(batch.summary.success_count, 4);
    assert_eq!(
        batch.results[2].outcome,
        Outcome::Failure(TaskError::Failed("cannot process 'bad'".to_owned()))
    );
    assert_eq!(batch.summary.total_words, 6);
    Ok(())
}

#[test]
fn panicking_task_is_reported_as_failure() -> Result<()> {
    for policy in POLICIES {
        let config = PoolConfig::new(2).policy(policy);
        let batch = WorkerPool::new(config, |payload: &str| {
            if payload == "explode" {
                panic_control::disable_hook_in_current_thread();
                panic!("kaboom");
            }
            Ok::<_, String>(canonical(payload))
        })?
        .run(vec!["fine", "explode", "also fine"])?;

        assert_eq!(batch.summary.success_count, 2, "{policy}");
        assert_eq!(
            batch.results[1].error(),
            Some(&TaskError::Panicked("kaboom".to_owned()))
        );
    }
    Ok(())
}

#[test]
fn repeated_runs_give_identical_stats() -> Result<()> {
    let inputs = payloads(10);
    let first = submit(inputs.clone(), 4, instant)?;
    let second = submit(inputs, 4, instant)?;
    assert_eq!(first.results, second.results);
    assert_eq!(first.summary, second.summary);
    Ok(())
}

#[test]
fn empty_batch() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let process = {
        let calls = Arc::clone(&calls);
        move |payload: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            instant(payload)
        }
    };
    let batch = submit(Vec::<String>::new(), 4, process)?;

    assert!(batch.results.is_empty());
    assert_eq!(batch.summary.total_strings, 0);
    assert_eq!(batch.summary.total_chars, 0);
    assert_eq!(batch.summary.total_words, 0);
    assert_eq!(batch.summary.total_time, 0.0);
    assert_eq!(batch.summary.success_count, 0);
    assert_eq!(batch.summary.failure_count, 0);
    assert_eq!(batch.peak_active, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn zero_concurrency_is_rejected_before_dispatch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let process = {
        let calls = Arc::clone(&calls);
        move |payload: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            instant(payload)
        }
    };
    let err = submit(vec!["a", "b"], 0, process).unwrap_err();
    assert!(matches!(err, PoolError::InvalidConfiguration(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Runs a batch while counting tasks in flight from inside the task body.
fn observed_peak(config: PoolConfig, n: usize) -> Result<(usize, usize)> {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let process = {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        move |payload: &str| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(30));
            active.fetch_sub(1, Ordering::SeqCst);
            instant(payload)
        }
    };
    let batch = WorkerPool::new(config, process)?.run(payloads(n))?;
    assert_eq!(batch.summary.success_count, n);
    Ok((peak.load(Ordering::SeqCst), batch.peak_active))
}

#[test]
fn single_slot_runs_one_task_at_a_time() -> Result<()> {
    let (observed, reported) = observed_peak(PoolConfig::new(1), 5)?;
    assert_eq!(observed, 1);
    assert_eq!(reported, 1);
    Ok(())
}

#[test]
fn bounded_policies_respect_the_limit() -> Result<()> {
    for policy in [LaunchPolicy::Bounded, LaunchPolicy::WorkStealing] {
        let (observed, reported) = observed_peak(PoolConfig::new(3).policy(policy), 12)?;
        assert!(observed <= 3, "{policy}: {observed}");
        assert!(reported <= 3, "{policy}: {reported}");
    }
    Ok(())
}

#[test]
fn unbounded_policy_ignores_the_limit() -> Result<()> {
    let config = PoolConfig::new(1).policy(LaunchPolicy::Unbounded);
    let (observed, reported) = observed_peak(config, 6)?;
    assert!(observed > 1);
    assert!(reported > 1);
    Ok(())
}

#[test]
fn bounded_dispatch_follows_submission_order() -> Result<()> {
    let started = Arc::new(Mutex::new(Vec::new()));
    let process = {
        let started = Arc::clone(&started);
        move |payload: &str| {
            started.lock().unwrap().push(payload.to_owned());
            instant(payload)
        }
    };
    let inputs = payloads(8);
    submit(inputs.clone(), 1, process)?;
    assert_eq!(*started.lock().unwrap(), inputs);
    Ok(())
}

#[test]
fn timeout_returns_partial_batch() -> Result<()> {
    let config = PoolConfig::new(3).timeout(Duration::from_millis(200));
    let batch = WorkerPool::new(config, |payload: &str| {
        if payload == "slow" {
            thread::sleep(Duration::from_secs(2));
        }
        instant(payload)
    })?
    .run(vec!["fast", "slow", "quick"])?;

    assert_eq!(batch.status, BatchStatus::PartialTimeout { missing: vec![1] });
    assert!(!batch.is_complete());
    let ids: Vec<_> = batch.results.iter().map(|r| r.task_id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert_eq!(batch.summary.total_strings, 3);
    assert_eq!(batch.summary.success_count, 2);
    Ok(())
}

#[test]
fn generous_timeout_completes() -> Result<()> {
    let config = PoolConfig::new(2).timeout(Duration::from_secs(30));
    let batch = WorkerPool::new(config, instant)?.run(payloads(6))?;
    assert!(batch.is_complete());
    assert_eq!(batch.results.len(), 6);
    Ok(())
}

#[test]
fn cancelled_batch_reports_every_task() -> Result<()> {
    let cancel = Cancellation::new();
    cancel.cancel();
    let config = PoolConfig::new(2).cancellation(cancel);
    let batch = WorkerPool::new(config, instant)?.run(payloads(4))?;

    assert_eq!(batch.results.len(), 4);
    assert_eq!(batch.summary.failure_count, 4);
    assert!(batch
        .results
        .iter()
        .all(|r| r.error() == Some(&TaskError::Cancelled)));
    assert_eq!(batch.peak_active, 0);
    Ok(())
}

#[test]
fn cancelling_mid_batch_skips_queued_tasks() -> Result<()> {
    let cancel = Cancellation::new();
    let process = {
        let cancel = cancel.clone();
        move |payload: &str| {
            cancel.cancel();
            instant(payload)
        }
    };
    let config = PoolConfig::new(1).cancellation(cancel);
    let batch = WorkerPool::new(config, process)?.run(payloads(4))?;

    assert!(batch.results[0].is_success());
    assert!(batch.results[1..]
        .iter()
        .all(|r| r.error() == Some(&TaskError::Cancelled)));
    assert_eq!(batch.summary.success_count, 1);
    assert_eq!(batch.summary.failure_count, 3);
    Ok(())
}
