//! Admission gate behaviour under sequential and concurrent load.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use storegate::config::AdmissionConfig;
use storegate::security::AdmissionGate;

#[test]
fn eleventh_call_in_window_is_rejected() {
    let gate = AdmissionGate::from_config(&AdmissionConfig::default());
    let decisions: Vec<bool> = (0..11).map(|_| gate.try_admit("203.0.113.9")).collect();
    assert_eq!(decisions.iter().filter(|d| **d).count(), 10);
    assert!(!decisions[10]);
}

#[test]
fn exhausted_key_does_not_affect_others() {
    let gate = AdmissionGate::default();
    for _ in 0..10 {
        assert!(gate.try_admit("A"));
    }
    assert!(!gate.try_admit("A"));
    assert!(gate.try_admit("B"));
}

#[tokio::test(start_paused = true)]
async fn counter_resets_after_window() {
    let gate = AdmissionGate::default();
    for _ in 0..10 {
        gate.try_admit("k");
    }
    assert!(!gate.try_admit("k"));

    tokio::time::advance(Duration::from_millis(60_000)).await;
    assert!(gate.try_admit("k"));
}

#[test]
fn concurrent_same_key_admits_exactly_capacity() {
    const THREADS: usize = 32;
    let gate = Arc::new(AdmissionGate::new(10, Duration::from_secs(60), 1_000));
    let barrier = Arc::new(Barrier::new(THREADS));
    let admitted = Arc::new(AtomicU32::new(0));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let barrier = Arc::clone(&barrier);
            let admitted = Arc::clone(&admitted);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..4 {
                    if gate.try_admit("shared") {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 10);
    assert_eq!(gate.remaining("shared"), 0);
}

#[test]
fn concurrent_distinct_keys_each_get_full_capacity() {
    const KEYS: usize = 16;
    let gate = Arc::new(AdmissionGate::new(5, Duration::from_secs(60), 1_000));
    let barrier = Arc::new(Barrier::new(KEYS));

    let workers: Vec<_> = (0..KEYS)
        .map(|i| {
            let gate = Arc::clone(&gate);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let key = format!("10.0.0.{}", i);
                barrier.wait();
                (0..8).filter(|_| gate.try_admit(&key)).count()
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().expect("worker panicked"), 5);
    }
    assert_eq!(gate.tracked_keys(), KEYS);
}

#[test]
fn store_stays_bounded() {
    let gate = AdmissionGate::new(1, Duration::from_secs(60), 100);
    for i in 0..1_000 {
        assert!(gate.try_admit(&format!("client-{}", i)));
    }
    assert!(gate.tracked_keys() <= 100);
}

#[test]
fn concurrent_new_keys_never_exceed_key_limit() {
    const THREADS: usize = 8;
    const MAX_KEYS: usize = 32;
    let gate = Arc::new(AdmissionGate::new(1, Duration::from_secs(60), MAX_KEYS));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let gate = Arc::clone(&gate);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..200).all(|i| gate.try_admit(&format!("{}-{}", t, i)))
            })
        })
        .collect();

    for worker in workers {
        assert!(worker.join().expect("worker panicked"), "a new key was rejected");
    }
    assert!(gate.tracked_keys() <= MAX_KEYS, "store grew to {}", gate.tracked_keys());
}
