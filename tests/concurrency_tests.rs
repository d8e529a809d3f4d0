//! Concurrent resolution against one scope tree: singleton first-use
//! races, failure fan-out to waiters, and a parallel stress pass.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use wyre::{FnRecipe, Key, ScopeExt, ScopeKind, ScopeTree};

#[test]
fn concurrent_singleton_requests_construct_exactly_once() {
    const THREADS: usize = 8;

    let root = ScopeTree::builder().build();
    let constructions = Arc::new(AtomicU32::new(0));
    let counter = constructions.clone();
    root.bind(
        Key::of::<String>(),
        Arc::new(FnRecipe::producing(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            // Widen the race window.
            thread::sleep(Duration::from_millis(20));
            String::from("shared")
        })),
        ScopeKind::Singleton,
    )
    .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let instances: Vec<Arc<String>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let root = root.clone();
                let barrier = barrier.clone();
                s.spawn(move || {
                    barrier.wait();
                    root.get::<String>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    for instance in &instances[1..] {
        assert!(Arc::ptr_eq(&instances[0], instance));
    }
}

#[test]
fn a_failed_singleton_surfaces_to_waiters_and_stays_retryable() {
    const THREADS: usize = 4;

    let root = ScopeTree::builder().build();
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    root.bind(
        Key::of::<u32>(),
        Arc::new(FnRecipe::new(Vec::new(), move |_| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            if attempt == 0 {
                let fault: wyre::ProvisionFault =
                    Arc::new(std::io::Error::other("cold start"));
                Err(fault)
            } else {
                Ok(Some(Arc::new(99u32)))
            }
        })),
        ScopeKind::Singleton,
    )
    .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let outcomes: Vec<Result<Arc<u32>, _>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let root = root.clone();
                let barrier = barrier.clone();
                s.spawn(move || {
                    barrier.wait();
                    root.get::<u32>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // The first attempt failed; every thread either observed that failure
    // or won a later retry and got the real value.
    let failures = outcomes.iter().filter(|o| o.is_err()).count();
    assert!(failures >= 1, "the failed attempt reached someone");
    for outcome in outcomes.iter().flatten() {
        assert_eq!(**outcome, 99);
    }

    // The slot reverted rather than caching the failure.
    assert_eq!(*root.get::<u32>().unwrap(), 99);
}

#[test]
fn parallel_stress_mixes_scoped_and_unscoped_resolution() {
    let root = ScopeTree::builder().build();
    let constructions = Arc::new(AtomicU32::new(0));
    let counter = constructions.clone();
    root.bind(
        Key::of::<String>(),
        Arc::new(FnRecipe::producing(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            String::from("singleton")
        })),
        ScopeKind::Singleton,
    )
    .unwrap();
    root.bind(
        Key::of::<u32>(),
        Arc::new(FnRecipe::producing(|| 5u32)),
        ScopeKind::Unscoped,
    )
    .unwrap();

    (0..64u32).into_par_iter().for_each(|i| {
        if i % 2 == 0 {
            let shared = root.get::<String>().unwrap();
            assert_eq!(*shared, "singleton");
        } else {
            assert_eq!(*root.get::<u32>().unwrap(), 5);
        }
    });

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
}
