//! Multi-threaded boundary scenarios (spec §8): concurrent pushers racing
//! migration, and a view claim racing mutators. Mirrors the fill-pattern
//! shape of the allocator's own cross-thread stress test, adapted to a
//! LIFO stack's invariants instead of a heap's.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use hatstack::HatStack;

#[test]
fn concurrent_pushers_all_land_exactly_once() {
    let stack = Arc::new(HatStack::new(4));
    let threads = 8usize;
    let per_thread = 500usize;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                for i in 0..per_thread {
                    stack.push(t * per_thread + i);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let mut seen = HashSet::new();
    while let Some(item) = stack.pop() {
        // No value should ever appear twice: a push lands its item in
        // exactly one cell (spec invariant 1/2).
        assert!(seen.insert(item), "duplicate item popped: {item}");
    }
    assert_eq!(seen.len(), threads * per_thread);
}

#[test]
fn concurrent_push_and_pop_never_lose_or_duplicate_items() {
    let stack = Arc::new(HatStack::new(8));
    let pushers = 4usize;
    let per_pusher = 2000usize;

    let push_handles: Vec<_> = (0..pushers)
        .map(|t| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                for i in 0..per_pusher {
                    stack.push(t * per_pusher + i);
                }
            })
        })
        .collect();

    let popper_stack = Arc::clone(&stack);
    let popper = thread::spawn(move || {
        let mut popped = Vec::new();
        let target = pushers * per_pusher;
        while popped.len() < target {
            if let Some(item) = popper_stack.pop() {
                popped.push(item);
            } else {
                thread::yield_now();
            }
        }
        popped
    });

    for h in push_handles {
        h.join().unwrap();
    }
    let mut popped = popper.join().unwrap();
    popped.sort_unstable();
    popped.dedup();
    assert_eq!(popped.len(), pushers * per_pusher);
}

#[test]
fn view_claim_races_concurrent_pushers_without_panicking() {
    let stack = Arc::new(HatStack::new(4));
    for i in 0..50usize {
        stack.push(i);
    }

    let pusher_stack = Arc::clone(&stack);
    let pusher = thread::spawn(move || {
        for i in 50..5000usize {
            pusher_stack.push(i);
        }
    });

    let viewer_stack = Arc::clone(&stack);
    let viewer = thread::spawn(move || {
        // A view claimed mid-flight must still see a coherent prefix: every
        // item it reports must have been pushed before (or at) claim time.
        let mut view = viewer_stack.view();
        let mut count = 0usize;
        while view.view_next().is_some() {
            count += 1;
        }
        count
    });

    pusher.join().unwrap();
    let seen = viewer.join().unwrap();
    assert!(seen <= 5000);

    let mut drained = 0usize;
    while stack.pop().is_some() {
        drained += 1;
    }
    assert_eq!(drained, 5000); // all pushed items still drain cleanly
}
