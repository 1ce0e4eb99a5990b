//! View-prefix property tests (spec §8 boundary scenario 3, §4.G).

use hatstack::HatStack;

#[test]
fn view_is_exact_snapshot_of_prefix_at_claim_time() {
    let stack = HatStack::new(4);
    for i in 1..=10usize {
        stack.push(i);
    }
    let mut view = stack.view();
    for i in 11..=20usize {
        stack.push(i);
    }

    let seen: Vec<usize> = std::iter::from_fn(|| view.view_next()).collect();
    let expected: Vec<usize> = (1..=10usize).rev().collect();
    assert_eq!(seen, expected);

    // The live stack still has everything, pushes included.
    let mut drained = Vec::new();
    while let Some(item) = stack.pop() {
        drained.push(item);
    }
    assert_eq!(drained, (1..=20usize).rev().collect::<Vec<_>>());
}

#[test]
fn view_excludes_items_popped_strictly_before_claim() {
    let stack = HatStack::new(4);
    stack.push(1);
    stack.push(2);
    stack.push(3);
    assert_eq!(stack.pop(), Some(3));

    let mut view = stack.view();
    assert_eq!(view.view_next(), Some(2));
    assert_eq!(view.view_next(), Some(1));
    assert_eq!(view.view_next(), None);
}

#[test]
fn view_implements_iterator() {
    let stack = HatStack::new(4);
    stack.push(1);
    stack.push(2);
    stack.push(3);
    let view = stack.view();
    let collected: Vec<usize> = view.collect();
    assert_eq!(collected, vec![3, 2, 1]);
}

#[test]
fn multiple_concurrent_views_each_see_their_own_claim_boundary() {
    let stack = HatStack::new(4);
    stack.push(1);
    let mut view_a = stack.view();
    stack.push(2);
    let mut view_b = stack.view();
    stack.push(3);

    assert_eq!(view_a.view_next(), Some(1));
    assert_eq!(view_a.view_next(), None);

    assert_eq!(view_b.view_next(), Some(2));
    assert_eq!(view_b.view_next(), Some(1));
    assert_eq!(view_b.view_next(), None);
}
