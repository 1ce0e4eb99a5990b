//! Concrete boundary scenarios (single-threaded half of spec §8).

use hatstack::HatStack;

#[test]
fn push_past_capacity_triggers_migration_and_preserves_order() {
    let stack = HatStack::new(2);
    stack.push(1);
    stack.push(2);
    stack.push(3); // forces migration to a larger store
    assert_eq!(stack.pop(), Some(3));
    assert_eq!(stack.pop(), Some(2));
    assert_eq!(stack.pop(), Some(1));
    assert_eq!(stack.pop(), None);
}

#[test]
fn pop_to_empty_then_push_again_round_trips() {
    let stack = HatStack::new(4);
    stack.push(1);
    assert_eq!(stack.pop(), Some(1));
    assert_eq!(stack.pop(), None);
    stack.push(2);
    assert_eq!(stack.pop(), Some(2));
}

#[test]
fn view_over_empty_stack_yields_nothing() {
    let stack = HatStack::new(4);
    let mut view = stack.view();
    assert_eq!(view.view_next(), None);
}

#[test]
fn capacity_one_repeated_push_pop_cycles() {
    let stack = HatStack::new(1);
    for i in 0..10usize {
        stack.push(i);
        assert_eq!(stack.pop(), Some(i));
        assert_eq!(stack.pop(), None);
    }
}

#[test]
fn many_pushes_then_drain_is_exact_reverse() {
    let stack = HatStack::new(1);
    let n = 200usize;
    for i in 0..n {
        stack.push(i);
    }
    for i in (0..n).rev() {
        assert_eq!(stack.pop(), Some(i));
    }
    assert_eq!(stack.pop(), None);
}

#[test]
fn interleaved_push_pop_matches_a_reference_vec() {
    let stack = HatStack::new(2);
    let mut reference: Vec<usize> = Vec::new();
    let ops: &[i64] = &[1, 2, -1, 3, 4, 5, -1, -1, 6, -1, -1, -1];
    for &op in ops {
        if op >= 0 {
            stack.push(op as usize);
            reference.push(op as usize);
        } else {
            assert_eq!(stack.pop(), reference.pop());
        }
    }
}
