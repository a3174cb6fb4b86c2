//! Tests for sampled break/suspend checks

use super::helpers::ScriptedOracle;
use crate::engine::{CounterStacks, ResumableCounter, SAMPLE_100, SAMPLE_1000, SAMPLE_10000};
use std::rc::Rc;

/// Run one counter from 0 to `end`, calling `check` before every increment.
/// Returns the values at which the oracle was polled.
fn polled_values(end: usize, check: fn(&mut ResumableCounter<'_, ()>) -> bool) -> Vec<usize> {
    let oracle = Rc::new(ScriptedOracle::new());
    let mut stacks = CounterStacks::new();
    stacks.set_oracle(oracle.clone());
    stacks.reset(());

    let mut counter = ResumableCounter::open(&mut stacks, false).unwrap();
    let mut polled = Vec::new();
    while counter.value() < end {
        let before = oracle.polls();
        assert!(!check(&mut counter));
        if oracle.polls() > before {
            polled.push(counter.value());
        }
        counter.increment();
    }
    counter.close();
    polled
}

#[test]
fn test_sampling_periods_are_powers_of_two() {
    assert_eq!(SAMPLE_100, 128);
    assert_eq!(SAMPLE_1000, 1024);
    assert_eq!(SAMPLE_10000, 8192);
}

#[test]
fn test_check_every_128() {
    let polled = polled_values(1000, |c| c.must_break_or_suspend_100());
    assert_eq!(polled, (0..1000).step_by(128).collect::<Vec<_>>());
    assert_eq!(polled.len(), 8);
}

#[test]
fn test_check_every_1024() {
    let polled = polled_values(5000, |c| c.must_break_or_suspend_1000());
    assert_eq!(polled, vec![0, 1024, 2048, 3072, 4096]);
}

#[test]
fn test_check_every_8192() {
    let polled = polled_values(20000, |c| c.must_break_or_suspend_10000());
    assert_eq!(polled, vec![0, 8192, 16384]);
}

#[test]
fn test_unsampled_check_polls_every_value() {
    let polled = polled_values(10, |c| c.must_break_or_suspend());
    assert_eq!(polled, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_sampled_check_suspends_on_sampled_value_only() {
    let oracle = Rc::new(ScriptedOracle::suspend_at(2));
    let mut stacks = CounterStacks::new();
    stacks.set_oracle(oracle.clone());
    stacks.reset(());

    {
        let mut counter = ResumableCounter::open(&mut stacks, false).unwrap();
        while counter.value() < 1000 {
            if counter.must_break_or_suspend_100() {
                break;
            }
            counter.increment();
        }
        assert_eq!(counter.value(), 128);
    }
    assert_eq!(stacks.slots(), &[128]);
    assert_eq!(oracle.polls(), 2);
}
