//! Tests for broken passes: oracle breaks and the depth policy

use super::helpers::{advance, walk, ScriptedOracle};
use crate::config::EngineConfig;
use crate::engine::{BreakCause, CounterStacks, ResumableCounter};
use crate::trigger::Signal;
use crate::error::EngineError;
use std::rc::Rc;

#[test]
fn test_oracle_break_marks_pass_broken() {
    let oracle = Rc::new(ScriptedOracle::break_at(3));
    let mut stacks = CounterStacks::new();
    stacks.set_oracle(oracle.clone());
    stacks.reset(());

    let mut out = Vec::new();
    assert!(!walk(&mut stacks, &[2, 3], &mut out).unwrap());

    assert_eq!(out, vec![vec![0, 0], vec![0, 1]]);
    assert!(stacks.did_break());
    assert!(stacks.must_break());
    assert_eq!(stacks.break_cause(), Some(BreakCause::Requested));
    // Broken counters are closed, not suspended
    assert!(stacks.slots().is_empty());
    assert!(stacks.no_active_counters());
}

#[test]
fn test_open_after_break_requires_reset() {
    let oracle = Rc::new(ScriptedOracle::break_at(1));
    let mut stacks = CounterStacks::new();
    stacks.set_oracle(oracle.clone());
    stacks.reset(());

    let mut out = Vec::new();
    assert!(!walk(&mut stacks, &[2], &mut out).unwrap());
    assert_eq!(
        walk(&mut stacks, &[2], &mut out).err(),
        Some(EngineError::PassBroken)
    );

    stacks.reset(());
    assert!(walk(&mut stacks, &[2], &mut out).unwrap());
    assert_eq!(out, vec![vec![0], vec![1]]);
}

#[test]
fn test_counters_opened_after_break_are_exhausted() {
    let oracle = Rc::new(ScriptedOracle::break_at(1));
    let mut stacks = CounterStacks::new();
    stacks.set_oracle(oracle.clone());
    stacks.reset(());

    let mut outer = ResumableCounter::open(&mut stacks, false).unwrap();
    outer.advance_by(3);
    assert!(outer.must_break_or_suspend());

    let mut inner = outer.nest(false);
    assert!(inner.is_exhausted());
    assert!(inner.must_break());
    assert!(!inner.inc());
    assert_eq!(inner.value(), 0);
}

#[test]
fn test_first_break_cause_wins() {
    let config = EngineConfig {
        max_depth: Some(1),
        ..EngineConfig::default()
    };
    let oracle = Rc::new(ScriptedOracle::break_at(1));
    let mut stacks = CounterStacks::with_oracle(config, oracle.clone());
    stacks.reset(());

    let mut outer = ResumableCounter::open(&mut stacks, false).unwrap();
    assert!(outer.must_break_or_suspend());
    let inner = outer.nest(false);
    drop(inner);
    drop(outer);

    assert_eq!(stacks.break_cause(), Some(BreakCause::Requested));
}

#[test]
fn test_depth_limit_breaks_pass() {
    let config = EngineConfig {
        max_depth: Some(2),
        ..EngineConfig::default()
    };
    let mut stacks = CounterStacks::with_config(config);
    stacks.reset(());

    let mut out = Vec::new();
    assert!(walk(&mut stacks, &[2, 2], &mut out).unwrap());
    assert_eq!(out.len(), 4);

    let mut out = Vec::new();
    assert!(!walk(&mut stacks, &[2, 2, 2], &mut out).unwrap());
    assert!(out.is_empty());
    assert_eq!(stacks.break_cause(), Some(BreakCause::DepthExceeded));
}

#[test]
fn test_pop_back_clears_break() {
    let oracle = Rc::new(ScriptedOracle::break_at(1));
    let mut stacks = CounterStacks::new();
    stacks.set_oracle(oracle.clone());
    stacks.reset(1);
    advance(&mut stacks, 2);
    stacks.add_draw_region(2);

    let mut out = Vec::new();
    assert!(!walk(&mut stacks, &[3], &mut out).unwrap());
    assert_eq!(stacks.break_cause(), Some(BreakCause::Requested));

    assert_eq!(stacks.pop_back(), Some(2));
    assert!(!stacks.did_break());
    assert!(walk(&mut stacks, &[3], &mut out).unwrap());
    assert_eq!(out, vec![vec![2]]);
}

#[test]
fn test_must_break_next_looks_ahead_without_polling() {
    let oracle = Rc::new(ScriptedOracle::new());
    let mut stacks = CounterStacks::new();
    stacks.set_oracle(oracle.clone());
    stacks.reset(());
    {
        let mut outer = ResumableCounter::open(&mut stacks, false).unwrap();
        outer.advance_by(2);
        let mut inner = outer.nest(false);
        inner.advance_by(1);
    }
    stacks.add_draw_region(());

    let mut counter = ResumableCounter::open(&mut stacks, false).unwrap();
    assert_eq!(counter.stop_value(), 2);
    counter.set_value(2).unwrap();

    // The frame below stored a deeper level, so the current value is not a break yet
    assert!(!counter.must_break());
    assert!(counter.must_break_next());
    assert_eq!(oracle.polls(), 0);
    drop(counter);

    assert_eq!(stacks.break_cause(), Some(BreakCause::CaughtUp));
    assert_eq!(stacks.slots(), &[2, 1]);
}

#[test]
fn test_signal_must_stop() {
    assert!(!Signal::Proceed.must_stop());
    assert!(Signal::Suspend.must_stop());
    assert!(Signal::Break.must_stop());
}
