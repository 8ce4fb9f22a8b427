use crate::sim::{Clock, SimTime};

#[test]
fn sim_time_orders_and_saturates() {
    assert!(SimTime(1) < SimTime(2));
    assert_eq!(SimTime(3).saturating_add(SimTime(4)), SimTime(7));
    assert_eq!(SimTime(u64::MAX).saturating_add(SimTime(1)), SimTime(u64::MAX));
    assert_eq!(SimTime(2).saturating_sub(SimTime(5)), SimTime::ZERO);
}

#[test]
fn clamp_stop_applies_soft_ceiling_between_now_and_stop() {
    let mut clock = Clock::default();
    clock.set_until(Some(SimTime(5)));

    assert_eq!(clock.clamp_stop(Some(SimTime(10))), Some(SimTime(5)));
    assert_eq!(clock.clamp_stop(None), Some(SimTime(5)));
}

#[test]
fn clamp_stop_ignores_ceiling_outside_window() {
    let mut clock = Clock::default();
    clock.set_until(Some(SimTime(5)));
    assert_eq!(clock.clamp_stop(Some(SimTime(3))), Some(SimTime(3)));

    clock.set_now(SimTime(5));
    assert_eq!(clock.clamp_stop(Some(SimTime(9))), Some(SimTime(9)));
}

#[test]
fn clamp_stop_never_moves_before_now() {
    let mut clock = Clock::default();
    clock.set_now(SimTime(7));

    assert_eq!(clock.clamp_stop(Some(SimTime(3))), Some(SimTime(7)));
    assert_eq!(clock.clamp_stop(None), None);
}
