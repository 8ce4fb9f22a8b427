use std::sync::{Arc, Mutex};

use super::util::{DeliveryLog, MarkLog, Probe, emit, mark};
use crate::sheet::{Constant, GeneratorSheet, SheetCoords};
use crate::sim::{ConnectionParams, EventKind, Payload, SimError, SimTime, Simulation};

#[test]
fn push_then_pop_restores_clock_queue_and_node_state() {
    let log: DeliveryLog = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulation::new();
    sim.register("a", Box::new(Probe::new(Arc::clone(&log))));
    sim.register("b", Box::new(Probe::new(Arc::clone(&log))));
    sim.connect("a", "b", ConnectionParams::default())
        .expect("connect a -> b");

    sim.enqueue(SimTime(1), emit("a", Payload::Scalar(1.0)));
    sim.run(SimTime(2));
    assert_eq!(sim.now(), SimTime(2));
    assert_eq!(sim.get_as::<Probe>("b").expect("b exists").received(), 1);

    sim.state_push();
    assert_eq!(sim.state_depth(), 1);

    sim.enqueue(SimTime(5), emit("a", Payload::Scalar(2.0)));
    sim.enqueue(SimTime(6), emit("a", Payload::Scalar(3.0)));
    sim.enqueue(SimTime(7), emit("a", Payload::Scalar(4.0)));
    sim.run(SimTime(10));
    assert_eq!(sim.now(), SimTime(12));
    assert_eq!(sim.get_as::<Probe>("b").expect("b exists").received(), 4);

    sim.state_pop().expect("state pop");
    assert_eq!(sim.state_depth(), 0);
    assert_eq!(sim.now(), SimTime(2));
    assert_eq!(sim.queue_len(), 0);
    assert_eq!(sim.get_as::<Probe>("b").expect("b exists").received(), 1);
}

#[test]
fn nested_push_pop_unwinds_in_order() {
    let log: DeliveryLog = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulation::new();
    sim.register("a", Box::new(Probe::new(Arc::clone(&log))));
    sim.register("b", Box::new(Probe::new(Arc::clone(&log))));
    sim.connect("a", "b", ConnectionParams::default())
        .expect("connect a -> b");
    sim.run(SimTime::ZERO);

    sim.state_push();
    sim.enqueue(SimTime(1), emit("a", Payload::Scalar(1.0)));
    sim.run(SimTime(3));
    assert_eq!(sim.get_as::<Probe>("b").expect("b exists").received(), 1);

    sim.state_push();
    sim.enqueue(SimTime(4), emit("a", Payload::Scalar(2.0)));
    sim.run(SimTime(3));
    assert_eq!(sim.get_as::<Probe>("b").expect("b exists").received(), 2);
    assert_eq!(sim.state_depth(), 2);

    sim.state_pop().expect("inner pop");
    assert_eq!(sim.now(), SimTime(3));
    assert_eq!(sim.get_as::<Probe>("b").expect("b exists").received(), 1);

    sim.state_pop().expect("outer pop");
    assert_eq!(sim.now(), SimTime::ZERO);
    assert_eq!(sim.get_as::<Probe>("b").expect("b exists").received(), 0);
}

#[test]
fn pop_with_nothing_pushed_is_an_error() {
    let mut sim = Simulation::new();
    assert!(matches!(sim.state_pop(), Err(SimError::EmptyStateStack)));
}

#[test]
fn push_forces_pending_starts_first() {
    let mut sim = Simulation::new();
    sim.register(
        "retina",
        Box::new(GeneratorSheet::new(
            SheetCoords::new(0.5, 2.0),
            SimTime(2),
            SimTime::ZERO,
            Constant(1.0),
        )),
    );

    // 注册后从未 run 过；push 先做零时长 run，让启动副作用留在快照里。
    sim.state_push();
    assert_eq!(sim.pending_count(EventKind::Periodic), 1);

    sim.state_pop().expect("state pop");
    assert_eq!(sim.pending_count(EventKind::Periodic), 1);
}

#[test]
fn clear_pending_wrapped_in_push_pop_is_reversible() {
    let log: DeliveryLog = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulation::new();
    sim.register("a", Box::new(Probe::new(Arc::clone(&log))));
    sim.register("b", Box::new(Probe::new(Arc::clone(&log))));
    sim.connect("a", "b", ConnectionParams::default())
        .expect("connect a -> b");
    sim.enqueue(SimTime(1), emit("a", Payload::Scalar(1.0)));
    sim.run(SimTime::ZERO);
    assert_eq!(sim.pending_count(EventKind::Delivery), 0);
    assert_eq!(sim.pending_count(EventKind::Function), 1);

    sim.state_push();
    sim.clear_pending(EventKind::Function);
    assert_eq!(sim.queue_len(), 0);

    sim.state_pop().expect("state pop");
    assert_eq!(sim.pending_count(EventKind::Function), 1);
}

#[test]
fn fifo_order_is_preserved_across_pop() {
    let marks: MarkLog = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulation::new();
    sim.enqueue(SimTime(5), mark(1, Arc::clone(&marks)));

    sim.state_push();
    sim.enqueue(SimTime(5), mark(2, Arc::clone(&marks)));
    sim.state_pop().expect("state pop");

    // 恢复了序列号计数，pop 之后新入队的同时刻事件仍排在旧事件之后。
    sim.enqueue(SimTime(5), mark(3, Arc::clone(&marks)));
    sim.run(SimTime(10));

    assert_eq!(
        &*marks.lock().expect("mark lock"),
        &[(SimTime(5), 1), (SimTime(5), 3)]
    );
}
