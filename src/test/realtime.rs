use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::util::{MarkLog, mark};
use crate::sim::{Event, FunctionCall, SimTime, Simulation};

#[test]
fn run_hooks_bracket_each_run_call() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulation::new();
    let start = Arc::clone(&log);
    sim.add_run_start_hook(move || start.lock().expect("hook lock").push("start"));
    let stop = Arc::clone(&log);
    sim.add_run_stop_hook(move || stop.lock().expect("hook lock").push("stop"));

    let ev = Arc::clone(&log);
    sim.enqueue(
        SimTime(1),
        Event::Function(FunctionCall::new("note", move |_sim: &mut Simulation| {
            ev.lock().expect("hook lock").push("event");
        })),
    );

    sim.run(SimTime(2));
    // 钩子包住整个 run 调用，而不是单个 tick；空跑也各触发一次。
    sim.run(SimTime(2));

    assert_eq!(
        &*log.lock().expect("hook lock"),
        &["start", "event", "stop", "start", "stop"]
    );
}

#[test]
fn realtime_run_blocks_for_scaled_gap() {
    let marks: MarkLog = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulation::realtime(10.0);
    sim.enqueue(SimTime(3), mark(1, Arc::clone(&marks)));

    let before = Instant::now();
    sim.run(SimTime(3));
    let elapsed = before.elapsed();

    // 时间缩放 10ms/tick，前进 3 tick 至少挂起约 30ms。
    assert!(elapsed >= Duration::from_millis(20), "elapsed: {elapsed:?}");
    assert_eq!(marks.lock().expect("mark lock").len(), 1);
    assert_eq!(sim.now(), SimTime(3));
}

#[test]
fn non_realtime_run_does_not_block() {
    let mut sim = Simulation::new();
    sim.enqueue(
        SimTime(1_000_000),
        Event::Function(FunctionCall::new("noop", |_sim: &mut Simulation| {})),
    );

    let before = Instant::now();
    sim.run(SimTime(1_000_000));
    assert!(before.elapsed() < Duration::from_secs(1));
}
