use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::sim::{
    Connection, Event, EventProcessor, FunctionCall, Payload, Port, SimTime, Simulation,
};

pub(crate) type DeliveryLog = Arc<Mutex<Vec<(SimTime, String, Payload)>>>;
pub(crate) type MarkLog = Arc<Mutex<Vec<(SimTime, u32)>>>;
pub(crate) type TickLog = Arc<Mutex<Vec<SimTime>>>;

pub(crate) struct Probe {
    name: String,
    log: DeliveryLog,
    ticks: TickLog,
    starts: u64,
    received: u64,
    saved: Vec<u64>,
}

impl Probe {
    pub(crate) fn new(log: DeliveryLog) -> Probe {
        Probe {
            name: String::new(),
            log,
            ticks: Arc::new(Mutex::new(Vec::new())),
            starts: 0,
            received: 0,
            saved: Vec::new(),
        }
    }

    pub(crate) fn with_ticks(log: DeliveryLog, ticks: TickLog) -> Probe {
        Probe {
            ticks,
            ..Probe::new(log)
        }
    }

    pub(crate) fn starts(&self) -> u64 {
        self.starts
    }

    pub(crate) fn received(&self) -> u64 {
        self.received
    }
}

impl EventProcessor for Probe {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn start(&mut self, _sim: &mut Simulation) {
        self.starts = self.starts.saturating_add(1);
    }

    fn input_event(&mut self, conn: &Connection, data: Payload, sim: &mut Simulation) {
        self.log
            .lock()
            .expect("log lock")
            .push((sim.now(), conn.name().to_string(), data));
        self.received = self.received.saturating_add(1);
    }

    fn process_current_time(&mut self, sim: &mut Simulation) {
        self.ticks.lock().expect("tick lock").push(sim.now());
    }

    fn state_push(&mut self) {
        self.saved.push(self.received);
    }

    fn state_pop(&mut self) {
        if let Some(received) = self.saved.pop() {
            self.received = received;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) fn emit(src: &'static str, data: Payload) -> Event {
    Event::Function(FunctionCall::new("emit", move |sim: &mut Simulation| {
        sim.send_output(src, &Port::default(), data.clone());
    }))
}

pub(crate) fn mark(id: u32, log: MarkLog) -> Event {
    Event::Function(FunctionCall::new("mark", move |sim: &mut Simulation| {
        log.lock().expect("mark lock").push((sim.now(), id));
    }))
}
