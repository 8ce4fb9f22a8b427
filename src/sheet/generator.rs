//! 生成 sheet
//!
//! 周期性地从模式源产生活动并发送的 sheet。

use std::any::Any;
use std::mem;

use tracing::{debug, info, warn};

use super::grid::{ActivityGrid, SheetCoords};
use super::output_fn::OutputFn;
use crate::sim::{
    Connection, Event, EventProcessor, EventSequence, FunctionCall, Payload, PeriodicSequence,
    Port, PortSpec, SimTime, Simulation, SubEvent,
};

/// 模式源：把一幅新图样写入活动矩阵。
///
/// 有内部状态的源应覆写 state_push / state_pop，配合检查点协议。
pub trait PatternSource: Send {
    fn fill(&mut self, grid: &mut ActivityGrid);

    fn state_push(&mut self) {}

    fn state_pop(&mut self) {}
}

/// 恒定值模式。
#[derive(Debug, Clone, Copy, Default)]
pub struct Constant(pub f64);

impl PatternSource for Constant {
    fn fill(&mut self, grid: &mut ActivityGrid) {
        grid.fill(self.0);
    }
}

/// 每次生成时整体抬升一个台阶的模式，便于观察生成次数。
#[derive(Debug, Clone, Default)]
pub struct Ramp {
    step: f64,
    level: f64,
    saved: Vec<f64>,
}

impl Ramp {
    pub fn new(step: f64) -> Ramp {
        Ramp {
            step,
            level: 0.0,
            saved: Vec::new(),
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}

impl PatternSource for Ramp {
    fn fill(&mut self, grid: &mut ActivityGrid) {
        self.level += self.step;
        grid.fill(self.level);
    }

    fn state_push(&mut self) {
        self.saved.push(self.level);
    }

    fn state_pop(&mut self) {
        if let Some(level) = self.saved.pop() {
            self.level = level;
        }
    }
}

/// 周期性生成活动模式的 sheet。
///
/// 启动时（周期为正）调度一个周期序列，每个周期触发一次
/// `generate`；不接受任何输入连接。模式源本身也可以压栈替换、
/// 出栈恢复，便于临时换源探测后还原。
pub struct GeneratorSheet {
    name: String,
    coords: SheetCoords,
    activity: ActivityGrid,
    period: SimTime,
    phase: SimTime,
    source: Box<dyn PatternSource>,
    source_stack: Vec<Box<dyn PatternSource>>,
    output_fns: Vec<Box<dyn OutputFn>>,
    apply_output_fns: bool,
    generated: u64,
    saved_state: Vec<(ActivityGrid, u64)>,
}

impl GeneratorSheet {
    pub fn new(
        coords: SheetCoords,
        period: SimTime,
        phase: SimTime,
        source: impl PatternSource + 'static,
    ) -> GeneratorSheet {
        GeneratorSheet {
            name: String::new(),
            coords,
            activity: ActivityGrid::from_coords(&coords),
            period,
            phase,
            source: Box::new(source),
            source_stack: Vec::new(),
            output_fns: Vec::new(),
            apply_output_fns: true,
            generated: 0,
            saved_state: Vec::new(),
        }
    }

    pub fn with_output_fn(mut self, f: impl OutputFn + 'static) -> GeneratorSheet {
        self.output_fns.push(Box::new(f));
        self
    }

    pub fn coords(&self) -> &SheetCoords {
        &self.coords
    }

    pub fn activity(&self) -> &ActivityGrid {
        &self.activity
    }

    pub fn period(&self) -> SimTime {
        self.period
    }

    /// 迄今为止生成的模式数。
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// 生成一幅新模式，应用输出函数并从 `Activity` 端口发送。
    pub fn generate(&mut self, sim: &mut Simulation) {
        debug!(sheet = %self.name, "生成新模式");
        self.source.fill(&mut self.activity);
        if self.apply_output_fns {
            for of in &mut self.output_fns {
                of.apply(&mut self.activity);
            }
        }
        self.generated += 1;
        sim.send_output(&self.name, &Port::activity(), Payload::Grid(self.activity.clone()));
    }

    /// 替换模式源；`push_existing` 为 true 时旧源压栈，之后可恢复。
    pub fn set_source(&mut self, new: Box<dyn PatternSource>, push_existing: bool) {
        if push_existing {
            let old = mem::replace(&mut self.source, new);
            self.source_stack.push(old);
        } else {
            self.source = new;
        }
    }

    /// 把当前模式源压栈，换成空白常量源。
    pub fn push_source(&mut self) {
        let old = mem::replace(&mut self.source, Box::new(Constant::default()));
        self.source_stack.push(old);
    }

    /// 丢弃当前模式源，恢复栈顶的上一个源；栈空时告警并保持现状。
    pub fn pop_source(&mut self) {
        match self.source_stack.pop() {
            Some(prev) => self.source = prev,
            None => warn!(sheet = %self.name, "没有可恢复的模式源"),
        }
    }

    pub fn source_depth(&self) -> usize {
        self.source_stack.len()
    }
}

impl EventProcessor for GeneratorSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn src_ports(&self) -> PortSpec {
        PortSpec::only(["Activity"])
    }

    fn dest_ports(&self) -> PortSpec {
        // 生成 sheet 不接受任何输入连接。
        PortSpec::Only(Vec::new())
    }

    fn start(&mut self, sim: &mut Simulation) {
        if self.period > SimTime::ZERO {
            let name = self.name.clone();
            let generate = FunctionCall::new("generate", move |sim: &mut Simulation| {
                generate_on(sim, &name);
            });
            let sequence = EventSequence::new(vec![SubEvent {
                offset: SimTime::ZERO,
                ev: Event::Function(generate),
            }]);
            let at = sim.now().saturating_add(self.phase);
            info!(sheet = %self.name, period = ?self.period, first = ?at, "调度周期生成");
            sim.enqueue(
                at,
                Event::Periodic(PeriodicSequence {
                    sequence,
                    period: self.period,
                }),
            );
        }
    }

    fn input_event(&mut self, conn: &Connection, _data: Payload, _sim: &mut Simulation) {
        warn!(sheet = %self.name, conn = %conn.name(), "生成 sheet 不接受输入，忽略");
    }

    fn state_push(&mut self) {
        self.saved_state.push((self.activity.clone(), self.generated));
        self.source.state_push();
        for of in &mut self.output_fns {
            of.state_push();
        }
    }

    fn state_pop(&mut self) {
        match self.saved_state.pop() {
            Some((activity, generated)) => {
                self.activity = activity;
                self.generated = generated;
            }
            None => warn!(sheet = %self.name, "没有可恢复的活动状态"),
        }
        self.source.state_pop();
        for of in &mut self.output_fns {
            of.state_pop();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// 以名称找到 GeneratorSheet 并触发一次生成。
fn generate_on(sim: &mut Simulation, name: &str) {
    let done = sim.with_node(name, |ep, sim| {
        if let Some(g) = ep.as_any_mut().downcast_mut::<GeneratorSheet>() {
            g.generate(sim);
            true
        } else {
            false
        }
    });
    if done != Some(true) {
        warn!(sheet = %name, "生成目标不存在或类型不符");
    }
}
