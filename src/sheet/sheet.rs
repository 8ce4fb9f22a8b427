//! Sheet 节点
//!
//! 持有二维活动矩阵的事件处理节点。

use std::any::Any;

use tracing::{debug, warn};

use super::grid::{ActivityGrid, SheetCoords};
use super::output_fn::OutputFn;
use crate::sim::{Connection, EventProcessor, Payload, Port, PortSpec, Simulation};

/// 持有活动矩阵的节点。
///
/// 入事件把到达的负载累加进活动矩阵；每个 tick 结束时，若本
/// tick 收到过新输入，则应用输出函数并把活动从 `Activity` 端口
/// 发送出去。检查点协议在 sheet 粒度重复内核的压栈/出栈模式：
/// 活动矩阵入栈，同时递归保存各输出函数的状态。
pub struct Sheet {
    name: String,
    coords: SheetCoords,
    activity: ActivityGrid,
    plastic: bool,
    apply_output_fns: bool,
    new_input: bool,
    output_fns: Vec<Box<dyn OutputFn>>,
    saved_state: Vec<(ActivityGrid, bool)>,
    plasticity_stack: Vec<bool>,
}

impl Sheet {
    pub fn new(coords: SheetCoords) -> Sheet {
        Sheet {
            name: String::new(),
            coords,
            activity: ActivityGrid::from_coords(&coords),
            plastic: true,
            apply_output_fns: true,
            new_input: false,
            output_fns: Vec::new(),
            saved_state: Vec::new(),
            plasticity_stack: Vec::new(),
        }
    }

    pub fn with_output_fn(mut self, f: impl OutputFn + 'static) -> Sheet {
        self.output_fns.push(Box::new(f));
        self
    }

    pub fn coords(&self) -> &SheetCoords {
        &self.coords
    }

    pub fn activity(&self) -> &ActivityGrid {
        &self.activity
    }

    pub fn activity_mut(&mut self) -> &mut ActivityGrid {
        &mut self.activity
    }

    pub fn is_plastic(&self) -> bool {
        self.plastic
    }

    pub fn set_apply_output_fns(&mut self, on: bool) {
        self.apply_output_fns = on;
    }

    /// 已保存的检查点层数。
    pub fn saved_len(&self) -> usize {
        self.saved_state.len()
    }

    /// 应用输出函数后，把当前活动从 `Activity` 端口发送出去。
    pub fn activate(&mut self, sim: &mut Simulation) {
        debug!(sheet = %self.name, "发送活动");
        if self.apply_output_fns {
            for of in &mut self.output_fns {
                of.apply(&mut self.activity);
            }
        }
        sim.send_output(&self.name, &Port::activity(), Payload::Grid(self.activity.clone()));
    }

    /// 暂时覆盖可塑性开关，先前的值压栈保存。
    ///
    /// 关闭可塑性不影响活动计算本身，只阻止长期状态的变化。
    pub fn override_plasticity(&mut self, plastic: bool) {
        self.plasticity_stack.push(self.plastic);
        self.plastic = plastic;
    }

    /// 恢复上一次覆盖之前的可塑性开关；栈空时告警并保持现状。
    pub fn restore_plasticity(&mut self) {
        match self.plasticity_stack.pop() {
            Some(v) => self.plastic = v,
            None => warn!(sheet = %self.name, "没有可恢复的可塑性设置"),
        }
    }
}

impl EventProcessor for Sheet {
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
        PortSpec::Any
    }

    fn input_event(&mut self, conn: &Connection, data: Payload, _sim: &mut Simulation) {
        match data {
            Payload::Grid(g) => {
                if !self.activity.accumulate(&g) {
                    warn!(
                        sheet = %self.name,
                        conn = %conn.name(),
                        "负载形状与活动矩阵不一致，忽略"
                    );
                    return;
                }
            }
            Payload::Scalar(v) => {
                for cell in self.activity.data_mut() {
                    *cell += v;
                }
            }
            Payload::Vector(vs) => {
                if vs.len() != self.activity.len() {
                    warn!(
                        sheet = %self.name,
                        conn = %conn.name(),
                        "负载长度与活动矩阵不一致，忽略"
                    );
                    return;
                }
                for (cell, v) in self.activity.data_mut().iter_mut().zip(&vs) {
                    *cell += v;
                }
            }
        }
        self.new_input = true;
    }

    fn process_current_time(&mut self, sim: &mut Simulation) {
        // 本 tick 有新输入才发送，出连接延迟保证不产生零延迟事件。
        if self.new_input {
            self.new_input = false;
            self.activate(sim);
        }
    }

    fn state_push(&mut self) {
        self.saved_state.push((self.activity.clone(), self.new_input));
        for of in &mut self.output_fns {
            of.state_push();
        }
    }

    fn state_pop(&mut self) {
        match self.saved_state.pop() {
            Some((activity, new_input)) => {
                self.activity = activity;
                self.new_input = new_input;
            }
            None => warn!(sheet = %self.name, "没有可恢复的活动状态"),
        }
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
