//! 事件类型
//!
//! 定义仿真事件的各个变体与跨连接传递的负载。

use std::fmt;
use std::sync::Arc;

use super::id::ConnId;
use super::simulation::Simulation;
use super::time::SimTime;
use crate::sheet::ActivityGrid;

/// 事件负载：跨连接传递的数据。
///
/// `Clone` 是深拷贝；发送路径对每条出连接克隆一份，发送方之后
/// 修改原数据不会影响已生成的事件。
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Scalar(f64),
    Vector(Vec<f64>),
    Grid(ActivityGrid),
}

/// 函数事件携带的可调用对象。
#[derive(Clone)]
pub struct FunctionCall {
    label: &'static str,
    f: Arc<dyn Fn(&mut Simulation) + Send + Sync>,
}

impl FunctionCall {
    pub fn new(
        label: &'static str,
        f: impl Fn(&mut Simulation) + Send + Sync + 'static,
    ) -> FunctionCall {
        FunctionCall {
            label,
            f: Arc::new(f),
        }
    }

    pub fn label(&self) -> &str {
        self.label
    }

    pub(crate) fn invoke(&self, sim: &mut Simulation) {
        (self.f)(sim)
    }
}

impl fmt::Debug for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FunctionCall").field(&self.label).finish()
    }
}

/// 序列中的子事件：时间字段是相对于序列起点的偏移量，逐项累加。
#[derive(Debug, Clone)]
pub struct SubEvent {
    pub offset: SimTime,
    pub ev: Event,
}

/// 事件序列：触发时把全部子事件按累加偏移量入队。
#[derive(Debug, Clone)]
pub struct EventSequence {
    pub events: Vec<SubEvent>,
}

impl EventSequence {
    pub fn new(events: Vec<SubEvent>) -> EventSequence {
        EventSequence { events }
    }

    /// 序列总时长：各子事件偏移量之和。
    pub fn span(&self) -> SimTime {
        self.events
            .iter()
            .fold(SimTime::ZERO, |acc, sub| acc.saturating_add(sub.offset))
    }
}

/// 周期性事件序列：触发后重新入队自身。
///
/// 序列总时长超过周期时，下一次出现顺延到序列结束之后，
/// 即有效周期被拉长以容纳过长的序列。
#[derive(Debug, Clone)]
pub struct PeriodicSequence {
    pub sequence: EventSequence,
    pub period: SimTime,
}

/// 仿真事件。
#[derive(Debug, Clone)]
pub enum Event {
    /// 沿连接向目的节点交付负载。
    Delivery { conn: ConnId, data: Payload },
    /// 执行一条预注册命令。
    Command { name: String },
    /// 调用闭包。
    Function(FunctionCall),
    /// 按相对偏移展开一组子事件。
    Sequence(EventSequence),
    /// 周期性重新调度自身的事件序列。
    Periodic(PeriodicSequence),
}

/// 事件种类判别，用于批量清除。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Delivery,
    Command,
    Function,
    Sequence,
    Periodic,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Delivery { .. } => EventKind::Delivery,
            Event::Command { .. } => EventKind::Command,
            Event::Function(_) => EventKind::Function,
            Event::Sequence(_) => EventKind::Sequence,
            Event::Periodic(_) => EventKind::Periodic,
        }
    }
}
