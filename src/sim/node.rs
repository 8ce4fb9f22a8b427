//! 事件处理节点
//!
//! 定义仿真图中的节点接口（EventProcessor）。

use super::connection::Connection;
use super::event::Payload;
use super::port::PortSpec;
use super::simulation::Simulation;
use std::any::Any;

/// 事件处理节点：仿真图中可收发事件的命名顶点。
///
/// 节点创建后并不自动参与仿真；经 `Simulation::register` 注册后
/// 才会获得名字，并在下一次 `run` 开始时收到一次 `start` 调用。
pub trait EventProcessor: Any {
    /// 节点名称，注册时由仿真内核设置。
    fn name(&self) -> &str;

    /// 由 `Simulation::register` 调用。
    fn set_name(&mut self, name: &str);

    /// 合法的输出端口声明。
    fn src_ports(&self) -> PortSpec {
        PortSpec::Any
    }

    /// 合法的输入端口声明。
    fn dest_ports(&self) -> PortSpec {
        PortSpec::Any
    }

    /// 注册后的一次性启动钩子。
    fn start(&mut self, _sim: &mut Simulation) {}

    /// 处理沿连接到达的负载；由哪条连接/端口到达由实现自行解释。
    fn input_event(&mut self, conn: &Connection, data: Payload, sim: &mut Simulation);

    /// tick 钩子：当前时刻的事件全部交付之后、时钟前进之前被调用。
    /// 实现不得在此入队零延迟事件，否则会破坏因果序。
    fn process_current_time(&mut self, _sim: &mut Simulation) {}

    /// 保存自身状态，配合 `Simulation::state_push`。
    fn state_push(&mut self) {}

    /// 恢复自身状态，配合 `Simulation::state_pop`。
    fn state_pop(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
