//! 仿真核心模块
//!
//! 此模块包含事件驱动仿真的核心组件：仿真时间、事件、连接、
//! 节点接口与仿真内核。

// 子模块声明
mod connection;
mod error;
mod event;
mod id;
mod node;
mod port;
mod realtime;
mod scheduled_event;
mod simulation;
mod time;
mod workspace;

// 重新导出公共接口
pub use connection::{Connection, ConnectionParams};
pub use error::SimError;
pub use event::{Event, EventKind, EventSequence, FunctionCall, Payload, PeriodicSequence, SubEvent};
pub use id::ConnId;
pub use node::EventProcessor;
pub use port::{Port, PortSpec};
pub use realtime::RealTimePacer;
pub use scheduled_event::ScheduledEvent;
pub use simulation::{CommandFn, RunHook, Simulation};
pub use time::{Clock, SimTime};
pub use workspace::Workspace;
