//! 连接
//!
//! 定义节点之间带延迟、带端口标签的有向边。

use super::port::Port;
use super::time::SimTime;

/// 节点之间的有向连接。
///
/// 只能通过 `Simulation::connect` 创建，以便在创建时对两端的
/// 端口声明与连接名唯一性做检查。创建之后除延迟外不可变。
#[derive(Debug, Clone)]
pub struct Connection {
    pub(crate) src: String,
    pub(crate) dest: String,
    pub(crate) name: String,
    pub(crate) src_port: Port,
    pub(crate) dest_port: Port,
    pub(crate) delay: SimTime,
    pub(crate) private: bool,
}

impl Connection {
    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn src_port(&self) -> &Port {
        &self.src_port
    }

    pub fn dest_port(&self) -> &Port {
        &self.dest_port
    }

    /// 发送与交付之间的因果延迟。
    pub fn delay(&self) -> SimTime {
        self.delay
    }

    /// 内部连接不出现在用户可见的枚举里。
    pub fn is_private(&self) -> bool {
        self.private
    }
}

/// `Simulation::connect` 的参数。
///
/// 延迟默认为 1 tick：零延迟合法，但跨节点的零延迟交付会让
/// 同时事件的先后取决于入队顺序，应尽量避免。
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    /// 连接名，缺省为 `"{src}To{dest}"`。
    pub name: Option<String>,
    pub src_port: Port,
    pub dest_port: Port,
    pub delay: SimTime,
    pub private: bool,
}

impl Default for ConnectionParams {
    fn default() -> ConnectionParams {
        ConnectionParams {
            name: None,
            src_port: Port::default(),
            dest_port: Port::default(),
            delay: SimTime(1),
            private: false,
        }
    }
}
