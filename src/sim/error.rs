//! 错误类型
//!
//! 定义配置与调度过程中需要立即上报的错误。

use super::id::ConnId;
use super::port::Port;
use thiserror::Error;

/// 仿真错误。
///
/// 配置错误在调用处立即失败；运行期的非致命异常（过期事件、
/// 实时节奏失守等）只告警，不在此列。
#[derive(Debug, Error)]
pub enum SimError {
    #[error("no event processor named '{0}' in the simulation")]
    UnknownNode(String),

    #[error("'{port}' is not on the list of ports provided for outgoing connections of '{node}'")]
    IllegalSrcPort { node: String, port: Port },

    #[error("'{port}' is not on the list of ports allowed for incoming connections of '{node}'")]
    IllegalDestPort { node: String, port: Port },

    #[error("a connection into '{dest}' must have a unique name; '{name}' already exists")]
    DuplicateInConnection { dest: String, name: String },

    #[error(
        "a connection out of '{src}' must have a unique name among connections to '{dest}'; '{name}' already exists"
    )]
    DuplicateOutConnection {
        src: String,
        dest: String,
        name: String,
    },

    #[error("no such connection: {0:?}")]
    UnknownConnection(ConnId),

    #[error("no command named '{0}' has been registered")]
    UnknownCommand(String),

    #[error("scheduled command '{name}' failed: {reason}")]
    CommandFailed { name: String, reason: String },

    #[error("state_pop called with no saved state on the stack")]
    EmptyStateStack,
}
