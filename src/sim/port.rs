//! 端口标签
//!
//! 定义区分节点输入/输出通道的端口标签，以及节点对合法端口的声明。

use std::fmt;

/// 端口标签：区分同一节点上多条逻辑收发通道。
///
/// 连接的两端总是携带具体端口；未显式指定时使用默认的
/// `Activity` 端口。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Port(String);

impl Port {
    pub fn new(name: impl Into<String>) -> Port {
        Port(name.into())
    }

    /// 默认端口：常规活动数据。
    pub fn activity() -> Port {
        Port("Activity".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Port {
    fn default() -> Port {
        Port::activity()
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 节点声明的合法端口集合。
///
/// 通配符只存在于声明里：`Any` 表示接受任意端口，`Only` 列出
/// 允许的端口。连接本身永远携带具体端口。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSpec {
    Any,
    Only(Vec<Port>),
}

impl PortSpec {
    pub fn only<I, S>(ports: I) -> PortSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PortSpec::Only(ports.into_iter().map(Port::new).collect())
    }

    /// 给定端口是否在声明允许的范围内。
    pub fn allows(&self, port: &Port) -> bool {
        match self {
            PortSpec::Any => true,
            PortSpec::Only(list) => list.contains(port),
        }
    }
}
