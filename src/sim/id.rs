//! 标识符类型
//!
//! 定义连接的唯一标识符。

/// 连接标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub usize);
