//! 当前仿真句柄
//!
//! 交互使用需要一个"当前网络"；用显式句柄代替进程级全局状态。

use super::simulation::Simulation;

/// 持有"当前仿真"的显式句柄。
///
/// 交互场景把同一个 `Workspace` 的可变引用穿给各调用方；需要
/// 独立实例的场合（测试等）直接构造 `Simulation`，两者互不影响。
#[derive(Default)]
pub struct Workspace {
    current: Option<Simulation>,
}

impl Workspace {
    pub fn new() -> Workspace {
        Workspace::default()
    }

    /// 当前仿真；尚不存在时先创建一个空内核。
    pub fn current(&mut self) -> &mut Simulation {
        self.current.get_or_insert_with(Simulation::new)
    }

    /// 替换当前仿真，返回被换下的实例。
    pub fn replace(&mut self, sim: Simulation) -> Option<Simulation> {
        self.current.replace(sim)
    }

    /// 取走当前仿真。
    pub fn take(&mut self) -> Option<Simulation> {
        self.current.take()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}
