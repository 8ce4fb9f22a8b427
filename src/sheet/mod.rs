//! Sheet 客户层
//!
//! 此模块包含建立在仿真内核之上的 sheet 节点：活动矩阵、
//! 输出函数、基础 sheet 与周期生成 sheet。

// 子模块声明
mod generator;
mod grid;
mod output_fn;
mod sheet;

// 重新导出公共接口
pub use generator::{Constant, GeneratorSheet, PatternSource, Ramp};
pub use grid::{ActivityGrid, SheetCoords};
pub use output_fn::{Clip, Hysteresis, OutputFn};
pub use sheet::Sheet;
