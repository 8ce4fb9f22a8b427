//! 输出函数
//!
//! 对 sheet 活动矩阵做就地变换的函数族，支持自身状态的
//! 压栈/出栈以配合检查点协议。

use super::grid::ActivityGrid;

/// 输出函数：就地变换活动矩阵。
///
/// 有内部状态的实现应覆写 state_push / state_pop，在 sheet 的
/// 检查点被保存与恢复时同步保存与恢复自身状态。
pub trait OutputFn: Send {
    fn apply(&mut self, grid: &mut ActivityGrid);

    fn state_push(&mut self) {}

    fn state_pop(&mut self) {}
}

/// 把活动值截断到 `[lower, upper]`。
#[derive(Debug, Clone, Copy)]
pub struct Clip {
    pub lower: f64,
    pub upper: f64,
}

impl OutputFn for Clip {
    fn apply(&mut self, grid: &mut ActivityGrid) {
        for v in grid.data_mut() {
            *v = v.clamp(self.lower, self.upper);
        }
    }
}

/// 一阶滞后：输出向输入按 `ratio` 靠拢，保留上一次的结果作为
/// 内部状态。
#[derive(Debug, Clone, Default)]
pub struct Hysteresis {
    ratio: f64,
    prev: Option<ActivityGrid>,
    saved: Vec<Option<ActivityGrid>>,
}

impl Hysteresis {
    pub fn new(ratio: f64) -> Hysteresis {
        Hysteresis {
            ratio,
            prev: None,
            saved: Vec::new(),
        }
    }
}

impl OutputFn for Hysteresis {
    fn apply(&mut self, grid: &mut ActivityGrid) {
        if let Some(prev) = &self.prev {
            if prev.shape() == grid.shape() {
                for (v, p) in grid.data_mut().iter_mut().zip(prev.data()) {
                    *v = p + (*v - p) * self.ratio;
                }
            }
        }
        self.prev = Some(grid.clone());
    }

    fn state_push(&mut self) {
        self.saved.push(self.prev.clone());
    }

    fn state_pop(&mut self) {
        if let Some(prev) = self.saved.pop() {
            self.prev = prev;
        }
    }
}
