//! 活动缓冲
//!
//! 定义 sheet 的二维活动矩阵及其坐标系。

/// sheet 坐标系：以原点为中心的连续坐标映射到矩阵行列。
///
/// 坐标范围为 `[-radius, radius)`，`density` 是每单位长度的
/// 矩阵格数。行号自上（+y）向下增长。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetCoords {
    radius: f64,
    density: f64,
}

impl SheetCoords {
    pub fn new(radius: f64, density: f64) -> SheetCoords {
        SheetCoords { radius, density }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    /// 矩阵形状（行数、列数）。
    pub fn shape(&self) -> (usize, usize) {
        let n = (2.0 * self.radius * self.density).round().max(1.0) as usize;
        (n, n)
    }

    /// sheet 坐标到矩阵行列，越界时夹到边缘。
    pub fn sheet_to_matrix(&self, x: f64, y: f64) -> (usize, usize) {
        let (rows, cols) = self.shape();
        let row = ((self.radius - y) * self.density).floor().max(0.0) as usize;
        let col = ((x + self.radius) * self.density).floor().max(0.0) as usize;
        (row.min(rows - 1), col.min(cols - 1))
    }

    /// 矩阵格中心对应的 sheet 坐标。
    pub fn matrix_to_sheet(&self, row: usize, col: usize) -> (f64, f64) {
        let x = (col as f64 + 0.5) / self.density - self.radius;
        let y = self.radius - (row as f64 + 0.5) / self.density;
        (x, y)
    }
}

/// 二维活动矩阵，行优先存储。
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityGrid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl ActivityGrid {
    pub fn new(rows: usize, cols: usize) -> ActivityGrid {
        ActivityGrid {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_coords(coords: &SheetCoords) -> ActivityGrid {
        let (rows, cols) = coords.shape();
        ActivityGrid::new(rows, cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, v: f64) {
        self.data[row * self.cols + col] = v;
    }

    pub fn fill(&mut self, v: f64) {
        self.data.fill(v);
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// 逐元素累加另一矩阵；形状不一致时不做任何修改并返回 false。
    pub fn accumulate(&mut self, other: &ActivityGrid) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        for (v, o) in self.data.iter_mut().zip(&other.data) {
            *v += o;
        }
        true
    }

    pub fn scale(&mut self, k: f64) {
        for v in &mut self.data {
            *v *= k;
        }
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }
}
