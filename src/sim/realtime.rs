//! 实时节奏控制
//!
//! 让运行循环的时钟前进与墙钟时间保持对应。

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::time::SimTime;

/// 实时节奏器：仿真时钟前进时按比例挂起墙钟时间。
///
/// `timescale` 为 1 个仿真 tick 对应的真实毫秒数。每次 `run`
/// 进入时记录一个墙钟基准，后续前进会扣除事件处理已消耗的
/// 计算时间；扣除后为负即为节奏失守，只告警并立即继续。
#[derive(Debug, Clone)]
pub struct RealTimePacer {
    timescale: f64,
    last_stamp: Option<Instant>,
}

impl RealTimePacer {
    pub fn new(timescale: f64) -> RealTimePacer {
        RealTimePacer {
            timescale,
            last_stamp: None,
        }
    }

    pub fn timescale(&self) -> f64 {
        self.timescale
    }

    /// 在 run 进入时记录墙钟基准。
    pub(crate) fn stamp(&mut self) {
        self.last_stamp = Some(Instant::now());
    }

    /// 为给定的仿真时间间隔挂起相应的墙钟时间。
    pub(crate) fn pace(&mut self, gap: SimTime) {
        let target_ms = gap.0 as f64 * self.timescale;
        let elapsed_ms = self
            .last_stamp
            .map_or(0.0, |s| s.elapsed().as_secs_f64() * 1_000.0);
        let sleep_ms = target_ms - elapsed_ms;

        if sleep_ms < 0.0 {
            warn!(?gap, overrun_ms = -sleep_ms, "实时节奏失守");
        } else {
            debug!(?gap, sleep_ms, "实时等待");
            std::thread::sleep(Duration::from_secs_f64(sleep_ms / 1_000.0));
        }
        self.last_stamp = Some(Instant::now());
    }
}
