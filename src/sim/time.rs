//! 仿真时间类型
//!
//! 定义逻辑仿真时间与带软停止上限的时钟。

/// 仿真时间（逻辑 tick，无量纲）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub fn saturating_add(self, other: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(other.0))
    }
}

/// 逻辑时钟：当前时间加一个用户可设的软停止上限。
///
/// 软上限只收紧单次 `run` 能推进到的时刻，不影响已入队的事件。
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    now: SimTime,
    until: Option<SimTime>,
}

impl Clock {
    /// 当前仿真时间。
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub(crate) fn set_now(&mut self, t: SimTime) {
        self.now = t;
    }

    /// 软停止上限；`None` 表示不限。
    pub fn until(&self) -> Option<SimTime> {
        self.until
    }

    pub fn set_until(&mut self, until: Option<SimTime>) {
        self.until = until;
    }

    /// 计算本次运行的实际停止时刻。
    ///
    /// 软上限严格落在当前时间与 `stop` 之间时收紧到软上限；
    /// 结果永远不早于当前时间。
    pub(crate) fn clamp_stop(&self, stop: Option<SimTime>) -> Option<SimTime> {
        let mut stop = stop;
        if let Some(ceiling) = self.until {
            if self.now < ceiling && stop.is_none_or(|s| ceiling <= s) {
                stop = Some(ceiling);
            }
        }
        stop.map(|s| s.max(self.now))
    }
}
