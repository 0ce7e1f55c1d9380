use std::cell::Cell;

/// 每个线程独立的 perf 统计级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PerfLevel {
    Uninitialized = 0,
    /// 不统计
    Disable = 1,
    /// 只统计计数器
    EnableCount = 2,
    /// 计数 + 计时
    EnableTime = 3,
    OutOfBounds = 4,
}

thread_local! {
    static PERF_LEVEL: Cell<PerfLevel> = const { Cell::new(PerfLevel::EnableCount) };
}

pub fn set_perf_level(level: PerfLevel) {
    assert!(level > PerfLevel::Uninitialized);
    assert!(level < PerfLevel::OutOfBounds);
    PERF_LEVEL.with(|l| l.set(level));
}

pub fn get_perf_level() -> PerfLevel {
    PERF_LEVEL.with(|l| l.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_set() {
        assert_eq!(get_perf_level(), PerfLevel::EnableCount);
        set_perf_level(PerfLevel::Disable);
        assert_eq!(get_perf_level(), PerfLevel::Disable);
        set_perf_level(PerfLevel::EnableCount);
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds_level_panics() {
        set_perf_level(PerfLevel::OutOfBounds);
    }
}
