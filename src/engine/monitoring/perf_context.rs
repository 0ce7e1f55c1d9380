use std::cell::RefCell;

/// 线程局部的读路径计数器
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerfContext {
    /// full filter 判定 "可能存在" 的次数
    pub bloom_sst_hit_count: u64,
    /// full filter 判定 "一定不存在" 的次数
    pub bloom_sst_miss_count: u64,
    /// 从 table 读出的 block 数
    pub block_read_count: u64,
}

impl PerfContext {
    pub fn reset(&mut self) {
        *self = PerfContext::default();
    }
}

thread_local! {
    static PERF_CONTEXT: RefCell<PerfContext> = RefCell::new(PerfContext::default());
}

pub fn with_perf_context<R>(f: impl FnOnce(&mut PerfContext) -> R) -> R {
    PERF_CONTEXT.with(|ctx| f(&mut ctx.borrow_mut()))
}

/// 当前线程计数器的快照
pub fn get_perf_context() -> PerfContext {
    with_perf_context(|ctx| *ctx)
}

pub fn reset_perf_context() {
    with_perf_context(|ctx| ctx.reset());
}

/// 只有 perf level >= EnableCount 时才累加
macro_rules! perf_counter_add {
    ($counter:ident, $n:expr) => {
        if $crate::engine::monitoring::get_perf_level()
            >= $crate::engine::monitoring::PerfLevel::EnableCount
        {
            $crate::engine::monitoring::with_perf_context(|ctx| ctx.$counter += $n);
        }
    };
}

pub(crate) use perf_counter_add;
