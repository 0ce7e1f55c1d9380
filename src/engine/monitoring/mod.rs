pub mod perf_level;
pub mod perf_context;

pub use perf_level::{get_perf_level, set_perf_level, PerfLevel};
pub use perf_context::{get_perf_context, reset_perf_context, with_perf_context, PerfContext};
