pub mod monitoring;
pub mod sst;

/// 初始化日志；可以重复调用（测试里每个 case 都会调）
pub fn init_engine() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
    log::debug!("engine initialized");
}
