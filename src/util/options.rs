use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::DBError;
use crate::engine::sst::block::{create_prefix_extractor, BloomFilterPolicy, FilterPolicy, SliceTransform};
use crate::util::{DEFAULT_BLOCK_SIZE, DEFAULT_BLOOM_BITS_PER_KEY, DEFAULT_RESTART_INTERVAL};

/// 建表 / 读表共用的 table 级配置
#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    // Filter
    pub whole_key_filtering: bool,
    pub bloom_bits_per_key: usize,
    /// "fixed:N" / "capped:N" / "noop"，None 表示不做 prefix filter
    pub prefix_extractor: Option<String>,

    // Block
    pub block_size: usize,
    pub block_restart_interval: usize,

    // Cache / Table
    pub cache_filter_block: bool,
    pub pin_filter_block: bool,
}

/// 单次读操作的选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// 读 block 时校验 trailer 里的 crc32c
    pub verify_checksums: bool,
    pub fill_cache: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            fill_cache: true,
        }
    }
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            whole_key_filtering: true,
            bloom_bits_per_key: DEFAULT_BLOOM_BITS_PER_KEY,
            prefix_extractor: None,

            block_size: DEFAULT_BLOCK_SIZE,
            block_restart_interval: DEFAULT_RESTART_INTERVAL,

            cache_filter_block: true,
            pin_filter_block: true,
        }
    }
}

impl TableOptions {
    /// 解析 prefix_extractor 配置串
    pub fn prefix_extractor(&self) -> Result<Option<Arc<dyn SliceTransform>>, DBError> {
        match &self.prefix_extractor {
            None => Ok(None),
            Some(desc) => Ok(Some(create_prefix_extractor(desc)?)),
        }
    }

    pub fn filter_policy(&self) -> Arc<dyn FilterPolicy> {
        Arc::new(BloomFilterPolicy::new(self.bloom_bits_per_key))
    }

    pub fn validate(&self) -> Result<(), DBError> {
        if self.block_restart_interval == 0 {
            return Err(DBError::InvalidArgument("block_restart_interval must be > 0".into()));
        }
        if self.block_size == 0 {
            return Err(DBError::InvalidArgument("block_size must be > 0".into()));
        }
        if !self.whole_key_filtering && self.prefix_extractor.is_none() {
            log::debug!("neither whole key nor prefix filtering enabled; filters will be empty");
        }
        // 提前把配置串解析一遍
        self.prefix_extractor()?;
        Ok(())
    }
}
