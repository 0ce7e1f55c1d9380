use std::sync::Arc;
use bytes::Bytes;
use log::{debug, warn};
use crate::DBError;
use crate::engine::monitoring::perf_context::perf_counter_add;
use crate::engine::monitoring::with_perf_context;
use crate::engine::sst::block::{FilterBitsReader, FilterPolicy, SliceTransform};
use crate::engine::sst::multiget::MultiGetRange;
use crate::util::ReadOptions;

/// 解码后的 full filter block：原始 bytes + 对应的 bits reader
///
/// 没有任何 key 的 filter（空 contents）没有 bits reader，查询一律返回 "可能存在"。
pub struct ParsedFullFilterBlock {
    block_contents: Bytes,
    filter_bits_reader: Option<Box<dyn FilterBitsReader>>,
}

impl ParsedFullFilterBlock {
    pub fn new(policy: &dyn FilterPolicy, contents: Bytes) -> Self {
        let filter_bits_reader = policy.new_reader(&contents);
        Self {
            block_contents: contents,
            filter_bits_reader,
        }
    }

    pub fn filter_bits_reader(&self) -> Option<&dyn FilterBitsReader> {
        self.filter_bits_reader.as_deref()
    }

    pub fn size(&self) -> usize {
        self.block_contents.len()
    }

    pub fn approximate_memory_usage(&self) -> usize {
        self.block_contents.len() + std::mem::size_of::<Self>()
    }
}

/// 取 filter block 的外部能力（cache 查找 / 读文件），可能失败
pub trait FilterBlockLoader: Send + Sync {
    fn load(&self, read_options: &ReadOptions) -> Result<Arc<ParsedFullFilterBlock>, DBError>;
}

impl<F> FilterBlockLoader for F
where
    F: Fn(&ReadOptions) -> Result<Arc<ParsedFullFilterBlock>, DBError> + Send + Sync,
{
    fn load(&self, read_options: &ReadOptions) -> Result<Arc<ParsedFullFilterBlock>, DBError> {
        self(read_options)
    }
}

/// full filter 的读取端。任何读取错误都按 "可能存在" 处理，绝不产生 false negative。
pub struct FullFilterBlockReader {
    loader: Arc<dyn FilterBlockLoader>,
    /// pin 住的 filter；None 时每次查询都走 loader
    filter_block: Option<Arc<ParsedFullFilterBlock>>,
    whole_key_filtering: bool,
}

impl FullFilterBlockReader {
    pub fn new(
        loader: Arc<dyn FilterBlockLoader>,
        filter_block: Option<Arc<ParsedFullFilterBlock>>,
        whole_key_filtering: bool,
    ) -> Self {
        Self {
            loader,
            filter_block,
            whole_key_filtering,
        }
    }

    /// prefetch 或不走 cache 时立即读一次 filter；读失败则不创建 reader。
    /// 走 cache 且不 pin 时，读到的 entry 只用于预热，随后释放。
    pub fn create(
        loader: Arc<dyn FilterBlockLoader>,
        read_options: &ReadOptions,
        whole_key_filtering: bool,
        use_cache: bool,
        prefetch: bool,
        pin: bool,
    ) -> Option<Self> {
        debug_assert!(!pin || prefetch);

        let mut filter_block = None;
        if prefetch || !use_cache {
            match loader.load(read_options) {
                Ok(block) => filter_block = Some(block),
                Err(e) => {
                    warn!("failed to read filter block, table will be read without filter: {e}");
                    return None;
                }
            }
            if use_cache && !pin {
                filter_block = None;
            }
        }

        Some(Self::new(loader, filter_block, whole_key_filtering))
    }

    pub fn whole_key_filtering(&self) -> bool {
        self.whole_key_filtering
    }

    fn get_or_read_filter_block(
        &self,
        read_options: &ReadOptions,
    ) -> Result<Arc<ParsedFullFilterBlock>, DBError> {
        match &self.filter_block {
            Some(block) => Ok(Arc::clone(block)),
            None => self.loader.load(read_options),
        }
    }

    pub fn key_may_match(&self, key: &[u8], read_options: &ReadOptions) -> bool {
        if !self.whole_key_filtering {
            return true;
        }
        self.may_match(key, read_options)
    }

    pub fn prefix_may_match(&self, prefix: &[u8], read_options: &ReadOptions) -> bool {
        self.may_match(prefix, read_options)
    }

    fn may_match(&self, entry: &[u8], read_options: &ReadOptions) -> bool {
        let filter_block = match self.get_or_read_filter_block(read_options) {
            Ok(block) => block,
            Err(e) => {
                debug!("filter block unavailable, treating key as present: {e}");
                return true;
            }
        };

        match filter_block.filter_bits_reader() {
            Some(reader) => {
                if reader.may_match(entry) {
                    perf_counter_add!(bloom_sst_hit_count, 1);
                    true
                } else {
                    perf_counter_add!(bloom_sst_miss_count, 1);
                    false
                }
            }
            None => true,
        }
    }

    /// whole key 批量过滤；whole key filtering 关闭时什么都不做
    pub fn keys_may_match(&self, range: &mut MultiGetRange, read_options: &ReadOptions) {
        if !self.whole_key_filtering {
            return;
        }
        self.may_match_batch(range, None, read_options);
    }

    pub fn prefixes_may_match(
        &self,
        range: &mut MultiGetRange,
        prefix_extractor: &dyn SliceTransform,
        read_options: &ReadOptions,
    ) {
        self.may_match_batch(range, Some(prefix_extractor), read_options);
    }

    fn may_match_batch(
        &self,
        range: &mut MultiGetRange,
        prefix_extractor: Option<&dyn SliceTransform>,
        read_options: &ReadOptions,
    ) {
        let filter_block = match self.get_or_read_filter_block(read_options) {
            Ok(block) => block,
            Err(e) => {
                debug!("filter block unavailable, keeping all {} keys: {e}", range.num_remaining());
                return;
            }
        };
        let Some(reader) = filter_block.filter_bits_reader() else {
            return;
        };

        // 不在 prefix domain 内的 key 不参与查询，也不会被 skip
        let mut indices = Vec::with_capacity(range.num_remaining());
        let mut entries: Vec<&[u8]> = Vec::with_capacity(range.num_remaining());
        for (i, key) in range.iter() {
            match prefix_extractor {
                None => {
                    indices.push(i);
                    entries.push(key);
                }
                Some(p) if p.in_domain(key) => {
                    indices.push(i);
                    entries.push(p.transform(key));
                }
                Some(_) => {}
            }
        }

        let mut may_match = vec![true; entries.len()];
        reader.may_match_batch(&entries, &mut may_match);

        // 批量路径的 hit 不受 perf level 控制，miss 仍按 perf level 计数
        for (i, matched) in indices.into_iter().zip(may_match) {
            if matched {
                with_perf_context(|ctx| ctx.bloom_sst_hit_count += 1);
            } else {
                range.skip_key(i);
                perf_counter_add!(bloom_sst_miss_count, 1);
            }
        }
    }

    pub fn approximate_memory_usage(&self) -> usize {
        let block_usage = self
            .filter_block
            .as_ref()
            .map_or(0, |b| b.approximate_memory_usage());
        block_usage + std::mem::size_of::<Self>()
    }
}
