use std::sync::{Arc, Mutex};
use bytes::Bytes;
use log::{debug, info};
use crate::DBError;
use crate::engine::monitoring::perf_context::perf_counter_add;
use crate::engine::sst::block::{
    DataBlock, FilterBlockLoader, FilterPolicy, FullFilterBlockReader, IndexBlock, ParsedFullFilterBlock,
    SliceTransform,
};
use crate::engine::sst::format::{block_in_range, verify_block_trailer, BlockHandle, Footer};
use crate::engine::sst::iterator::{
    new_error_internal_iterator, new_two_level_iterator, DataBlockIter, InternalIterator,
};
use crate::engine::sst::multiget::MultiGetRange;
use crate::util::{ReadOptions, TableOptions};

/// 从 table image 里读 filter block
///
/// use_cache 时带一个单槽 cache：命中直接返回；未命中读 image，
/// 只有 `read_options.fill_cache` 为 true 才把结果放进 cache。
pub struct TableFilterLoader {
    image: Bytes,
    handle: BlockHandle,
    policy: Arc<dyn FilterPolicy>,
    use_cache: bool,
    cached: Mutex<Option<Arc<ParsedFullFilterBlock>>>,
}

impl TableFilterLoader {
    pub fn new(image: Bytes, handle: BlockHandle, policy: Arc<dyn FilterPolicy>, use_cache: bool) -> Self {
        Self {
            image,
            handle,
            policy,
            use_cache,
            cached: Mutex::new(None),
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached.lock().unwrap().is_some()
    }
}

impl FilterBlockLoader for TableFilterLoader {
    fn load(&self, read_options: &ReadOptions) -> Result<Arc<ParsedFullFilterBlock>, DBError> {
        if self.use_cache {
            if let Some(block) = self.cached.lock().unwrap().as_ref() {
                return Ok(Arc::clone(block));
            }
        }

        let contents = read_block_contents(&self.image, &self.handle, read_options.verify_checksums)?;
        let block = Arc::new(ParsedFullFilterBlock::new(self.policy.as_ref(), contents));
        if self.use_cache && read_options.fill_cache {
            *self.cached.lock().unwrap() = Some(Arc::clone(&block));
        }
        Ok(block)
    }
}

/// 校验（可选）并切出 block 内容，和 image 共享内存
fn read_block_contents(image: &Bytes, handle: &BlockHandle, verify_checksums: bool) -> Result<Bytes, DBError> {
    if !block_in_range(image.len(), handle) {
        return Err(DBError::Corruption(format!("block {handle} out of file range")));
    }
    if verify_checksums {
        verify_block_trailer(image, handle)?;
    }
    perf_counter_add!(block_read_count, 1);
    let start = handle.offset as usize;
    Ok(image.slice(start..start + handle.size as usize))
}

struct Rep {
    image: Bytes,
    footer: Footer,
    index_block: IndexBlock,
    filter: Option<FullFilterBlockReader>,
    prefix_extractor: Option<Arc<dyn SliceTransform>>,
}

impl Rep {
    fn read_data_block(&self, handle: &BlockHandle, read_options: &ReadOptions) -> Result<Arc<DataBlock>, DBError> {
        let contents = read_block_contents(&self.image, handle, read_options.verify_checksums)?;
        Ok(Arc::new(DataBlock::from_bytes(contents)?))
    }

    /// 越界的 handle 视为 block 不存在；读或解析失败变成 error iterator
    fn block_iterator(&self, handle: &BlockHandle, read_options: &ReadOptions) -> Option<Box<dyn InternalIterator>> {
        if !block_in_range(self.image.len(), handle) {
            return None;
        }
        match self.read_data_block(handle, read_options) {
            Ok(block) => Some(Box::new(DataBlockIter::new(block))),
            Err(e) => {
                debug!("failed to read data block {handle}: {e}");
                Some(new_error_internal_iterator(e))
            }
        }
    }
}

/// 只读的 block based table，可以在多个 iterator 之间共享
#[derive(Clone)]
pub struct BlockBasedTable {
    rep: Arc<Rep>,
}

impl BlockBasedTable {
    pub fn open(image: Bytes, options: &TableOptions) -> Result<Self, DBError> {
        options.validate()?;
        if image.len() < Footer::ENCODED_LEN {
            return Err(DBError::Corruption(format!("file too short ({} bytes) to be a table", image.len())));
        }
        let footer = Footer::decode(&image[image.len() - Footer::ENCODED_LEN..])?;

        let index_contents = read_block_contents(&image, &footer.index_handle, true)?;
        let index_block = IndexBlock::from_bytes(index_contents)?;

        let filter = if footer.filter_handle.size > 0 {
            let loader = Arc::new(TableFilterLoader::new(
                image.clone(),
                footer.filter_handle,
                options.filter_policy(),
                options.cache_filter_block,
            ));
            FullFilterBlockReader::create(
                loader,
                &ReadOptions::default(),
                options.whole_key_filtering,
                options.cache_filter_block,
                options.pin_filter_block,
                options.pin_filter_block,
            )
        } else {
            None
        };

        info!(
            "opened table: {} bytes, index {} bytes, filter {}",
            image.len(),
            index_block.size(),
            if filter.is_some() { "present" } else { "absent" }
        );

        Ok(Self {
            rep: Arc::new(Rep {
                image,
                footer,
                index_block,
                filter,
                prefix_extractor: options.prefix_extractor()?,
            }),
        })
    }

    pub fn footer(&self) -> &Footer {
        &self.rep.footer
    }

    pub fn filter(&self) -> Option<&FullFilterBlockReader> {
        self.rep.filter.as_ref()
    }

    pub fn new_iterator(&self, read_options: ReadOptions) -> Box<dyn InternalIterator> {
        let rep = Arc::clone(&self.rep);
        let state = move |handle: &BlockHandle| -> Option<Box<dyn InternalIterator>> {
            rep.block_iterator(handle, &read_options)
        };
        new_two_level_iterator(Box::new(state), Box::new(self.rep.index_block.iter()))
    }

    /// whole key filtering 打开时查 whole key，否则在 domain 内时查 prefix
    fn full_filter_key_may_match(&self, key: &[u8], read_options: &ReadOptions) -> bool {
        let Some(filter) = &self.rep.filter else {
            return true;
        };
        if filter.whole_key_filtering() {
            return filter.key_may_match(key, read_options);
        }
        match &self.rep.prefix_extractor {
            Some(p) if p.in_domain(key) => filter.prefix_may_match(p.transform(key), read_options),
            _ => true,
        }
    }

    /// key 所在的 prefix 是否可能出现在这个 table 里
    pub fn prefix_may_match(&self, key: &[u8], read_options: &ReadOptions) -> bool {
        let (Some(filter), Some(p)) = (&self.rep.filter, &self.rep.prefix_extractor) else {
            return true;
        };
        if !p.in_domain(key) {
            return true;
        }
        filter.prefix_may_match(p.transform(key), read_options)
    }

    pub fn get(&self, key: &[u8], read_options: &ReadOptions) -> Result<Option<Vec<u8>>, DBError> {
        if !self.full_filter_key_may_match(key, read_options) {
            return Ok(None);
        }

        let mut iter = self.new_iterator(*read_options);
        iter.seek(key);
        iter.status()?;
        if iter.valid() && iter.key() == key {
            return Ok(Some(iter.value().to_vec()));
        }
        Ok(None)
    }

    /// 批量点查，结果和 keys 一一对应
    pub fn multi_get(&self, keys: &[&[u8]], read_options: &ReadOptions) -> Result<Vec<Option<Vec<u8>>>, DBError> {
        let mut range = MultiGetRange::new(keys);
        if let Some(filter) = &self.rep.filter {
            if filter.whole_key_filtering() {
                filter.keys_may_match(&mut range, read_options);
            } else if let Some(p) = &self.rep.prefix_extractor {
                filter.prefixes_may_match(&mut range, p.as_ref(), read_options);
            }
        }
        debug!("multi_get: {} of {} keys left after filter", range.num_remaining(), range.len());

        let mut results = vec![None; range.len()];
        let mut iter = self.new_iterator(*read_options);
        for (i, key) in range.iter() {
            iter.seek(key);
            iter.status()?;
            if iter.valid() && iter.key() == key {
                results[i] = Some(iter.value().to_vec());
            }
        }
        Ok(results)
    }

    pub fn approximate_memory_usage(&self) -> usize {
        let filter_usage = self
            .rep
            .filter
            .as_ref()
            .map_or(0, |f| f.approximate_memory_usage());
        self.rep.index_block.size() + filter_usage
    }
}
