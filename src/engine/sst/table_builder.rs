use log::info;
use crate::DBError;
use crate::engine::sst::block::{BlockBuilder, FullFilterBlockBuilder, IndexBlockBuilder};
use crate::engine::sst::format::{append_block_with_trailer, BlockHandle, Footer, IndexValue};
use crate::util::TableOptions;

/// 把有序的 (key, value) 写成一个 table image
///
/// 布局：data blocks | full filter block | index block | footer，
/// 每个 block 后面跟 5 bytes trailer。
pub struct TableBuilder {
    block_size: usize,
    image: Vec<u8>,

    data_block: BlockBuilder,
    index_block: IndexBlockBuilder,
    filter_builder: FullFilterBlockBuilder,

    last_key: Vec<u8>,
    num_entries: u64,
    num_data_blocks: u64,
}

impl TableBuilder {
    pub fn new(options: &TableOptions) -> Result<Self, DBError> {
        options.validate()?;
        Ok(Self {
            block_size: options.block_size,
            image: Vec::new(),
            data_block: BlockBuilder::new(options.block_restart_interval),
            index_block: IndexBlockBuilder::new(1),
            filter_builder: FullFilterBlockBuilder::from_options(options)?,
            last_key: Vec::new(),
            num_entries: 0,
            num_data_blocks: 0,
        })
    }

    /// key 必须严格递增
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<(), DBError> {
        if self.num_entries > 0 && key <= self.last_key.as_slice() {
            return Err(DBError::InvalidArgument(format!(
                "keys added out of order: {:?} after {:?}",
                String::from_utf8_lossy(key),
                String::from_utf8_lossy(&self.last_key)
            )));
        }

        self.filter_builder.add(key);
        self.data_block.add(key, value);
        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.num_entries += 1;

        if self.data_block.current_size_estimate() >= self.block_size {
            self.flush_data_block();
        }
        Ok(())
    }

    /// 写出当前 data block，index entry 的 key 用 block 内最后一个 key
    pub fn flush_data_block(&mut self) {
        if self.data_block.is_empty() {
            return;
        }
        let raw = self.data_block.finish();
        let handle = append_block_with_trailer(&mut self.image, &raw);
        self.data_block.reset();

        self.index_block.add(&self.last_key, IndexValue::new(handle));
        self.num_data_blocks += 1;
    }

    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    pub fn file_size(&self) -> usize {
        self.image.len()
    }

    pub fn finish(mut self) -> Result<Vec<u8>, DBError> {
        self.flush_data_block();

        let filter_contents = self.filter_builder.finish(&BlockHandle::default(), None)?;
        let filter_handle = if filter_contents.is_empty() {
            BlockHandle::default()
        } else {
            append_block_with_trailer(&mut self.image, filter_contents)
        };

        let index_raw = self.index_block.finish();
        let index_handle = append_block_with_trailer(&mut self.image, &index_raw);

        let footer = Footer {
            filter_handle,
            index_handle,
        };
        self.image.extend_from_slice(&footer.encode());

        info!(
            "table finished: {} entries, {} data blocks, filter {} bytes, {} bytes total",
            self.num_entries,
            self.num_data_blocks,
            filter_handle.size,
            self.image.len()
        );
        Ok(self.image)
    }
}
