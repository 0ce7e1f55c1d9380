use std::sync::Arc;
use bytes::Bytes;
use crate::DBError;
use crate::engine::sst::block::{BlockBuilder, DataBlock};
use crate::engine::sst::format::IndexValue;
use crate::engine::sst::iterator::IndexBlockIter;

/// 读 SST 时的 IndexBlock
///
/// 约定：index entry key 是对应 data block 的 largest key，value 是编码后的 BlockHandle
pub struct IndexBlock {
    block: Arc<DataBlock>,
}

impl IndexBlock {
    pub fn from_bytes(bytes: Bytes) -> Result<Self, DBError> {
        Ok(Self {
            block: Arc::new(DataBlock::from_bytes(bytes)?),
        })
    }

    pub fn size(&self) -> usize {
        self.block.size()
    }

    pub fn iter(&self) -> IndexBlockIter {
        IndexBlockIter::new(Arc::clone(&self.block))
    }
}

/// 写 SST 时构建 index block
pub struct IndexBlockBuilder {
    builder: BlockBuilder,
}

impl IndexBlockBuilder {
    pub fn new(restart_interval: usize) -> Self {
        Self {
            builder: BlockBuilder::new(restart_interval),
        }
    }

    /// 添加：largest_key -> BlockHandle
    pub fn add(&mut self, largest_key_in_data_block: &[u8], value: IndexValue) {
        let mut v = Vec::with_capacity(20);
        value.handle.encode_to(&mut v);
        self.builder.add(largest_key_in_data_block, &v);
    }

    pub fn finish(&mut self) -> Vec<u8> {
        self.builder.finish()
    }

    pub fn is_empty(&self) -> bool {
        self.builder.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sst::format::BlockHandle;
    use crate::engine::sst::iterator::InternalIterator;

    fn build_index(entries: &[(&str, u64)]) -> IndexBlock {
        let mut b = IndexBlockBuilder::new(1);
        for (k, off) in entries {
            b.add(k.as_bytes(), IndexValue::new(BlockHandle::new(*off, 10)));
        }
        IndexBlock::from_bytes(Bytes::from(b.finish())).unwrap()
    }

    /// 第一个 largest_key >= target 的 block
    fn seek_handle(idx: &IndexBlock, target: &[u8]) -> Option<BlockHandle> {
        let mut iter = idx.iter();
        iter.seek(target);
        iter.valid().then(|| iter.value().handle)
    }

    #[test]
    fn test_seek_picks_covering_block() {
        let idx = build_index(&[("b", 0), ("d", 15), ("f", 30)]);
        assert_eq!(seek_handle(&idx, b"a"), Some(BlockHandle::new(0, 10)));
        assert_eq!(seek_handle(&idx, b"b"), Some(BlockHandle::new(0, 10)));
        assert_eq!(seek_handle(&idx, b"c"), Some(BlockHandle::new(15, 10)));
        assert_eq!(seek_handle(&idx, b"f"), Some(BlockHandle::new(30, 10)));
        assert_eq!(seek_handle(&idx, b"g"), None);
    }

    #[test]
    fn test_bad_handle_surfaces_corruption() {
        let mut b = BlockBuilder::new(1);
        b.add(b"k", &[0x80]); // 截断的 varint
        let idx = IndexBlock::from_bytes(Bytes::from(b.finish())).unwrap();
        let mut iter = idx.iter();
        iter.seek(b"a");
        assert!(!iter.valid());
        assert!(matches!(iter.status(), Err(e) if e.is_corruption()));
    }
}
