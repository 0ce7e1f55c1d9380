use std::sync::Arc;
use crate::DBError;
use crate::engine::sst::block::DataBlock;
use crate::engine::sst::format::IndexValue;
use crate::engine::sst::iterator::{DataBlockIter, InternalIterator};

/// Index block iterator：包装一个 DataBlockIter，把 value 解码成 IndexValue
///
/// 解码失败时 iterator 变成 invalid，status 返回 Corruption（之后不再恢复）。
pub struct IndexBlockIter {
    inner: DataBlockIter,
    value: IndexValue,
    decode_status: Result<(), DBError>,
}

impl IndexBlockIter {
    pub fn new(block: Arc<DataBlock>) -> Self {
        Self {
            inner: DataBlockIter::new(block),
            value: IndexValue::default(),
            decode_status: Ok(()),
        }
    }

    fn update_value(&mut self) {
        if !self.inner.valid() || self.decode_status.is_err() {
            return;
        }
        match IndexValue::decode_from_bytes(self.inner.value()) {
            Ok(v) => self.value = v,
            Err(e) => self.decode_status = Err(e),
        }
    }
}

impl InternalIterator<IndexValue> for IndexBlockIter {
    fn valid(&self) -> bool {
        self.inner.valid() && self.decode_status.is_ok()
    }

    fn seek_to_first(&mut self) {
        self.inner.seek_to_first();
        self.update_value();
    }

    fn seek_to_last(&mut self) {
        self.inner.seek_to_last();
        self.update_value();
    }

    fn seek(&mut self, target: &[u8]) {
        self.inner.seek(target);
        self.update_value();
    }

    fn seek_for_prev(&mut self, target: &[u8]) {
        self.inner.seek_for_prev(target);
        self.update_value();
    }

    fn next(&mut self) {
        debug_assert!(self.valid());
        self.inner.next();
        self.update_value();
    }

    fn prev(&mut self) {
        debug_assert!(self.valid());
        self.inner.prev();
        self.update_value();
    }

    fn key(&self) -> &[u8] {
        self.inner.key()
    }

    fn value(&self) -> &IndexValue {
        assert!(self.valid(), "IndexBlockIter::value() on invalid iterator");
        &self.value
    }

    fn status(&self) -> Result<(), DBError> {
        self.inner.status()?;
        self.decode_status.clone()
    }
}
