use std::borrow::Borrow;
use crate::engine::sst::iterator::InternalIterator;

/// 内存里一组有序 (key, value) 的 iterator
///
/// 构造时按 key 排序。`VecIterator<[u8]>` 存 `Vec<u8>`，`VecIterator<IndexValue>` 直接存 IndexValue。
pub struct VecIterator<V: ?Sized + ToOwned = [u8]> {
    entries: Vec<(Vec<u8>, V::Owned)>,
    index: Option<usize>,
}

impl<V: ?Sized + ToOwned> VecIterator<V> {
    pub fn new(mut entries: Vec<(Vec<u8>, V::Owned)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries, index: None }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&mut self, idx: usize) {
        self.index = (idx < self.entries.len()).then_some(idx);
    }
}

impl<V: ?Sized + ToOwned> InternalIterator<V> for VecIterator<V> {
    fn valid(&self) -> bool {
        self.index.is_some()
    }

    fn seek_to_first(&mut self) {
        self.position(0);
    }

    fn seek_to_last(&mut self) {
        self.index = self.entries.len().checked_sub(1);
    }

    fn seek(&mut self, target: &[u8]) {
        let idx = self.entries.partition_point(|(k, _)| k.as_slice() < target);
        self.position(idx);
    }

    fn seek_for_prev(&mut self, target: &[u8]) {
        let idx = self.entries.partition_point(|(k, _)| k.as_slice() <= target);
        self.index = idx.checked_sub(1);
    }

    fn next(&mut self) {
        debug_assert!(self.valid());
        if let Some(i) = self.index {
            self.position(i + 1);
        }
    }

    fn prev(&mut self) {
        debug_assert!(self.valid());
        self.index = self.index.and_then(|i| i.checked_sub(1));
    }

    fn key(&self) -> &[u8] {
        let i = self.index.expect("invalid VecIterator.key()");
        &self.entries[i].0
    }

    fn value(&self) -> &V {
        let i = self.index.expect("invalid VecIterator.value()");
        self.entries[i].1.borrow()
    }
}
