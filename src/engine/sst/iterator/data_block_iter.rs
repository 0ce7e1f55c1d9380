use std::ops::Range;
use std::sync::Arc;
use crate::DBError;
use crate::engine::sst::block::DataBlock;
use crate::engine::sst::format::get_varint32;
use crate::engine::sst::iterator::InternalIterator;

/// DataBlock 内部迭代器（prefix 解码 + 双向移动 + seek）
///
/// 当前 entry 的 offset 等于 restarts_start 时表示 invalid。
pub struct DataBlockIter {
    block: Arc<DataBlock>,
    /// 当前 entry 在 data 中的偏移
    current: usize,
    /// 下一个 entry 的偏移
    next_offset: usize,
    /// current 所在的 restart 区间
    restart_index: usize,
    /// 当前完整 key
    key_buf: Vec<u8>,
    /// 当前 value 在 data 中的范围
    value_range: Range<usize>,
    status: Result<(), DBError>,
}

/// 返回 (shared, non_shared, value_len, key_delta 起始位置)
fn decode_entry(data: &[u8], mut pos: usize, limit: usize) -> Option<(usize, usize, usize, usize)> {
    let src = &data[..limit];
    let shared = get_varint32(src, &mut pos)? as usize;
    let non_shared = get_varint32(src, &mut pos)? as usize;
    let value_len = get_varint32(src, &mut pos)? as usize;
    let end = pos.checked_add(non_shared)?.checked_add(value_len)?;
    if end > limit {
        return None;
    }
    Some((shared, non_shared, value_len, pos))
}

impl DataBlockIter {
    pub fn new(block: Arc<DataBlock>) -> Self {
        let restarts_start = block.restarts_start;
        let num_restarts = block.num_restarts();
        Self {
            block,
            current: restarts_start,
            next_offset: 0,
            restart_index: num_restarts,
            key_buf: Vec::new(),
            value_range: 0..0,
            status: Ok(()),
        }
    }

    fn restart_point(&self, idx: usize) -> usize {
        self.block.restart_offsets[idx] as usize
    }

    fn seek_to_restart_point(&mut self, idx: usize) {
        self.key_buf.clear();
        self.restart_index = idx;
        self.next_offset = self.restart_point(idx);
    }

    /// restart 处的 entry 总是 shared == 0，key 可以直接切出来
    fn restart_key(&self, idx: usize) -> Option<&[u8]> {
        let data = &self.block.data;
        match decode_entry(data, self.restart_point(idx), self.block.restarts_start)? {
            (0, non_shared, _, key_start) => Some(&data[key_start..key_start + non_shared]),
            _ => None,
        }
    }

    fn mark_invalid(&mut self) {
        self.current = self.block.restarts_start;
        self.restart_index = self.block.num_restarts();
    }

    fn corruption_error(&mut self) {
        self.mark_invalid();
        self.status = Err(DBError::Corruption("bad entry in block".into()));
        self.key_buf.clear();
        self.value_range = 0..0;
    }

    /// 解析 next_offset 处的 entry；没有更多 entry 或解析失败时返回 false
    fn parse_next_key(&mut self) -> bool {
        self.current = self.next_offset;
        let limit = self.block.restarts_start;
        if self.current >= limit {
            self.mark_invalid();
            return false;
        }

        let Some((shared, non_shared, value_len, key_start)) =
            decode_entry(&self.block.data, self.current, limit)
        else {
            self.corruption_error();
            return false;
        };
        if shared > self.key_buf.len() {
            self.corruption_error();
            return false;
        }

        self.key_buf.truncate(shared);
        self.key_buf
            .extend_from_slice(&self.block.data[key_start..key_start + non_shared]);
        let value_start = key_start + non_shared;
        self.value_range = value_start..value_start + value_len;
        self.next_offset = value_start + value_len;

        while self.restart_index + 1 < self.block.num_restarts()
            && self.restart_point(self.restart_index + 1) < self.current
        {
            self.restart_index += 1;
        }
        true
    }
}

impl InternalIterator for DataBlockIter {
    fn valid(&self) -> bool {
        self.current < self.block.restarts_start
    }

    fn seek_to_first(&mut self) {
        self.seek_to_restart_point(0);
        self.parse_next_key();
    }

    fn seek_to_last(&mut self) {
        self.seek_to_restart_point(self.block.num_restarts() - 1);
        while self.parse_next_key() && self.next_offset < self.block.restarts_start {}
    }

    fn seek(&mut self, target: &[u8]) {
        // 二分 restart 数组：找最后一个 key < target 的 restart 区间
        let mut left = 0usize;
        let mut right = self.block.num_restarts() - 1;
        while left < right {
            let mid = (left + right + 1) / 2;
            let Some(mid_key) = self.restart_key(mid) else {
                self.corruption_error();
                return;
            };
            if mid_key < target {
                left = mid;
            } else {
                right = mid - 1;
            }
        }

        // 从 restart 线性 scan，找 >= target 的第一条
        self.seek_to_restart_point(left);
        while self.parse_next_key() {
            if self.key_buf.as_slice() >= target {
                return;
            }
        }
    }

    fn seek_for_prev(&mut self, target: &[u8]) {
        self.seek(target);
        if !self.valid() {
            if self.status.is_err() {
                return;
            }
            self.seek_to_last();
        }
        while self.valid() && self.key_buf.as_slice() > target {
            self.prev();
        }
    }

    fn next(&mut self) {
        debug_assert!(self.valid());
        self.parse_next_key();
    }

    fn prev(&mut self) {
        debug_assert!(self.valid());

        // 往回找一个在 current 之前开始的 restart 区间
        let original = self.current;
        while self.restart_point(self.restart_index) >= original {
            if self.restart_index == 0 {
                self.mark_invalid();
                return;
            }
            self.restart_index -= 1;
        }

        self.seek_to_restart_point(self.restart_index);
        while self.parse_next_key() && self.next_offset < original {}
    }

    fn key(&self) -> &[u8] {
        assert!(self.valid(), "DataBlockIter::key() on invalid iterator");
        &self.key_buf
    }

    fn value(&self) -> &[u8] {
        assert!(self.valid(), "DataBlockIter::value() on invalid iterator");
        &self.block.data[self.value_range.clone()]
    }

    fn status(&self) -> Result<(), DBError> {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use crate::engine::sst::block::BlockBuilder;

    fn block_of(keys: &[&str], restart_interval: usize) -> Arc<DataBlock> {
        let mut b = BlockBuilder::new(restart_interval);
        for k in keys {
            b.add(k.as_bytes(), format!("v_{k}").as_bytes());
        }
        Arc::new(DataBlock::from_bytes(Bytes::from(b.finish())).unwrap())
    }

    fn collect_forward(it: &mut DataBlockIter) -> Vec<String> {
        let mut out = Vec::new();
        it.seek_to_first();
        while it.valid() {
            out.push(String::from_utf8(it.key().to_vec()).unwrap());
            it.next();
        }
        out
    }

    const KEYS: [&str; 7] = ["apple", "apricot", "banana", "blue", "cherry", "citrus", "date"];

    #[test]
    fn test_forward_and_backward() {
        for interval in [1, 2, 3, 16] {
            let mut it = DataBlockIter::new(block_of(&KEYS, interval));
            assert_eq!(collect_forward(&mut it), KEYS.to_vec());

            let mut back = Vec::new();
            it.seek_to_last();
            while it.valid() {
                back.push(String::from_utf8(it.key().to_vec()).unwrap());
                it.prev();
            }
            let mut expected = KEYS.to_vec();
            expected.reverse();
            assert_eq!(back, expected, "restart interval {interval}");
            assert!(it.status().is_ok());
        }
    }

    #[test]
    fn test_seek_and_seek_for_prev() {
        let mut it = DataBlockIter::new(block_of(&KEYS, 2));

        it.seek(b"b");
        assert_eq!(it.key(), b"banana");
        assert_eq!(it.value(), b"v_banana");
        it.seek(b"cherry");
        assert_eq!(it.key(), b"cherry");
        it.seek(b"a");
        assert_eq!(it.key(), b"apple");
        it.seek(b"zzz");
        assert!(!it.valid());

        it.seek_for_prev(b"c");
        assert_eq!(it.key(), b"blue");
        it.seek_for_prev(b"date");
        assert_eq!(it.key(), b"date");
        it.seek_for_prev(b"zzz");
        assert_eq!(it.key(), b"date");
        it.seek_for_prev(b"a");
        assert!(!it.valid());
        assert!(it.status().is_ok());
    }

    #[test]
    fn test_prev_after_seek_mid_block() {
        let mut it = DataBlockIter::new(block_of(&KEYS, 3));
        it.seek(b"cherry");
        it.prev();
        assert_eq!(it.key(), b"blue");
        it.prev();
        assert_eq!(it.key(), b"banana");
        it.next();
        assert_eq!(it.key(), b"blue");
    }

    #[test]
    fn test_empty_block() {
        let mut it = DataBlockIter::new(block_of(&[], 16));
        it.seek_to_first();
        assert!(!it.valid());
        it.seek_to_last();
        assert!(!it.valid());
        it.seek(b"a");
        assert!(!it.valid());
        it.seek_for_prev(b"a");
        assert!(!it.valid());
        assert!(it.status().is_ok());
    }

    #[test]
    fn test_malformed_entry_sets_corruption() {
        // entry 区只有一个截断的 varint，restart 数组 [0]，num_restarts = 1
        let mut raw = vec![0x80u8];
        raw.extend_from_slice(&0u32.to_le_bytes());
        raw.extend_from_slice(&1u32.to_le_bytes());
        let block = Arc::new(DataBlock::from_bytes(Bytes::from(raw)).unwrap());

        let mut it = DataBlockIter::new(block);
        it.seek_to_first();
        assert!(!it.valid());
        assert!(it.status().unwrap_err().is_corruption());

        // seek_for_prev 不会在错误之后退回到最后一条
        it.seek_for_prev(b"x");
        assert!(!it.valid());
    }

    #[test]
    #[should_panic]
    fn test_key_on_invalid_panics() {
        let it = DataBlockIter::new(block_of(&["a"], 16));
        it.key();
    }
}
