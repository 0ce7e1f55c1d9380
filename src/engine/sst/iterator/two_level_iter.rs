use log::warn;
use crate::DBError;
use crate::engine::sst::format::{BlockHandle, IndexValue};
use crate::engine::sst::iterator::InternalIterator;

/// 根据 index entry 里的 BlockHandle 打开对应 block 的 iterator
///
/// 返回 None 表示该 handle 对应的 block 不存在（上层记为 Corruption）。
/// 读 block 出错时应返回一个带错误 status 的 iterator。
pub trait TwoLevelIteratorState<'a, V: ?Sized = [u8]> {
    fn new_secondary_iterator(&mut self, handle: &BlockHandle) -> Option<Box<dyn InternalIterator<V> + 'a>>;
}

impl<'a, V: ?Sized, F> TwoLevelIteratorState<'a, V> for F
where
    F: FnMut(&BlockHandle) -> Option<Box<dyn InternalIterator<V> + 'a>>,
{
    fn new_secondary_iterator(&mut self, handle: &BlockHandle) -> Option<Box<dyn InternalIterator<V> + 'a>> {
        self(handle)
    }
}

/// TwoLevelIterator：
///   first level：index iterator，value 是指向 block 的 IndexValue
///   second level：当前 block 内的 iterator
pub struct TwoLevelIterator<'a, V: ?Sized = [u8]> {
    first_level_iter: Box<dyn InternalIterator<IndexValue> + 'a>,
    /// 必须先于 state 释放
    second_level_iter: Option<Box<dyn InternalIterator<V> + 'a>>,
    state: Box<dyn TwoLevelIteratorState<'a, V> + 'a>,
    /// 最近一次 missing block 的 Corruption
    saved_status: Result<(), DBError>,
    /// second_level_iter 对应的 handle
    data_block_handle: BlockHandle,
}

pub fn new_two_level_iterator<'a, V: ?Sized + 'a>(
    state: Box<dyn TwoLevelIteratorState<'a, V> + 'a>,
    first_level_iter: Box<dyn InternalIterator<IndexValue> + 'a>,
) -> Box<dyn InternalIterator<V> + 'a> {
    Box::new(TwoLevelIterator::new(state, first_level_iter))
}

impl<'a, V: ?Sized> TwoLevelIterator<'a, V> {
    pub fn new(
        state: Box<dyn TwoLevelIteratorState<'a, V> + 'a>,
        first_level_iter: Box<dyn InternalIterator<IndexValue> + 'a>,
    ) -> Self {
        Self {
            first_level_iter,
            second_level_iter: None,
            state,
            saved_status: Ok(()),
            data_block_handle: BlockHandle::default(),
        }
    }

    fn set_second_level_iterator(&mut self, iter: Option<Box<dyn InternalIterator<V> + 'a>>) {
        self.second_level_iter = iter;
    }

    /// 让 second level 对应 first level 当前指向的 block
    fn init_data_block(&mut self) {
        if !self.first_level_iter.valid() {
            self.set_second_level_iterator(None);
            return;
        }

        let handle = self.first_level_iter.value().handle;
        if let Some(second) = &self.second_level_iter {
            let incomplete = second.status().is_err_and(|e| e.is_incomplete());
            if !incomplete && handle.offset == self.data_block_handle.offset {
                // 还是同一个 block，直接复用
                return;
            }
        }

        let iter = self.state.new_secondary_iterator(&handle);
        self.data_block_handle = handle;
        if iter.is_none() {
            warn!("missing block for partition {handle}");
            self.saved_status = Err(DBError::Corruption(format!("Missing block for partition {handle}")));
        }
        self.set_second_level_iterator(iter);
    }

    /// second level 为空或走完时，往后找下一个有数据的 block
    fn skip_empty_data_blocks_forward(&mut self) {
        while self
            .second_level_iter
            .as_ref()
            .is_none_or(|s| !s.valid() && s.status().is_ok())
        {
            if !self.first_level_iter.valid() {
                self.set_second_level_iterator(None);
                return;
            }
            self.first_level_iter.next();
            self.init_data_block();
            if let Some(second) = self.second_level_iter.as_mut() {
                second.seek_to_first();
            }
        }
    }

    fn skip_empty_data_blocks_backward(&mut self) {
        while self
            .second_level_iter
            .as_ref()
            .is_none_or(|s| !s.valid() && s.status().is_ok())
        {
            if !self.first_level_iter.valid() {
                self.set_second_level_iterator(None);
                return;
            }
            self.first_level_iter.prev();
            self.init_data_block();
            if let Some(second) = self.second_level_iter.as_mut() {
                second.seek_to_last();
            }
        }
    }

    fn second(&self) -> &dyn InternalIterator<V> {
        self.second_level_iter
            .as_deref()
            .expect("TwoLevelIterator accessed while invalid")
    }
}

impl<'a, V: ?Sized> InternalIterator<V> for TwoLevelIterator<'a, V> {
    fn valid(&self) -> bool {
        self.second_level_iter.as_ref().is_some_and(|s| s.valid())
    }

    fn seek_to_first(&mut self) {
        self.first_level_iter.seek_to_first();
        self.init_data_block();
        if let Some(second) = self.second_level_iter.as_mut() {
            second.seek_to_first();
        }
        self.skip_empty_data_blocks_forward();
    }

    fn seek_to_last(&mut self) {
        self.first_level_iter.seek_to_last();
        self.init_data_block();
        if let Some(second) = self.second_level_iter.as_mut() {
            second.seek_to_last();
        }
        self.skip_empty_data_blocks_backward();
    }

    fn seek(&mut self, target: &[u8]) {
        self.first_level_iter.seek(target);
        self.init_data_block();
        if let Some(second) = self.second_level_iter.as_mut() {
            second.seek(target);
        }
        self.skip_empty_data_blocks_forward();
    }

    fn seek_for_prev(&mut self, target: &[u8]) {
        self.first_level_iter.seek(target);
        self.init_data_block();
        if let Some(second) = self.second_level_iter.as_mut() {
            second.seek_for_prev(target);
        }
        if !self.valid() {
            // target 比所有 block 的 largest key 都大，从最后一个 block 往回找
            if !self.first_level_iter.valid() && self.first_level_iter.status().is_ok() {
                self.first_level_iter.seek_to_last();
                self.init_data_block();
                if let Some(second) = self.second_level_iter.as_mut() {
                    second.seek_for_prev(target);
                }
            }
            self.skip_empty_data_blocks_backward();
        }
    }

    fn next(&mut self) {
        debug_assert!(self.valid());
        if let Some(second) = self.second_level_iter.as_mut() {
            second.next();
        }
        self.skip_empty_data_blocks_forward();
    }

    fn prev(&mut self) {
        debug_assert!(self.valid());
        if let Some(second) = self.second_level_iter.as_mut() {
            second.prev();
        }
        self.skip_empty_data_blocks_backward();
    }

    fn key(&self) -> &[u8] {
        debug_assert!(self.valid());
        self.second().key()
    }

    fn user_key(&self) -> &[u8] {
        debug_assert!(self.valid());
        self.second().user_key()
    }

    fn value(&self) -> &V {
        debug_assert!(self.valid());
        self.second().value()
    }

    /// first level 的错误优先，其次是 second level，最后是 saved_status
    fn status(&self) -> Result<(), DBError> {
        self.first_level_iter.status()?;
        if let Some(second) = &self.second_level_iter {
            second.status()?;
        }
        self.saved_status.clone()
    }

    fn is_key_pinned(&self) -> bool {
        false
    }

    fn is_value_pinned(&self) -> bool {
        false
    }
}
