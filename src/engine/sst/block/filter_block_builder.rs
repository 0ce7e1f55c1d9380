use std::sync::Arc;
use crate::DBError;
use crate::engine::sst::block::{FilterBitsBuilder, SliceTransform};
use crate::engine::sst::format::BlockHandle;
use crate::util::TableOptions;

/// 一个 filter partition 的去重状态
///
/// `last_key_in_domain` / `last_whole_key` / `last_prefix` 跨 partition 保留，
/// 两个 `*_recorded` 标记在 reset 时清掉。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterPartitionState {
    whole_key_filtering: bool,
    /// whole key 和 prefix 同时写入同一个 filter 时才为 true
    need_last_prefix: bool,

    last_whole_key: Vec<u8>,
    last_whole_key_recorded: bool,
    last_prefix: Vec<u8>,
    last_prefix_recorded: bool,

    last_key_in_domain: bool,
    any_added: bool,
}

impl FilterPartitionState {
    fn new(whole_key_filtering: bool, has_prefix_extractor: bool) -> Self {
        Self {
            whole_key_filtering,
            need_last_prefix: whole_key_filtering && has_prefix_extractor,
            ..Self::default()
        }
    }

    fn reset(&mut self) {
        self.last_whole_key_recorded = false;
        self.last_prefix_recorded = false;
    }

    pub fn whole_key_filtering(&self) -> bool {
        self.whole_key_filtering
    }

    pub fn need_last_prefix(&self) -> bool {
        self.need_last_prefix
    }

    pub fn last_whole_key_recorded(&self) -> bool {
        self.last_whole_key_recorded
    }

    pub fn last_prefix_recorded(&self) -> bool {
        self.last_prefix_recorded
    }

    pub fn last_key_in_domain(&self) -> bool {
        self.last_key_in_domain
    }

    pub fn any_added(&self) -> bool {
        self.any_added
    }
}

/// 为整个 table（或 partitioned filter 的一个 partition）构建 full filter
///
/// key 必须按 user key 升序加入（timestamp 已去掉）。
pub struct FullFilterBlockBuilder {
    prefix_extractor: Option<Arc<dyn SliceTransform>>,
    filter_bits_builder: Box<dyn FilterBitsBuilder>,
    state: FilterPartitionState,
    /// 没有外部 owner 时，finish 的结果放在这里
    filter_data: Vec<u8>,
}

impl FullFilterBlockBuilder {
    pub fn new(
        prefix_extractor: Option<Arc<dyn SliceTransform>>,
        whole_key_filtering: bool,
        filter_bits_builder: Box<dyn FilterBitsBuilder>,
    ) -> Self {
        let state = FilterPartitionState::new(whole_key_filtering, prefix_extractor.is_some());
        Self {
            prefix_extractor,
            filter_bits_builder,
            state,
            filter_data: Vec::new(),
        }
    }

    pub fn from_options(opts: &TableOptions) -> Result<Self, DBError> {
        Ok(Self::new(
            opts.prefix_extractor()?,
            opts.whole_key_filtering,
            opts.filter_policy().new_builder(),
        ))
    }

    pub fn state(&self) -> &FilterPartitionState {
        &self.state
    }

    pub fn is_empty(&self) -> bool {
        !self.state.any_added
    }

    pub fn estimate_entries_added(&self) -> usize {
        self.filter_bits_builder.estimate_entries_added()
    }

    pub fn add(&mut self, key_without_ts: &[u8]) {
        let prefix = match &self.prefix_extractor {
            Some(p) if p.in_domain(key_without_ts) => Some(p.transform(key_without_ts)),
            _ => None,
        };
        let add_prefix = prefix.is_some();

        if self.state.need_last_prefix && !self.state.last_prefix_recorded && self.state.last_key_in_domain {
            // 新 partition 的第一个 key：上一个 partition 的最后一个 prefix
            // 必须也出现在这个 partition 里，prefix SeekForPrev 才正确
            let last_prefix = std::mem::take(&mut self.state.last_prefix);
            self.add_key(&last_prefix);
            self.state.last_prefix = last_prefix;
            self.state.last_prefix_recorded = true;
        }

        if self.state.whole_key_filtering {
            if !add_prefix {
                self.add_key(key_without_ts);
            } else if !self.state.last_whole_key_recorded
                || self.state.last_whole_key.as_slice() != key_without_ts
            {
                // whole key 和 prefix 交替写入，bits builder 的相邻去重失效，这里自己去重
                self.add_key(key_without_ts);
                self.state.last_whole_key_recorded = true;
                self.state.last_whole_key.clear();
                self.state.last_whole_key.extend_from_slice(key_without_ts);
            }
        }

        match prefix {
            Some(prefix) => {
                self.state.last_key_in_domain = true;
                self.add_prefix(prefix);
            }
            None => self.state.last_key_in_domain = false,
        }
    }

    fn add_prefix(&mut self, prefix: &[u8]) {
        if self.state.need_last_prefix {
            if !self.state.last_prefix_recorded || self.state.last_prefix.as_slice() != prefix {
                self.add_key(prefix);
                self.state.last_prefix_recorded = true;
                self.state.last_prefix.clear();
                self.state.last_prefix.extend_from_slice(prefix);
            }
        } else {
            // 只有 prefix 写入，相邻去重交给 bits builder
            self.add_key(prefix);
        }
    }

    fn add_key(&mut self, key: &[u8]) {
        self.filter_bits_builder.add_key(key);
        self.state.any_added = true;
    }

    /// 开始一个新的 partition
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// 输出当前 partition 的 filter。
    ///
    /// `filter_owner` 不为 None 时结果写进调用方的 buffer，否则留在 builder 内部。
    /// 没有任何 key 时返回空 slice。
    pub fn finish<'s>(
        &'s mut self,
        _last_partition_block_handle: &BlockHandle,
        filter_owner: Option<&'s mut Vec<u8>>,
    ) -> Result<&'s [u8], DBError> {
        self.reset();
        if !self.state.any_added {
            return Ok(&[]);
        }
        self.state.any_added = false;

        let data = self.filter_bits_builder.finish()?;
        log::debug!("full filter partition finished: {} bytes", data.len());

        match filter_owner {
            Some(owner) => {
                *owner = data;
                let owner: &'s Vec<u8> = owner;
                Ok(owner.as_slice())
            }
            None => {
                self.filter_data = data;
                Ok(&self.filter_data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::engine::sst::block::{BloomFilterPolicy, FilterPolicy, FixedPrefixTransform};

    /// 记录每一次 add_key，finish 时把记录交出来
    pub(crate) struct RecordingBitsBuilder {
        pub(crate) added: Arc<Mutex<Vec<Vec<u8>>>>,
        pending: usize,
        fail_finish: bool,
    }

    impl RecordingBitsBuilder {
        pub(crate) fn new() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
            let added = Arc::new(Mutex::new(Vec::new()));
            let b = Self { added: Arc::clone(&added), pending: 0, fail_finish: false };
            (b, added)
        }
    }

    impl FilterBitsBuilder for RecordingBitsBuilder {
        fn add_key(&mut self, key: &[u8]) {
            self.added.lock().unwrap().push(key.to_vec());
            self.pending += 1;
        }

        fn finish(&mut self) -> Result<Vec<u8>, DBError> {
            if self.fail_finish {
                return Err(DBError::InvalidArgument("filter too large".into()));
            }
            let n = std::mem::take(&mut self.pending);
            Ok(vec![n as u8])
        }

        fn estimate_entries_added(&self) -> usize {
            self.pending
        }
    }

    fn recording_builder(whole_key: bool, prefix_len: Option<usize>) -> (FullFilterBlockBuilder, Arc<Mutex<Vec<Vec<u8>>>>) {
        let (bits, added) = RecordingBitsBuilder::new();
        let extractor = prefix_len.map(|n| Arc::new(FixedPrefixTransform::new(n)) as Arc<dyn SliceTransform>);
        (FullFilterBlockBuilder::new(extractor, whole_key, Box::new(bits)), added)
    }

    fn drain(added: &Arc<Mutex<Vec<Vec<u8>>>>) -> Vec<String> {
        added
            .lock()
            .unwrap()
            .drain(..)
            .map(|k| String::from_utf8(k).unwrap())
            .collect()
    }

    #[test]
    fn test_finish_without_keys_is_empty_ok() {
        let (mut b, _) = recording_builder(true, None);
        assert!(b.is_empty());
        let filter = b.finish(&BlockHandle::default(), None).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_whole_key_only_adds_every_key() {
        let (mut b, added) = recording_builder(true, None);
        b.add(b"a");
        b.add(b"b");
        assert!(!b.state().need_last_prefix());
        assert_eq!(drain(&added), vec!["a", "b"]);
        assert_eq!(b.finish(&BlockHandle::default(), None).unwrap(), &[2u8]);
    }

    #[test]
    fn test_interleaved_duplicates_recorded_once() {
        let (mut b, added) = recording_builder(true, Some(3));
        b.add(b"abc1");
        b.add(b"abc1");
        b.add(b"abc2");
        assert_eq!(drain(&added), vec!["abc1", "abc", "abc2"]);
        assert_eq!(b.estimate_entries_added(), 3);
    }

    #[test]
    fn test_prefix_only_delegates_dedup() {
        let (mut b, added) = recording_builder(false, Some(3));
        assert!(!b.state().need_last_prefix());
        b.add(b"abc1");
        b.add(b"abc2");
        b.add(b"ab"); // 不在 domain 内
        assert_eq!(drain(&added), vec!["abc", "abc"]);
        assert!(!b.state().last_key_in_domain());
    }

    #[test]
    fn test_bloom_estimate_bounds_with_duplicates() {
        let policy = BloomFilterPolicy::new(10);
        let extractor: Arc<dyn SliceTransform> = Arc::new(FixedPrefixTransform::new(3));
        let mut b = FullFilterBlockBuilder::new(Some(extractor), true, policy.new_builder());
        b.add(b"abc1");
        b.add(b"abc1");
        // 如果不去重，bits builder 会看到 abc1, abc, abc1, abc 共 4 个
        assert_eq!(b.estimate_entries_added(), 2);
    }

    #[test]
    fn test_partition_boundary_flushes_last_prefix() {
        let (mut b, added) = recording_builder(true, Some(3));
        b.add(b"abc1");
        b.add(b"abd2");
        assert_eq!(drain(&added), vec!["abc1", "abc", "abd2", "abd"]);
        b.finish(&BlockHandle::default(), None).unwrap();

        assert!(!b.state().last_prefix_recorded());
        assert!(!b.state().last_whole_key_recorded());
        assert!(b.state().last_key_in_domain());

        b.add(b"abe3");
        assert_eq!(drain(&added), vec!["abd", "abe3", "abe"]);
    }

    #[test]
    fn test_no_boundary_flush_when_last_key_out_of_domain() {
        let (mut b, added) = recording_builder(true, Some(3));
        b.add(b"aa11");
        b.add(b"ab");
        assert!(!b.state().last_key_in_domain());
        b.finish(&BlockHandle::default(), None).unwrap();
        drain(&added);

        b.add(b"abz");
        assert_eq!(drain(&added), vec!["abz", "abz"]);
    }

    #[test]
    fn test_dedup_state_reset_across_partitions() {
        let (mut b, added) = recording_builder(true, Some(3));
        b.add(b"abc1");
        b.finish(&BlockHandle::default(), None).unwrap();
        drain(&added);

        // 同一个 key 在新 partition 必须重新写入；prefix 已被 boundary flush 记录
        b.add(b"abc1");
        assert_eq!(drain(&added), vec!["abc", "abc1"]);
    }

    #[test]
    fn test_finish_into_owner_buffer() {
        let (mut b, _) = recording_builder(true, None);
        b.add(b"k1");
        let mut owner = Vec::new();
        let len = b.finish(&BlockHandle::default(), Some(&mut owner)).unwrap().len();
        assert_eq!(len, 1);
        assert_eq!(owner, vec![1u8]);
        assert!(b.is_empty());
    }

    #[test]
    fn test_finish_error_propagates_and_resets() {
        let (mut bits, _) = RecordingBitsBuilder::new();
        bits.fail_finish = true;
        let mut b = FullFilterBlockBuilder::new(None, true, Box::new(bits));
        b.add(b"k1");
        let err = b.finish(&BlockHandle::default(), None).unwrap_err();
        assert!(matches!(err, DBError::InvalidArgument(_)));
        assert!(b.is_empty());
    }
}
