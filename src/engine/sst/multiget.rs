/// 一批 MultiGet 的待查 key；被 filter 判定不存在的 key 通过 skip_key 标记掉
#[derive(Debug, Clone, Default)]
pub struct MultiGetRange {
    keys: Vec<Vec<u8>>,
    skipped: Vec<bool>,
}

impl MultiGetRange {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let keys: Vec<Vec<u8>> = keys.into_iter().map(|k| k.as_ref().to_vec()).collect();
        let skipped = vec![false; keys.len()];
        Self { keys, skipped }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, i: usize) -> &[u8] {
        &self.keys[i]
    }

    /// 还没被 skip 的 (下标, user key)，保持原始顺序
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[u8])> + '_ {
        self.keys
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.skipped[*i])
            .map(|(i, k)| (i, k.as_slice()))
    }

    pub fn skip_key(&mut self, i: usize) {
        self.skipped[i] = true;
    }

    pub fn is_key_skipped(&self, i: usize) -> bool {
        self.skipped[i]
    }

    pub fn num_remaining(&self) -> usize {
        self.skipped.iter().filter(|s| !**s).count()
    }

    pub fn remaining_keys(&self) -> Vec<&[u8]> {
        self.iter().map(|(_, k)| k).collect()
    }
}
