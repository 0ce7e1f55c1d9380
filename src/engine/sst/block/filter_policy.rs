use bytes::Bytes;
use crate::DBError;

/// 建 filter 的一侧：逐个 add_key，最后 finish 成 bytes
pub trait FilterBitsBuilder: Send {
    fn add_key(&mut self, key: &[u8]);

    /// 输出编码后的 filter 并清空内部状态
    fn finish(&mut self) -> Result<Vec<u8>, DBError>;

    /// 已加入的 entry 数估计（只用于 sizing，不保证精确）
    fn estimate_entries_added(&self) -> usize;
}

/// 查 filter 的一侧
pub trait FilterBitsReader: Send + Sync {
    fn may_match(&self, entry: &[u8]) -> bool;

    /// 批量查询，may_match[i] 对应 keys[i]
    fn may_match_batch(&self, keys: &[&[u8]], may_match: &mut [bool]) {
        for (key, out) in keys.iter().zip(may_match.iter_mut()) {
            *out = self.may_match(key);
        }
    }
}

pub trait FilterPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn new_builder(&self) -> Box<dyn FilterBitsBuilder>;

    /// contents 为空（该 partition 没有 key）时返回 None
    fn new_reader(&self, contents: &Bytes) -> Option<Box<dyn FilterBitsReader>>;
}

const BLOOM_HASH_SEED: u64 = 0x243F_6A88_85A3_08D3;
const MAX_PROBES: u8 = 30;

pub struct BloomFilterPolicy {
    bits_per_key: usize,
    k: u8,
}

impl BloomFilterPolicy {
    pub fn new(bits_per_key: usize) -> Self {
        // k ~ ln2 * bits_per_key
        let k = ((bits_per_key as f64) * 0.69).round() as i64;
        Self {
            bits_per_key: bits_per_key.max(1),
            k: k.clamp(1, MAX_PROBES as i64) as u8,
        }
    }

    pub fn bits_per_key(&self) -> usize {
        self.bits_per_key
    }
}

impl FilterPolicy for BloomFilterPolicy {
    fn name(&self) -> &'static str {
        "kvtable.BuiltinBloomFilter"
    }

    fn new_builder(&self) -> Box<dyn FilterBitsBuilder> {
        Box::new(BloomFilterBitsBuilder::new(self.bits_per_key, self.k))
    }

    fn new_reader(&self, contents: &Bytes) -> Option<Box<dyn FilterBitsReader>> {
        if contents.is_empty() {
            return None;
        }
        Some(Box::new(BloomFilterBitsReader { data: contents.clone() }))
    }
}

/// 只保存 key 的 64 位 hash；相邻重复的 hash 直接丢掉
pub struct BloomFilterBitsBuilder {
    bits_per_key: usize,
    k: u8,
    hashes: Vec<u64>,
}

impl BloomFilterBitsBuilder {
    pub(crate) fn new(bits_per_key: usize, k: u8) -> Self {
        Self {
            bits_per_key,
            k,
            hashes: Vec::new(),
        }
    }
}

impl FilterBitsBuilder for BloomFilterBitsBuilder {
    fn add_key(&mut self, key: &[u8]) {
        let h = hash64(key, BLOOM_HASH_SEED);
        if self.hashes.last() != Some(&h) {
            self.hashes.push(h);
        }
    }

    fn finish(&mut self) -> Result<Vec<u8>, DBError> {
        let hashes = std::mem::take(&mut self.hashes);

        let n_keys = hashes.len().max(1);
        let bits = n_keys.saturating_mul(self.bits_per_key).max(64);
        let bytes = bits.div_ceil(8);
        if bytes >= u32::MAX as usize {
            return Err(DBError::InvalidArgument(format!(
                "bloom filter of {bytes} bytes exceeds size limit"
            )));
        }
        let bits = bytes * 8;

        let mut filter = vec![0u8; bytes];
        for h in hashes {
            for bitpos in probe_positions(h, self.k, bits) {
                filter[bitpos / 8] |= 1u8 << (bitpos % 8);
            }
        }

        // 最后一个字节存 k
        filter.push(self.k);
        Ok(filter)
    }

    fn estimate_entries_added(&self) -> usize {
        self.hashes.len()
    }
}

pub struct BloomFilterBitsReader {
    data: Bytes,
}

impl FilterBitsReader for BloomFilterBitsReader {
    fn may_match(&self, entry: &[u8]) -> bool {
        let filter = &self.data;
        if filter.len() < 2 {
            return true;
        }
        let k = filter[filter.len() - 1];
        if k == 0 || k > MAX_PROBES {
            // 不认识的编码，按可能存在处理
            return true;
        }
        let bits = (filter.len() - 1) * 8;
        let h = hash64(entry, BLOOM_HASH_SEED);
        probe_positions(h, k, bits).all(|bitpos| filter[bitpos / 8] & (1 << (bitpos % 8)) != 0)
    }
}

/// double hashing：由一个 64 位 hash 派生 k 个探测位置
fn probe_positions(hash: u64, k: u8, bits: usize) -> impl Iterator<Item = usize> {
    let delta = hash.rotate_right(33) | 1;
    (0..k as u64).map(move |i| (hash.wrapping_add(i.wrapping_mul(delta)) % bits as u64) as usize)
}

pub fn hash64(data: &[u8], seed: u64) -> u64 {
    let mut h = seed ^ (data.len() as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
        h ^= h >> 33;
    }
    // final avalanche
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    h = h.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    h ^= h >> 33;
    h
}
