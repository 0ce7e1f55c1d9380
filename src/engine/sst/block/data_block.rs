use bytes::Bytes;
use crate::engine::sst::format::decode_fixed32;
use crate::error::DBError;

/// 解析过 restart 数组的 block，内容用 Bytes 共享，iterator 可以直接持有
pub struct DataBlock {
    pub(crate) data: Bytes,
    pub(crate) restart_offsets: Vec<u32>,
    /// entries 的结束位置 = restart 数组开始位置
    pub(crate) restarts_start: usize,
}

impl DataBlock {
    pub fn from_bytes(data: Bytes) -> Result<Self, DBError> {
        if data.len() < 4 {
            return Err(DBError::Corruption("block too small".into()));
        }

        let n = decode_fixed32(&data[data.len() - 4..]) as usize;
        let restarts_start = n
            .checked_mul(4)
            .and_then(|len| (data.len() - 4).checked_sub(len))
            .ok_or_else(|| DBError::Corruption("bad restart array".into()))?;
        if n == 0 {
            return Err(DBError::Corruption("block without restart points".into()));
        }

        let mut restart_offsets = Vec::with_capacity(n);
        for i in 0..n {
            let off = decode_fixed32(&data[restarts_start + i * 4..]);
            if off as usize > restarts_start {
                return Err(DBError::Corruption(format!("restart offset {off} out of range")));
            }
            restart_offsets.push(off);
        }

        Ok(Self { data, restart_offsets, restarts_start })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn num_restarts(&self) -> usize {
        self.restart_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restarts_start == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sst::block::BlockBuilder;

    #[test]
    fn test_parse_built_block() {
        let mut b = BlockBuilder::new(2);
        for k in ["a", "ab", "abc", "b", "c"] {
            b.add(k.as_bytes(), b"v");
        }
        let block = DataBlock::from_bytes(Bytes::from(b.finish())).unwrap();
        assert_eq!(block.num_restarts(), 3);
        assert!(!block.is_empty());
    }

    #[test]
    fn test_empty_block_is_valid() {
        let mut b = BlockBuilder::new(16);
        let block = DataBlock::from_bytes(Bytes::from(b.finish())).unwrap();
        assert!(block.is_empty());
        assert_eq!(block.size(), 8);
    }

    #[test]
    fn test_corrupt_restart_count() {
        assert!(DataBlock::from_bytes(Bytes::from_static(&[1, 2])).is_err());
        // 声称有 100 个 restart，但只有 4 bytes
        let bad = 100u32.to_le_bytes().to_vec();
        assert!(matches!(DataBlock::from_bytes(Bytes::from(bad)), Err(e) if e.is_corruption()));
    }
}
