use std::fmt;
use crate::DBError;
use crate::util::{BLOCK_TRAILER_SIZE, NO_COMPRESSION, TABLE_MAGIC};

/// 一个 block 在 table 文件里的位置
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockHandle {
    pub offset: u64,
    pub size: u64,
}

impl BlockHandle {
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    pub fn encode_to(&self, dst: &mut Vec<u8>) {
        put_varint64(dst, self.offset);
        put_varint64(dst, self.size);
    }

    pub fn decode_from(src: &[u8], pos: &mut usize) -> Option<Self> {
        let offset = get_varint64(src, pos)?;
        let size = get_varint64(src, pos)?;
        Some(Self { offset, size })
    }

    pub fn decode_from_bytes(bytes: &[u8]) -> Result<Self, DBError> {
        let mut pos = 0usize;
        let offset = get_varint64(bytes, &mut pos)
            .ok_or(DBError::Corruption("bad block handle offset".into()))?;
        let size = get_varint64(bytes, &mut pos)
            .ok_or(DBError::Corruption("bad block handle size".into()))?;
        Ok(Self { offset, size })
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.offset, self.size)
    }
}

/// index entry 的 value：指向一个 data block（或 filter/index partition）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexValue {
    pub handle: BlockHandle,
}

impl IndexValue {
    pub fn new(handle: BlockHandle) -> Self {
        Self { handle }
    }

    pub fn decode_from_bytes(bytes: &[u8]) -> Result<Self, DBError> {
        Ok(Self { handle: BlockHandle::decode_from_bytes(bytes)? })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Footer {
    /// 整表唯一的 full filter block；size == 0 表示没有 filter
    pub filter_handle: BlockHandle,
    pub index_handle: BlockHandle,
}

impl Footer {
    pub const ENCODED_LEN: usize = 48;

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        self.filter_handle.encode_to(&mut buf);
        self.index_handle.encode_to(&mut buf);

        // 两个 handle 最多 40 bytes，padding 之后写 8 bytes magic
        buf.resize(40, 0);
        buf.extend_from_slice(&TABLE_MAGIC.to_le_bytes());

        let mut out = [0u8; Self::ENCODED_LEN];
        out.copy_from_slice(&buf);
        out
    }

    pub fn decode(input: &[u8]) -> Result<Self, DBError> {
        if input.len() != Self::ENCODED_LEN {
            return Err(DBError::Corruption("bad footer length".into()));
        }
        let magic = decode_fixed64(&input[40..48]);
        if magic != TABLE_MAGIC {
            return Err(DBError::Corruption("bad sstable magic number".into()));
        }
        let mut pos = 0usize;
        let filter_handle = BlockHandle::decode_from(input, &mut pos)
            .ok_or_else(|| DBError::Corruption("bad filter handle".into()))?;
        let index_handle = BlockHandle::decode_from(input, &mut pos)
            .ok_or_else(|| DBError::Corruption("bad index handle".into()))?;
        Ok(Self { filter_handle, index_handle })
    }
}

/// trailer = compression type(1) + crc32c(block || type)(4)
pub fn append_block_with_trailer(dst: &mut Vec<u8>, block: &[u8]) -> BlockHandle {
    let handle = BlockHandle::new(dst.len() as u64, block.len() as u64);
    dst.extend_from_slice(block);
    dst.push(NO_COMPRESSION);
    let crc = crc32c::crc32c_append(crc32c::crc32c(block), &[NO_COMPRESSION]);
    dst.extend_from_slice(&crc.to_le_bytes());
    handle
}

/// 校验 trailer 并返回 block 内容在 image 中的范围
pub fn verify_block_trailer(image: &[u8], handle: &BlockHandle) -> Result<(), DBError> {
    let start = handle.offset as usize;
    let end = start + handle.size as usize;
    let trailer = &image[end..end + BLOCK_TRAILER_SIZE];
    let expected = decode_fixed32(&trailer[1..5]);
    let actual = crc32c::crc32c_append(crc32c::crc32c(&image[start..end]), &trailer[..1]);
    if expected != actual {
        return Err(DBError::Corruption(format!(
            "block checksum mismatch at {handle}: expected {expected:#x}, got {actual:#x}"
        )));
    }
    if trailer[0] != NO_COMPRESSION {
        return Err(DBError::NotSupported(format!("compression type {}", trailer[0])));
    }
    Ok(())
}

/// handle 加上 trailer 是否完整落在 image 内
pub fn block_in_range(image_len: usize, handle: &BlockHandle) -> bool {
    handle
        .offset
        .checked_add(handle.size)
        .and_then(|end| end.checked_add(BLOCK_TRAILER_SIZE as u64))
        .is_some_and(|end| end <= image_len as u64)
}

// ------- coding helpers (varint / fixed) -------

pub fn put_varint32(dst: &mut Vec<u8>, mut v: u32) {
    while v >= 0x80 {
        dst.push((v as u8) | 0x80);
        v >>= 7;
    }
    dst.push(v as u8);
}

pub fn put_varint64(dst: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        dst.push((v as u8) | 0x80);
        v >>= 7;
    }
    dst.push(v as u8);
}

pub fn get_varint32(src: &[u8], pos: &mut usize) -> Option<u32> {
    let mut shift = 0u32;
    let mut out = 0u32;
    while *pos < src.len() && shift <= 28 {
        let b = src[*pos];
        *pos += 1;
        out |= ((b & 0x7f) as u32) << shift;
        if (b & 0x80) == 0 {
            return Some(out);
        }
        shift += 7;
    }
    None
}

pub fn get_varint64(src: &[u8], pos: &mut usize) -> Option<u64> {
    let mut shift = 0u32;
    let mut out = 0u64;
    while *pos < src.len() && shift <= 63 {
        let b = src[*pos];
        *pos += 1;
        out |= ((b & 0x7f) as u64) << shift;
        if (b & 0x80) == 0 {
            return Some(out);
        }
        shift += 7;
    }
    None
}

/// 调用方保证 src.len() >= 4
pub fn decode_fixed32(src: &[u8]) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&src[..4]);
    u32::from_le_bytes(b)
}

/// 调用方保证 src.len() >= 8
pub fn decode_fixed64(src: &[u8]) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&src[..8]);
    u64::from_le_bytes(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_handle_display_and_decode() {
        let h = BlockHandle::new(4096, 1234);
        assert_eq!(h.to_string(), "4096 1234");

        let mut buf = Vec::new();
        h.encode_to(&mut buf);
        assert_eq!(BlockHandle::decode_from_bytes(&buf).unwrap(), h);
        assert_eq!(IndexValue::decode_from_bytes(&buf).unwrap().handle, h);

        // 截断的 varint
        assert!(BlockHandle::decode_from_bytes(&buf[..1]).is_err());
    }

    #[test]
    fn test_varint_boundaries() {
        for v in [0u32, 127, 128, 16_383, 16_384, u32::MAX] {
            let mut buf = Vec::new();
            put_varint32(&mut buf, v);
            let mut pos = 0;
            assert_eq!(get_varint32(&buf, &mut pos), Some(v));
            assert_eq!(pos, buf.len());
        }
        let mut pos = 0;
        assert_eq!(get_varint32(&[0x80, 0x80], &mut pos), None);
    }

    #[test]
    fn test_footer_magic_checked() {
        let footer = Footer {
            filter_handle: BlockHandle::new(100, 20),
            index_handle: BlockHandle::new(125, 30),
        };
        let enc = footer.encode();
        assert_eq!(Footer::decode(&enc).unwrap(), footer);

        let mut bad = enc;
        bad[47] ^= 0xff;
        assert!(Footer::decode(&bad).unwrap_err().is_corruption());
        assert!(Footer::decode(&enc[..40]).is_err());
    }

    #[test]
    fn test_trailer_detects_flipped_byte() {
        let mut image = Vec::new();
        let h = append_block_with_trailer(&mut image, b"hello block");
        assert!(block_in_range(image.len(), &h));
        assert!(verify_block_trailer(&image, &h).is_ok());

        image[2] ^= 0x01;
        assert!(verify_block_trailer(&image, &h).unwrap_err().is_corruption());

        let far = BlockHandle::new(image.len() as u64, 1);
        assert!(!block_in_range(image.len(), &far));
    }
}
