use std::sync::Arc;
use crate::DBError;

/// prefix extractor：把 user key 映射成用于 prefix filter 的前缀
pub trait SliceTransform: Send + Sync {
    fn name(&self) -> String;

    /// 只有 in_domain 为 true 的 key 才能调用 transform
    fn transform<'k>(&self, key: &'k [u8]) -> &'k [u8];

    fn in_domain(&self, key: &[u8]) -> bool;
}

/// 固定长度前缀；比前缀短的 key 不在 domain 内
pub struct FixedPrefixTransform {
    prefix_len: usize,
}

impl FixedPrefixTransform {
    pub fn new(prefix_len: usize) -> Self {
        Self { prefix_len }
    }
}

impl SliceTransform for FixedPrefixTransform {
    fn name(&self) -> String {
        format!("kvtable.FixedPrefix.{}", self.prefix_len)
    }

    fn transform<'k>(&self, key: &'k [u8]) -> &'k [u8] {
        debug_assert!(self.in_domain(key));
        &key[..self.prefix_len]
    }

    fn in_domain(&self, key: &[u8]) -> bool {
        key.len() >= self.prefix_len
    }
}

/// 最多取前 cap 个字节，所有 key 都在 domain 内
pub struct CappedPrefixTransform {
    cap_len: usize,
}

impl CappedPrefixTransform {
    pub fn new(cap_len: usize) -> Self {
        Self { cap_len }
    }
}

impl SliceTransform for CappedPrefixTransform {
    fn name(&self) -> String {
        format!("kvtable.CappedPrefix.{}", self.cap_len)
    }

    fn transform<'k>(&self, key: &'k [u8]) -> &'k [u8] {
        &key[..key.len().min(self.cap_len)]
    }

    fn in_domain(&self, _key: &[u8]) -> bool {
        true
    }
}

pub struct NoopTransform;

impl SliceTransform for NoopTransform {
    fn name(&self) -> String {
        "kvtable.Noop".to_string()
    }

    fn transform<'k>(&self, key: &'k [u8]) -> &'k [u8] {
        key
    }

    fn in_domain(&self, _key: &[u8]) -> bool {
        true
    }
}

/// "fixed:N" / "capped:N" / "noop"
pub fn create_prefix_extractor(desc: &str) -> Result<Arc<dyn SliceTransform>, DBError> {
    let desc = desc.trim();
    if desc == "noop" {
        return Ok(Arc::new(NoopTransform));
    }

    let (kind, len) = desc
        .split_once(':')
        .ok_or_else(|| DBError::InvalidArgument(format!("bad prefix extractor: {desc}")))?;
    let len: usize = len
        .parse()
        .map_err(|_| DBError::InvalidArgument(format!("bad prefix length in: {desc}")))?;

    match kind {
        "fixed" => Ok(Arc::new(FixedPrefixTransform::new(len))),
        "capped" => Ok(Arc::new(CappedPrefixTransform::new(len))),
        _ => Err(DBError::InvalidArgument(format!("unknown prefix extractor: {kind}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_prefix_domain() {
        let t = FixedPrefixTransform::new(3);
        assert!(t.in_domain(b"abc"));
        assert!(t.in_domain(b"abcdef"));
        assert!(!t.in_domain(b"ab"));
        assert_eq!(t.transform(b"abcdef"), b"abc");
    }

    #[test]
    fn test_capped_prefix() {
        let t = CappedPrefixTransform::new(4);
        assert!(t.in_domain(b""));
        assert_eq!(t.transform(b"ab"), b"ab");
        assert_eq!(t.transform(b"abcdef"), b"abcd");
    }

    #[test]
    fn test_create_from_config_string() {
        assert_eq!(create_prefix_extractor("fixed:2").unwrap().name(), "kvtable.FixedPrefix.2");
        assert_eq!(create_prefix_extractor(" capped:8 ").unwrap().name(), "kvtable.CappedPrefix.8");
        assert_eq!(create_prefix_extractor("noop").unwrap().transform(b"xyz"), b"xyz");
        assert!(create_prefix_extractor("fixed").is_err());
        assert!(create_prefix_extractor("fixed:-1").is_err());
        assert!(create_prefix_extractor("rolling:3").is_err());
    }
}
