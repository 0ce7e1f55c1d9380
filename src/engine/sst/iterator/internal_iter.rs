use crate::DBError;

/// 所有内部 iterator（data block / index block / two-level / vec）统一实现这个接口
///
/// `V` 是 value 的类型：data block 是 `[u8]`，index block 是解码后的 `IndexValue`。
pub trait InternalIterator<V: ?Sized = [u8]> {
    /// 当前是否指向有效 entry
    fn valid(&self) -> bool;

    fn seek_to_first(&mut self);

    fn seek_to_last(&mut self);

    /// 定位到 >= target 的第一条记录
    fn seek(&mut self, target: &[u8]);

    /// 定位到 <= target 的最后一条记录
    fn seek_for_prev(&mut self, target: &[u8]);

    /// 仅在 valid() == true 时调用
    fn next(&mut self);

    /// 仅在 valid() == true 时调用
    fn prev(&mut self);

    /// 当前 key（仅在 valid() == true 时调用）
    fn key(&self) -> &[u8];

    /// key 里不带 timestamp 等后缀时与 key() 相同
    fn user_key(&self) -> &[u8] {
        self.key()
    }

    /// 当前 value（仅在 valid() == true 时调用）
    fn value(&self) -> &V;

    fn status(&self) -> Result<(), DBError> {
        Ok(())
    }

    fn is_key_pinned(&self) -> bool {
        false
    }

    fn is_value_pinned(&self) -> bool {
        false
    }
}
