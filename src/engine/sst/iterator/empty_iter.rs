use std::marker::PhantomData;
use crate::DBError;
use crate::engine::sst::iterator::InternalIterator;

/// 不含任何数据的 iterator，带一个固定的 status
///
/// 用作 "没有数据" 的占位，或者把读 block 时的错误包装成 iterator 交给上层。
/// next / prev / key / value 都属于误用。
pub struct EmptyInternalIterator<V: ?Sized = [u8]> {
    status: Result<(), DBError>,
    _value: PhantomData<fn() -> Box<V>>,
}

impl<V: ?Sized> EmptyInternalIterator<V> {
    pub fn new(status: Result<(), DBError>) -> Self {
        Self {
            status,
            _value: PhantomData,
        }
    }
}

impl<V: ?Sized> InternalIterator<V> for EmptyInternalIterator<V> {
    fn valid(&self) -> bool {
        false
    }

    fn seek_to_first(&mut self) {}

    fn seek_to_last(&mut self) {}

    fn seek(&mut self, _target: &[u8]) {}

    fn seek_for_prev(&mut self, _target: &[u8]) {}

    fn next(&mut self) {
        debug_assert!(false, "EmptyInternalIterator::next()");
    }

    fn prev(&mut self) {
        debug_assert!(false, "EmptyInternalIterator::prev()");
    }

    fn key(&self) -> &[u8] {
        panic!("EmptyInternalIterator::key()");
    }

    fn value(&self) -> &V {
        panic!("EmptyInternalIterator::value()");
    }

    fn status(&self) -> Result<(), DBError> {
        self.status.clone()
    }
}

pub fn new_empty_internal_iterator<'a, V: ?Sized + 'a>() -> Box<dyn InternalIterator<V> + 'a> {
    Box::new(EmptyInternalIterator::<V>::new(Ok(())))
}

pub fn new_error_internal_iterator<'a, V: ?Sized + 'a>(err: DBError) -> Box<dyn InternalIterator<V> + 'a> {
    Box::new(EmptyInternalIterator::<V>::new(Err(err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sst::format::IndexValue;

    #[test]
    fn test_empty_and_error_status() {
        let mut it = new_empty_internal_iterator::<[u8]>();
        it.seek_to_first();
        it.seek(b"k");
        assert!(!it.valid());
        assert!(it.status().is_ok());

        let mut it = new_error_internal_iterator::<IndexValue>(DBError::Io("disk gone".into()));
        it.seek_to_last();
        it.seek_for_prev(b"k");
        assert!(!it.valid());
        assert_eq!(it.status(), Err(DBError::Io("disk gone".into())));
        assert!(!it.is_key_pinned());
    }

    #[test]
    #[should_panic]
    fn test_value_is_contract_violation() {
        let it = EmptyInternalIterator::<[u8]>::new(Ok(()));
        it.value();
    }
}
