pub(crate) mod data_block_iter;
pub(crate) mod block_iter;
pub(crate) mod two_level_iter;
pub(crate) mod internal_iter;
pub(crate) mod empty_iter;
pub(crate) mod vec_iter;

pub use internal_iter::InternalIterator;
pub use data_block_iter::DataBlockIter;
pub use block_iter::IndexBlockIter;
pub use two_level_iter::{new_two_level_iterator, TwoLevelIterator, TwoLevelIteratorState};
pub use empty_iter::{new_empty_internal_iterator, new_error_internal_iterator, EmptyInternalIterator};
pub use vec_iter::VecIterator;
