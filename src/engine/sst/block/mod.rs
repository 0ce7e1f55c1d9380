pub(crate) mod block;
pub(crate) mod data_block;
pub(crate) mod index_block;
pub(crate) mod filter_policy;
pub(crate) mod slice_transform;
pub(crate) mod filter_block_builder;
pub(crate) mod filter_block;

pub use block::BlockBuilder;
pub use data_block::DataBlock;
pub use index_block::{IndexBlock, IndexBlockBuilder};
pub use filter_policy::{hash64, BloomFilterPolicy, FilterBitsBuilder, FilterBitsReader, FilterPolicy};
pub use slice_transform::{
    create_prefix_extractor, CappedPrefixTransform, FixedPrefixTransform, NoopTransform, SliceTransform,
};
pub use filter_block_builder::{FilterPartitionState, FullFilterBlockBuilder};
pub use filter_block::{FilterBlockLoader, FullFilterBlockReader, ParsedFullFilterBlock};
