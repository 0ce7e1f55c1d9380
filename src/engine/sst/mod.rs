pub mod format;
pub mod block;
pub mod iterator;
pub mod multiget;
pub(crate) mod table_builder;
pub(crate) mod table_reader;

pub use format::{BlockHandle, Footer, IndexValue};
pub use multiget::MultiGetRange;
pub use table_builder::TableBuilder;
pub use table_reader::{BlockBasedTable, TableFilterLoader};
