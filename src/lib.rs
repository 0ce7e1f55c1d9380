pub mod engine;
pub mod util;
pub mod error;

pub use crate::engine::sst::{BlockBasedTable, TableBuilder};
pub use crate::error::DBError;
pub use crate::util::{ReadOptions, TableOptions};
