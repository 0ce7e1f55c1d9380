pub(crate) mod constants;
mod table_config_file;
mod options;

pub use constants::{BLOCK_TRAILER_SIZE, DEFAULT_BLOCK_SIZE, DEFAULT_BLOOM_BITS_PER_KEY,
                    DEFAULT_RESTART_INTERVAL, NO_COMPRESSION, TABLE_MAGIC};
pub use table_config_file::{load_table_config, TableConfigFile};
pub use options::{ReadOptions, TableOptions};
