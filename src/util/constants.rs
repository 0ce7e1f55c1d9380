/// footer 末尾的 magic number
pub const TABLE_MAGIC: u64 = 0x88e2_41b7_85f4_cff7;

/// block trailer: 1 byte compression type + 4 byte crc32c
pub const BLOCK_TRAILER_SIZE: usize = 5;
pub const NO_COMPRESSION: u8 = 0;

pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024;
pub const DEFAULT_RESTART_INTERVAL: usize = 16;
pub const DEFAULT_BLOOM_BITS_PER_KEY: usize = 10;

/// 配置文件名（按顺序查找）
pub const TABLE_CONFIG_YAML: &str = "table.yaml";
pub const TABLE_CONFIG_JSON: &str = "table.json";
pub const TABLE_CONFIG_INI: &str = "table.ini";
