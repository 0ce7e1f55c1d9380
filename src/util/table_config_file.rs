use std::path::Path;
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use crate::DBError;
use crate::util::options::{ReadOptions, TableOptions};
use crate::util::constants::{TABLE_CONFIG_INI, TABLE_CONFIG_JSON, TABLE_CONFIG_YAML};

/// 配置文件里的覆盖项，全部可选；没写的字段保持默认值
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TableConfigFile {
    // Filter
    pub whole_key_filtering: Option<bool>,
    pub bloom_bits_per_key: Option<usize>,
    pub prefix_extractor: Option<String>,

    // Block
    pub block_size: Option<usize>,
    pub block_restart_interval: Option<usize>,

    // Cache
    pub cache_filter_block: Option<bool>,
    pub pin_filter_block: Option<bool>,

    // 默认读策略
    pub read: Option<ReadOptions>,
}

/// 在 dir 下按 yaml → json → ini 的顺序找 table 配置；都没有则返回全空的覆盖
pub fn load_table_config(dir: &Path) -> Result<TableConfigFile, DBError> {
    let mut cfg = Config::builder();

    let candidates = [
        (TABLE_CONFIG_YAML, FileFormat::Yaml),
        (TABLE_CONFIG_JSON, FileFormat::Json),
        (TABLE_CONFIG_INI, FileFormat::Ini),
    ];

    for (name, format) in candidates {
        let path = dir.join(name);
        if path.exists() {
            log::info!("loading table config from {}", path.display());
            cfg = cfg.add_source(File::new(&path.to_string_lossy(), format));
            break;
        }
    }

    let cfg = cfg.build()?;
    Ok(cfg.try_deserialize()?)
}

impl TableConfigFile {
    pub fn to_table_options(&self) -> Result<TableOptions, DBError> {
        let mut o = TableOptions::default();

        macro_rules! apply {
            ($f:ident) => {
                if let Some(v) = &self.$f {
                    o.$f = v.clone();
                }
            };
        }

        apply!(whole_key_filtering);
        apply!(bloom_bits_per_key);
        apply!(block_size);
        apply!(block_restart_interval);
        apply!(cache_filter_block);
        apply!(pin_filter_block);

        if let Some(p) = &self.prefix_extractor {
            o.prefix_extractor = Some(p.clone());
        }

        o.validate()?;
        Ok(o)
    }

    pub fn read_options(&self) -> ReadOptions {
        self.read.unwrap_or_default()
    }
}
