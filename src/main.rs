use std::path::PathBuf;

use anyhow::Context;
use bytes::Bytes;
use log::info;

use kvtable::engine;
use kvtable::engine::monitoring::get_perf_context;
use kvtable::util::load_table_config;
use kvtable::{BlockBasedTable, TableBuilder};

fn main() -> anyhow::Result<()> {
    engine::init_engine();

    // 第一个参数是配置目录，默认当前目录
    let dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let config = load_table_config(&dir).context("loading table config")?;
    let options = config.to_table_options()?;
    let read_options = config.read_options();

    let mut builder = TableBuilder::new(&options)?;
    for i in 0..1000u32 {
        builder.add(format!("user:{i:06}").as_bytes(), format!("profile-{i}").as_bytes())?;
    }
    let image = builder.finish()?;
    let table = BlockBasedTable::open(Bytes::from(image), &options)?;

    let mut iter = table.new_iterator(read_options);
    iter.seek(b"user:000500");
    if iter.valid() {
        info!(
            "seek user:000500 -> {} = {}",
            String::from_utf8_lossy(iter.key()),
            String::from_utf8_lossy(iter.value())
        );
    }
    iter.status()?;

    let keys: Vec<&[u8]> = vec![b"user:000001", b"user:999999", b"user:000999"];
    for (key, value) in keys.iter().zip(table.multi_get(&keys, &read_options)?) {
        info!(
            "{} -> {:?}",
            String::from_utf8_lossy(key),
            value.map(|v| String::from_utf8_lossy(&v).into_owned())
        );
    }

    let ctx = get_perf_context();
    info!(
        "perf: bloom hit {}, bloom miss {}, blocks read {}",
        ctx.bloom_sst_hit_count, ctx.bloom_sst_miss_count, ctx.block_read_count
    );
    Ok(())
}
