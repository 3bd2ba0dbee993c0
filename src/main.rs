mod cache;
mod config;
mod error;
mod memory;
mod replace;
mod trace;
mod visual;
mod write;

#[cfg(test)]
mod test_utils;

use std::{fs, process};

use anyhow::{anyhow, Context};
use log::{error, info};
use serde::Serialize;

use cache::{CacheStats, IsCache};
use memory::{Dram, DramStats};
use replace::Policy;
use trace::{Record, Trace};
use visual::{LogVisuals, NoVisuals, Visualize};

use crate::config::Config;

#[derive(Serialize)]
struct RunStats {
    accesses: u64,
    cache: CacheStats,
    dram: DramStats,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        error!("{err:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut args = pico_args::Arguments::from_env();
    let n_warm: u64 = args.opt_value_from_str("-w")?.unwrap_or(0);
    let n_access: u64 = args.opt_value_from_str("-i")?.unwrap_or(u64::MAX);
    let heartbeat_int: u64 = args.opt_value_from_str("-h")?.unwrap_or(0);
    let dump = args.contains("--dump");
    let visual = args.contains("-v");

    let config_str: String = if let Some(config_str) = args.opt_value_from_str("--config")? {
        config_str
    } else {
        let config_path: String = args
            .opt_value_from_str("-p")?
            .ok_or_else(|| anyhow!("Must provide a config with --config <json> or -p <path>"))?;
        fs::read_to_string(&config_path)
            .with_context(|| format!("Could not read config file {config_path}"))?
    };
    let config: Config = serde_json::from_str(&config_str).context("Invalid cache config")?;
    let policy = config.policy();
    let mut cache = config.to_cache().context("Bad cache config")?;
    let mut dram = Dram::new();

    let stats_path: String = args
        .opt_value_from_str("--json")?
        .ok_or_else(|| anyhow!("Must provide output path with --json"))?;
    let trace_path: String = args
        .opt_value_from_str("-t")?
        .ok_or_else(|| anyhow!("Must provide a trace with -t"))?;
    let records_per_block: usize = args
        .opt_value_from_str("--buffer-size")?
        .unwrap_or(1024 * 16);
    let blocks_per_queue: usize = args.opt_value_from_str("--queue-size")?.unwrap_or(32);

    let trace = Trace::read(trace_path.clone().into(), records_per_block, blocks_per_queue)
        .with_context(|| format!("Could not open trace {trace_path}"))?;
    let mut vis: Box<dyn Visualize> = if visual {
        Box::new(LogVisuals)
    } else {
        Box::new(NoVisuals)
    };

    let mut warmup = n_warm > 0;
    let mut goal = if warmup { n_warm } else { n_access };
    let mut done: u64 = 0;
    let mut next_heartbeat = heartbeat_int;

    'replay: for record_block in trace.rec.iter() {
        for record in record_block {
            operate(cache.as_mut(), &mut dram, vis.as_mut(), record);
            done += 1;
            if heartbeat_int != 0 && done >= next_heartbeat {
                info!("Accesses: {done}");
                next_heartbeat += heartbeat_int;
            }

            if done >= goal {
                if warmup {
                    cache.clear_stats();
                    dram.clear_stats();
                    goal = done.saturating_add(n_access);
                    warmup = false;
                    info!("Finished warmup after {done} accesses");
                } else {
                    break 'replay;
                }
            }
        }
    }
    trace
        .finish()
        .with_context(|| format!("Failed reading trace {trace_path}"))?;
    info!("Ran {done} accesses");

    if dump {
        print!("{}", dump_blocks(cache.as_ref(), policy));
    }

    let stats = RunStats {
        accesses: done,
        cache: cache.make_stats(),
        dram: dram.stats(),
    };
    let stats_file = fs::File::create(&stats_path)
        .with_context(|| format!("Cannot open output file {stats_path}"))?;
    serde_json::to_writer_pretty(stats_file, &stats)?;
    Ok(())
}

fn operate(cache: &mut dyn IsCache, dram: &mut Dram, vis: &mut dyn Visualize, record: Record) {
    cache.access(dram, vis, record.addr, record.op);
}

/// One line per way: valid, dirty, tag, and the counter the policy uses.
fn dump_blocks(cache: &dyn IsCache, policy: Policy) -> String {
    let mut out = String::new();
    for set in 0..cache.n_sets() {
        for way in 0..cache.n_ways() {
            let block = cache.block(set, way);
            let counter = match policy {
                Policy::Lru => format!(" lru={}", cache.lru_to_string(set, way)),
                Policy::Lfu | Policy::Random => {
                    format!(" lfu={}", cache.lfu_to_string(set, way))
                }
            };
            out.push_str(&format!(
                "[{set}][{way}] {} {} tag={:#x}{counter}\n",
                if block.valid { 'V' } else { '-' },
                if block.dirty { 'D' } else { '-' },
                block.tag,
            ));
        }
    }
    out
}
