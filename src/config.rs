use serde::Deserialize;

use crate::{
    cache::{Cache, IsCache},
    error::ConfigError,
    replace::{lfu::Lfu, lru::Lru, random::Random, Policy},
    write::SyncPolicy,
};

fn default_name() -> String {
    "cache".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    name: String,
    /// Ways per set. 0 turns the cache off.
    assoc: usize,
    set_count: usize,
    block_size: usize,
    policy: Policy,
    memory_sync_policy: SyncPolicy,
    /// Seeds the random policy. Unseeded runs are not repeatable.
    #[serde(default)]
    seed: Option<u64>,
}

impl Config {
    pub fn to_cache(self) -> Result<Box<dyn IsCache>, ConfigError> {
        let Config {
            name,
            assoc,
            set_count,
            block_size,
            policy,
            memory_sync_policy: sync,
            seed,
        } = self;
        Ok(match policy {
            Policy::Lru => Box::new(Cache::new(
                name,
                block_size,
                set_count,
                assoc,
                sync,
                Lru::new(),
            )?) as Box<dyn IsCache>,
            Policy::Lfu => Box::new(Cache::new(
                name,
                block_size,
                set_count,
                assoc,
                sync,
                Lfu::new(),
            )?),
            Policy::Random => Box::new(Cache::new(
                name,
                block_size,
                set_count,
                assoc,
                sync,
                Random::new(seed),
            )?),
        })
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }
}
