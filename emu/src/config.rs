use arch::memmap::MemoryMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

use crate::error::Error;

pub const DEFAULT_STEP_BUDGET: u64 = 10_000_000;

/// Machine settings, read from the same YAML file the compiler uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Addressable bytes.
    pub memory_size: u64,
    pub step_budget: u64,
    pub map: MemoryMap,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            memory_size: 1 << 32,
            step_budget: DEFAULT_STEP_BUDGET,
            map: MemoryMap::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Config, Error> {
        let file = File::open(path).map_err(|e| Error::FileOpen(path.to_string(), e))?;
        let config: Config = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| Error::Config(path.to_string(), e))?;
        config.map.validate().map_err(Error::MemoryMap)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("step_budget: 500\nmap:\n  heap_base: 2097152\n").unwrap();
        assert_eq!(config.step_budget, 500);
        assert_eq!(config.memory_size, 1 << 32);
        assert_eq!(config.map.heap_base, 0x20_0000);
        assert_eq!(config.map.stack_top, MemoryMap::default().stack_top);
    }
}
