//! optional `tpu.toml` configuration, loaded once at CLI startup. a missing
//! file is not an error - every field defaults to the conventional layout
//! described in the data model.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::memory::{
    DATA_LOWER_ADDR, HEAP_LOWER_ADDR, HEAP_SIZE, INSTRUCTION_PTR_START, STACK_LOWER_ADDR,
    TEXT_LOWER_ADDR,
};

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    pub clock_hz: u32,
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> VmConfig {
        // matches the teacher's documented baseline: "Intel 8086: 0.330 MIPS at 5.000 MHz"
        VmConfig {
            clock_hz: 5_000_000,
            trace: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Default)]
#[serde(default)]
pub struct AssemblerConfig {
    pub trace_backpatch: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Default)]
#[serde(default)]
pub struct CompilerConfig {
    pub trace_emit: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct MemoryLayout {
    pub instruction_ptr_start: u16,
    pub text_lower_addr: u16,
    pub data_lower_addr: u16,
    pub heap_lower_addr: u16,
    pub heap_size: u16,
    pub stack_lower_addr: u16,
}

impl Default for MemoryLayout {
    fn default() -> MemoryLayout {
        MemoryLayout {
            instruction_ptr_start: INSTRUCTION_PTR_START,
            text_lower_addr: TEXT_LOWER_ADDR,
            data_lower_addr: DATA_LOWER_ADDR,
            heap_lower_addr: HEAP_LOWER_ADDR,
            heap_size: HEAP_SIZE,
            stack_lower_addr: STACK_LOWER_ADDR,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "vm")]
    pub vm: VmConfig,
    #[serde(rename = "assembler")]
    pub assembler: AssemblerConfig,
    #[serde(rename = "compiler")]
    pub compiler: CompilerConfig,
    #[serde(rename = "memory")]
    pub memory: MemoryLayout,
}

impl Config {
    /// loads `path` if given and present, otherwise returns the default
    /// layout. a present-but-unparsable file is a hard error; an absent one
    /// quietly falls back, matching a batch tool's expectations.
    pub fn load(path: Option<&Path>) -> Config {
        let path = match path {
            Some(p) => p,
            None => return Config::default(),
        };
        match fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text).unwrap_or_default(),
            Err(_) => Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_conventional_memory_layout() {
        let cfg = Config::default();
        assert_eq!(cfg.memory.instruction_ptr_start, INSTRUCTION_PTR_START);
        assert_eq!(cfg.memory.stack_lower_addr, STACK_LOWER_ADDR);
        assert_eq!(cfg.vm.clock_hz, 5_000_000);
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let cfg = Config::load(Some(Path::new("/nonexistent/tpu.toml")));
        assert_eq!(cfg.vm.clock_hz, 5_000_000);
    }
}
