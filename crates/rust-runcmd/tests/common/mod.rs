//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use rust_runcmd::{LoopConfig, RunConfig, RunOptions};

/// Engine configuration with a short poll cadence.
pub fn fast_config() -> RunConfig {
    RunConfig::new().poll(
        LoopConfig::default()
            .init_delay(Duration::from_millis(10))
            .main_delay(Duration::from_millis(20)),
    )
}

/// Run options using [`fast_config`].
pub fn fast_options() -> RunOptions {
    RunOptions::new().config(fast_config())
}

/// Whether `pid` is gone (or a zombie), waiting up to two seconds for it.
pub fn process_gone(pid: u32) -> bool {
    for _ in 0..100 {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => return true,
            Ok(stat) => {
                // The state follows the parenthesised command name.
                let state = stat.rsplit(')').next().map(str::trim_start);
                if state.is_some_and(|s| s.starts_with('Z') || s.starts_with('X')) {
                    return true;
                }
            }
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

/// Read a pid written by a test script.
pub fn read_pid(path: &Path) -> u32 {
    std::fs::read_to_string(path)
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}

/// What follows `marker` on each line of `output` containing it.
pub fn after_marker(output: &[u8], marker: &str) -> Vec<String> {
    String::from_utf8_lossy(output)
        .lines()
        .filter_map(|line| line.split_once(marker).map(|(_, rest)| rest))
        .map(str::to_string)
        .collect()
}
