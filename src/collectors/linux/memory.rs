use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};

use crate::collectors::{percent, SampleError};

const PROC_MEMINFO: &str = "/proc/meminfo";

/// Reads `/proc/meminfo` and returns the used share of physical memory.
pub fn read_used_percent() -> Result<f64, SampleError> {
    let file = fs::File::open(PROC_MEMINFO).map_err(SampleError::io(PROC_MEMINFO))?;
    let meminfo = parse_meminfo(BufReader::new(file))?;
    used_percent(&meminfo)
}

/// Parses `Key:  value kB` lines into a map of raw kB values.
pub fn parse_meminfo<R: BufRead>(reader: R) -> Result<HashMap<String, u64>, SampleError> {
    let mut meminfo = HashMap::new();

    for line in reader.lines() {
        let line = line.map_err(SampleError::io(PROC_MEMINFO))?;
        let mut parts = line.split_whitespace();
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if let Ok(value) = value.parse() {
                meminfo.insert(key.trim_end_matches(':').to_string(), value);
            }
        }
    }

    Ok(meminfo)
}

/// Used memory is `MemTotal - MemAvailable`, matching what `free` reports as
/// unavailable to new allocations.
pub fn used_percent(meminfo: &HashMap<String, u64>) -> Result<f64, SampleError> {
    let total = *meminfo.get("MemTotal").ok_or(SampleError::Empty("memory"))?;
    let available = match meminfo.get("MemAvailable") {
        Some(available) => *available,
        // Kernels before 3.14 lack MemAvailable.
        None => ["MemFree", "Buffers", "Cached"]
            .iter()
            .filter_map(|key| meminfo.get(*key))
            .sum(),
    };
    let used = total.saturating_sub(available);
    percent(used as f64, total as f64, "memory")
}
