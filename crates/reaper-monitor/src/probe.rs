//! Memory probes.
//!
//! Sampling memory is the expensive part of the memory monitor, which is why
//! it only happens once per check cycle. [`ProcMemoryProbe`] reads Linux
//! `/proc`; hosts with their own accounting can implement [`MemoryProbe`]
//! or pass a closure.

use std::fs;
use std::path::PathBuf;

use reaper_core::{MemoryKind, ProbeError, ProbeResult};

/// Reports how many bytes of memory a process uses.
pub trait MemoryProbe: Send + Sync {
    fn sample(&self, pid: u32, kind: MemoryKind) -> ProbeResult<u64>;
}

impl<F> MemoryProbe for F
where
    F: Fn(u32, MemoryKind) -> ProbeResult<u64> + Send + Sync,
{
    fn sample(&self, pid: u32, kind: MemoryKind) -> ProbeResult<u64> {
        self(pid, kind)
    }
}

/// Reads memory usage from procfs.
///
/// - `rss`: `VmRSS` from `/proc/<pid>/status`
/// - `pss`: `Pss` from `/proc/<pid>/smaps_rollup`
/// - `uss`: `Private_Clean + Private_Dirty` from `/proc/<pid>/smaps_rollup`
#[derive(Debug, Clone)]
pub struct ProcMemoryProbe {
    root: PathBuf,
}

impl Default for ProcMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcMemoryProbe {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Use a different procfs mount point.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, pid: u32, file: &str) -> ProbeResult<(String, String)> {
        let path = self.root.join(pid.to_string()).join(file);
        let display = path.display().to_string();
        let content = fs::read_to_string(&path).map_err(|source| ProbeError::Read {
            path: display.clone(),
            source,
        })?;
        Ok((content, display))
    }
}

impl MemoryProbe for ProcMemoryProbe {
    fn sample(&self, pid: u32, kind: MemoryKind) -> ProbeResult<u64> {
        match kind {
            MemoryKind::Rss => {
                let (content, path) = self.read(pid, "status")?;
                require(kb_field(&content, "VmRSS")?, "VmRSS", &path)
            }
            MemoryKind::Pss => {
                let (content, path) = self.read(pid, "smaps_rollup")?;
                require(kb_field(&content, "Pss")?, "Pss", &path)
            }
            MemoryKind::Uss => {
                let (content, path) = self.read(pid, "smaps_rollup")?;
                let clean = require(kb_field(&content, "Private_Clean")?, "Private_Clean", &path)?;
                let dirty = require(kb_field(&content, "Private_Dirty")?, "Private_Dirty", &path)?;
                Ok(clean.saturating_add(dirty))
            }
        }
    }
}

fn require(value: Option<u64>, field: &'static str, path: &str) -> ProbeResult<u64> {
    value.ok_or_else(|| ProbeError::MissingField {
        field,
        path: path.to_string(),
    })
}

/// Find a `Key:   1234 kB` line and return its value in bytes.
fn kb_field(content: &str, field: &'static str) -> ProbeResult<Option<u64>> {
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() != field {
            continue;
        }
        let number = value.trim();
        let number = number.strip_suffix("kB").unwrap_or(number).trim();
        let kb: u64 = number.parse().map_err(|_| ProbeError::Malformed {
            field,
            value: value.trim().to_string(),
        })?;
        return Ok(Some(kb.saturating_mul(1024)));
    }
    Ok(None)
}
