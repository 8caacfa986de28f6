// ─── Memory Policy ───

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::LauncherError;

pub const AUTO_FRACTION_DIVISOR: u64 = 4;
pub const AUTO_MIN_MIB: u64 = 1024;
pub const AUTO_MAX_MIB: u64 = 4096;
pub const AUTO_FALLBACK_MIB: u64 = 2048;

/// Heap size for the game process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawMemoryPolicy", into = "RawMemoryPolicy")]
pub enum MemoryPolicy {
    /// A quarter of system memory, clamped to [1 GiB, 4 GiB].
    #[default]
    Auto,
    /// Explicit size in MiB.
    Explicit(u64),
}

impl MemoryPolicy {
    /// Heap size in MiB for a machine with `total_memory_bytes` of RAM.
    pub fn resolve_mib(&self, total_memory_bytes: Option<u64>) -> u64 {
        match *self {
            MemoryPolicy::Explicit(mib) => mib,
            MemoryPolicy::Auto => match total_memory_bytes {
                Some(total) if total > 0 => {
                    (total / (1024 * 1024) / AUTO_FRACTION_DIVISOR).clamp(AUTO_MIN_MIB, AUTO_MAX_MIB)
                }
                _ => AUTO_FALLBACK_MIB,
            },
        }
    }
}

impl FromStr for MemoryPolicy {
    type Err = LauncherError;

    /// Accepts `auto`, `4096`, `4096M`, `4G` (case-insensitive units).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim().to_ascii_lowercase();
        if text == "auto" {
            return Ok(MemoryPolicy::Auto);
        }

        let invalid = || LauncherError::Config(format!("invalid memory size: {raw:?}"));
        let (digits, multiplier) = match text.strip_suffix('g') {
            Some(d) => (d, 1024),
            None => (text.strip_suffix('m').unwrap_or(&text), 1),
        };
        let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
        match value.checked_mul(multiplier) {
            Some(mib) if mib > 0 => Ok(MemoryPolicy::Explicit(mib)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for MemoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryPolicy::Auto => write!(f, "auto"),
            MemoryPolicy::Explicit(mib) => write!(f, "{mib}M"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawMemoryPolicy {
    Mib(u64),
    Text(String),
}

impl TryFrom<RawMemoryPolicy> for MemoryPolicy {
    type Error = LauncherError;

    fn try_from(raw: RawMemoryPolicy) -> Result<Self, Self::Error> {
        match raw {
            RawMemoryPolicy::Mib(0) => Err(LauncherError::Config("memory size is zero".into())),
            RawMemoryPolicy::Mib(mib) => Ok(MemoryPolicy::Explicit(mib)),
            RawMemoryPolicy::Text(text) => text.parse(),
        }
    }
}

impl From<MemoryPolicy> for RawMemoryPolicy {
    fn from(policy: MemoryPolicy) -> Self {
        match policy {
            MemoryPolicy::Auto => RawMemoryPolicy::Text("auto".into()),
            MemoryPolicy::Explicit(mib) => RawMemoryPolicy::Mib(mib),
        }
    }
}

/// Host facts the assembler needs, gathered up front so assembly stays pure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemProfile {
    pub total_memory_bytes: Option<u64>,
}

impl SystemProfile {
    pub fn detect() -> Self {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        Self {
            total_memory_bytes: (total > 0).then_some(total),
        }
    }
}
