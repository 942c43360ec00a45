//! Compute device selection.
//!
//! The process picks a device once at startup and sticks with it.
//! Individual builds may still fall back to the CPU when the
//! accelerator does not have enough free memory for the object being
//! built.

use std::sync::OnceLock;

use tracing::{info, warn};

/// Environment variable naming the preferred device (`cpu` or `accel:<index>`).
pub const DEVICE_ENV: &str = "VERIDEX_DEVICE";
/// Environment variable reporting free accelerator memory in MiB.
pub const ACCEL_FREE_MB_ENV: &str = "VERIDEX_ACCEL_FREE_MB";

/// Rough memory footprint of one model build, in MiB.
pub const DEFAULT_MODEL_MEMORY_MB: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Accelerator(usize),
}

static RESOLVED: OnceLock<Device> = OnceLock::new();

impl Device {
    /// The process-wide device, resolved once from the environment.
    pub fn resolve() -> Device {
        *RESOLVED.get_or_init(|| {
            let device = Self::from_env();
            info!(?device, "resolved compute device");
            device
        })
    }

    fn from_env() -> Device {
        match std::env::var(DEVICE_ENV).ok().as_deref() {
            Some("cpu") | None => Device::Cpu,
            Some(value) => match value.strip_prefix("accel:").and_then(|i| i.parse().ok()) {
                Some(index) => Device::Accelerator(index),
                None => {
                    warn!(value, "unrecognized device setting, using cpu");
                    Device::Cpu
                }
            },
        }
    }

    /// Device to use for one build that needs `required_mb` of memory.
    /// Falls back to the CPU when the accelerator cannot fit it.
    pub fn for_build(required_mb: u64) -> Device {
        let device = Self::resolve();
        if device == Device::Cpu {
            return device;
        }
        let free_mb = std::env::var(ACCEL_FREE_MB_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(u64::MAX);
        if free_mb < required_mb {
            warn!(free_mb, required_mb, "accelerator memory low, building on cpu");
            return Device::Cpu;
        }
        device
    }
}
