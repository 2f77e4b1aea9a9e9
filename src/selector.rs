//! Device selection across all available devices.

use crate::backend::Preferences;
use crate::device::{DeviceLayer, DeviceProps};
use crate::error::{BackendError, Result};
use crate::kernel::KernelBlockSize;
use crate::model::ModelInfo;
use crate::optimiser::{optimize_block_size, OptimisationOutput, Toolchain};

/// Ranking key for one device's optimisation outcome.
///
/// Field order defines the lexicographic preference: more small-model
/// kernels first, then higher total occupancy, then newer SM version.
/// The derived `Ord` compares exactly in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct DeviceRank {
    small_model_kernels: usize,
    total_occupancy: usize,
    sm_version: u32,
}

impl DeviceRank {
    fn new(output: &OptimisationOutput, props: &DeviceProps) -> Self {
        Self {
            small_model_kernels: output.values().filter(|k| k.small_model).count(),
            total_occupancy: output.values().map(|k| k.occupancy).sum(),
            sm_version: props.sm_version(),
        }
    }
}

/// Optimises every available device and returns the best one with its
/// block-size assignment.
///
/// A device whose pass fails is skipped with a warning; the call fails
/// only when no device is enumerated or every pass fails.
pub fn choose_optimal_device(
    model: &ModelInfo,
    preferences: &Preferences,
    toolchain: &Toolchain<'_>,
) -> Result<(usize, KernelBlockSize)> {
    let device_count = toolchain.devices.device_count()?;
    if device_count == 0 {
        return Err(BackendError::NoDeviceFound);
    }

    let mut best: Option<(usize, DeviceRank, KernelBlockSize)> = None;
    let mut last_error = None;

    for device in 0..device_count {
        let outcome = toolchain
            .devices
            .capabilities(device)
            .and_then(|props| {
                let (block_size, output) =
                    optimize_block_size(device, model, preferences, toolchain)?;
                Ok((DeviceRank::new(&output, &props), block_size))
            });

        match outcome {
            Ok((rank, block_size)) => {
                tracing::debug!(
                    device,
                    small_model_kernels = rank.small_model_kernels,
                    total_occupancy = rank.total_occupancy,
                    sm_version = rank.sm_version,
                    "device optimised"
                );
                // Only a strictly better rank replaces; ties keep the
                // first device encountered.
                if best.as_ref().map_or(true, |(_, b, _)| rank > *b) {
                    best = Some((device, rank, block_size));
                }
            }
            Err(e) => {
                tracing::warn!(device, error = %e, "optimisation pass failed, skipping device");
                last_error = Some(e);
            }
        }
    }

    match best {
        Some((device, rank, block_size)) => {
            tracing::info!(
                device,
                small_model_kernels = rank.small_model_kernels,
                total_occupancy = rank.total_occupancy,
                sm_version = rank.sm_version,
                "optimal device selected"
            );
            Ok((device, block_size))
        }
        None => Err(last_error.unwrap_or(BackendError::NoDeviceFound)),
    }
}

/// Returns the device with the most total global memory.
///
/// Ties keep the lowest device id. Zero devices is fatal.
pub fn choose_device_with_most_memory(devices: &dyn DeviceLayer) -> Result<usize> {
    let device_count = devices.device_count()?;
    if device_count == 0 {
        return Err(BackendError::NoDeviceFound);
    }

    let mut best = 0;
    let mut most_memory = 0;
    for device in 0..device_count {
        let props = devices.capabilities(device)?;
        if props.total_global_mem > most_memory {
            most_memory = props.total_global_mem;
            best = device;
        }
    }

    tracing::info!(
        device = best,
        total_global_mem = most_memory,
        "selected device with most global memory"
    );
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_prefers_small_model_count_first() {
        let a = DeviceRank {
            small_model_kernels: 3,
            total_occupancy: 100,
            sm_version: 52,
        };
        let b = DeviceRank {
            small_model_kernels: 2,
            total_occupancy: 100_000,
            sm_version: 90,
        };
        assert!(a > b);
    }

    #[test]
    fn rank_breaks_ties_on_occupancy_then_sm_version() {
        let base = DeviceRank {
            small_model_kernels: 2,
            total_occupancy: 1000,
            sm_version: 61,
        };
        let more_occupancy = DeviceRank {
            total_occupancy: 2000,
            sm_version: 35,
            ..base
        };
        assert!(more_occupancy > base);

        let newer = DeviceRank {
            sm_version: 70,
            ..base
        };
        assert!(newer > base);
        assert_eq!(base.cmp(&base), std::cmp::Ordering::Equal);
    }
}
