//! Backend configuration and the top-level factory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::kernel::{Kernel, KernelBlockSize};
use crate::model::ModelInfo;
use crate::optimiser::{optimize_block_size, Toolchain};
use crate::selector::{choose_device_with_most_memory, choose_optimal_device};

/// Caller-supplied optimisation preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Rank all devices by optimisation outcome instead of picking the one
    /// with the most global memory.
    pub auto_choose_device: bool,
    /// Extra flags passed verbatim to the external compiler.
    pub compiler_flags: String,
    /// Directory the code generator emits modules into.
    pub output_directory: PathBuf,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_choose_device: true,
            compiler_flags: String::new(),
            output_directory: PathBuf::from("."),
        }
    }
}

/// A configured CUDA backend: target device plus per-kernel block sizes.
///
/// Constructed repeatedly with candidate block sizes during the
/// measurement rounds and once more with the optimised assignment.
#[derive(Debug, Clone)]
pub struct Backend {
    device: usize,
    block_size: KernelBlockSize,
    preferences: Preferences,
}

impl Backend {
    /// Creates a backend configuration.
    #[must_use]
    pub fn new(device: usize, block_size: KernelBlockSize, preferences: Preferences) -> Self {
        Self {
            device,
            block_size,
            preferences,
        }
    }

    /// Target device id.
    #[must_use]
    pub fn device(&self) -> usize {
        self.device
    }

    /// Block size assigned to `kernel`.
    #[must_use]
    pub fn kernel_block_size(&self, kernel: Kernel) -> usize {
        self.block_size[kernel]
    }

    /// The full per-kernel block-size assignment.
    #[must_use]
    pub fn block_size(&self) -> &KernelBlockSize {
        &self.block_size
    }

    /// Preferences this backend was configured with.
    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }
}

/// Builds a configured backend for `model`.
///
/// With `auto_choose_device` set, every device is optimised and ranked;
/// otherwise the device with the most global memory is optimised alone.
/// Both paths fail with [`crate::BackendError::NoDeviceFound`] when no
/// device is enumerated.
pub fn create_backend(
    model: &ModelInfo,
    preferences: &Preferences,
    toolchain: &Toolchain<'_>,
) -> Result<Backend> {
    let (device, block_size) = if preferences.auto_choose_device {
        choose_optimal_device(model, preferences, toolchain)?
    } else {
        let device = choose_device_with_most_memory(toolchain.devices)?;
        let (block_size, _) = optimize_block_size(device, model, preferences, toolchain)?;
        (device, block_size)
    };

    Ok(Backend::new(device, block_size, preferences.clone()))
}
