//! CUDA backend selection and kernel block-size optimisation for the
//! spikegen code generator.
//!
//! Given the derived workload of a simulation model, this crate picks a
//! thread-block size per GPU kernel that maximises hardware occupancy on a
//! specific device, and optionally picks which device to target. The
//! search is empirical: the model is generated and compiled at two
//! reference block sizes, the compiled kernels' register and shared-memory
//! usage is read back through the driver API, and a hand-derived
//! architectural cost model extrapolates occupancy across all candidate
//! block sizes.
//!
//! # Example
//!
//! ```ignore
//! use spikegen_cuda::{create_backend, Preferences, Toolchain};
//!
//! let preferences = Preferences::default();
//! let toolchain = Toolchain {
//!     codegen: &generator,
//!     compiler: &spikegen_cuda::NvccCompiler::new(),
//!     devices: &spikegen_cuda::cuda::CudaDriver::new()?,
//! };
//! let backend = create_backend(&model, &preferences, &toolchain)?;
//! println!("targeting device {}", backend.device());
//! ```

#![warn(missing_docs)]

pub mod arch;
pub mod backend;
pub mod codegen;
pub mod compile;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod device;
mod error;
pub mod kernel;
pub mod model;
pub mod optimiser;
pub mod selector;
mod util;
pub mod workload;

pub use arch::ArchParams;
pub use backend::{create_backend, Backend, Preferences};
pub use codegen::{CodeGenerator, SynapseKernelSizing};
pub use compile::{ModuleCompiler, NvccCompiler};
pub use device::{DeviceContext, DeviceLayer, DeviceProps, KernelResources};
pub use error::{BackendError, Result};
pub use kernel::{Kernel, KernelBlockSize};
pub use model::{Connectivity, ModelInfo, NeuronGroup, SynapseGroup};
pub use optimiser::{
    optimize_block_size, KernelOptimisation, OptimisationOutput, Toolchain, WARP_SIZE,
};
pub use selector::{choose_device_with_most_memory, choose_optimal_device};
pub use workload::WorkloadSizes;
