//! Device-layer interface consumed by the optimiser.
//!
//! The optimiser talks to CUDA through the [`DeviceLayer`] trait so the
//! search itself stays testable without hardware. The real implementation
//! lives in the `cuda` module behind the `cuda` feature.

use std::path::Path;

use crate::error::Result;
use crate::kernel::Kernel;

/// Read-only capability snapshot of one device.
///
/// Queried once per optimisation pass and treated as immutable for its
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProps {
    /// Compute capability major version.
    pub major: u32,
    /// Compute capability minor version.
    pub minor: u32,
    /// Maximum threads in one block.
    pub max_threads_per_block: usize,
    /// Maximum threads resident on one multiprocessor.
    pub max_threads_per_multiprocessor: usize,
    /// Registers available to one block.
    pub regs_per_block: usize,
    /// Shared memory per multiprocessor in bytes.
    pub shared_mem_per_multiprocessor: usize,
    /// Number of multiprocessors.
    pub multiprocessor_count: usize,
    /// Total global memory in bytes.
    pub total_global_mem: usize,
}

impl DeviceProps {
    /// SM version as `major * 10 + minor`.
    #[must_use]
    pub fn sm_version(&self) -> u32 {
        self.major * 10 + self.minor
    }
}

/// Compiled resource usage of one kernel entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelResources {
    /// Registers per thread.
    pub registers: usize,
    /// Static shared memory in bytes.
    pub shared_mem_bytes: usize,
}

/// The device driver operations the optimiser needs.
///
/// One context may be active at a time per layer; [`DeviceContext`] wraps
/// the acquire/release pair so every exit path releases it.
pub trait DeviceLayer {
    /// Number of devices available.
    fn device_count(&self) -> Result<usize>;

    /// Capability snapshot for `device`.
    fn capabilities(&self, device: usize) -> Result<DeviceProps>;

    /// Creates a driver context on `device` and makes it current.
    fn acquire_context(&self, device: usize) -> Result<()>;

    /// Re-binds the active context to the calling thread.
    ///
    /// External toolchain invocations can clobber the current context, so
    /// the optimiser calls this before touching device resources again.
    fn make_current(&self) -> Result<()>;

    /// Destroys the active context.
    fn release_context(&self) -> Result<()>;

    /// Loads the compiled module at `binary`, reads the register and
    /// shared-memory usage of every kernel entry point present in it, and
    /// unloads it again.
    ///
    /// Kernels absent from the module are simply not in the returned list;
    /// not every kernel kind appears in every module.
    fn probe_module(&self, binary: &Path) -> Result<Vec<(Kernel, KernelResources)>>;
}

/// Scoped device context: released when dropped, on every exit path.
pub struct DeviceContext<'a> {
    layer: &'a dyn DeviceLayer,
    released: bool,
}

impl<'a> DeviceContext<'a> {
    /// Acquires a context on `device`.
    pub fn acquire(layer: &'a dyn DeviceLayer, device: usize) -> Result<Self> {
        layer.acquire_context(device)?;
        Ok(Self {
            layer,
            released: false,
        })
    }

    /// Re-binds the context to the calling thread.
    pub fn make_current(&self) -> Result<()> {
        self.layer.make_current()
    }

    /// Releases the context, surfacing any driver error.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.layer.release_context()
    }
}

impl Drop for DeviceContext<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.layer.release_context() {
                tracing::warn!(error = %e, "failed to release device context");
            }
        }
    }
}
