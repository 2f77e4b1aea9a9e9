//! Mock toolchain collaborators for optimiser integration tests.
#![allow(dead_code)] // not every test binary uses every helper

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use spikegen_cuda::{
    Backend, BackendError, CodeGenerator, DeviceLayer, DeviceProps, Kernel, KernelResources,
    ModelInfo, ModuleCompiler, Result, SynapseKernelSizing, Toolchain,
};

/// Synthetic compiled-resource model for one kernel: registers are
/// constant, shared memory is `smem_slope * threads + smem_base`.
#[derive(Debug, Clone, Copy)]
pub struct KernelCost {
    pub kernel: Kernel,
    pub registers: usize,
    pub smem_slope: usize,
    pub smem_base: usize,
    /// Bytes of shared memory lost per thread, for kernels whose
    /// measured usage shrinks as blocks grow.
    pub smem_drop_per_thread: usize,
}

impl KernelCost {
    pub fn new(kernel: Kernel, registers: usize) -> Self {
        Self {
            kernel,
            registers,
            smem_slope: 0,
            smem_base: 0,
            smem_drop_per_thread: 0,
        }
    }

    pub fn with_shared_mem(mut self, slope: usize, base: usize) -> Self {
        self.smem_slope = slope;
        self.smem_base = base;
        self
    }

    pub fn with_shrinking_shared_mem(mut self, base: usize, drop_per_thread: usize) -> Self {
        self.smem_base = base;
        self.smem_drop_per_thread = drop_per_thread;
        self
    }
}

/// Implements all three collaborator traits against synthetic devices.
pub struct MockToolchain {
    pub devices: Vec<DeviceProps>,
    pub kernels: Vec<KernelCost>,
    /// Device whose modules fail to compile, if any.
    pub fail_compile_on: Option<usize>,
    block_size: AtomicUsize,
    context: Mutex<Option<usize>>,
    pub releases: AtomicUsize,
}

impl MockToolchain {
    pub fn new(devices: Vec<DeviceProps>, kernels: Vec<KernelCost>) -> Self {
        Self {
            devices,
            kernels,
            fail_compile_on: None,
            block_size: AtomicUsize::new(0),
            context: Mutex::new(None),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn toolchain(&self) -> Toolchain<'_> {
        Toolchain {
            codegen: self,
            compiler: self,
            devices: self,
        }
    }

    pub fn context_active(&self) -> bool {
        self.context.lock().unwrap().is_some()
    }
}

/// A device shaped like the reference synthetic environment: SM 7.0,
/// 1024 threads/block, 2048 threads/SM, 48KiB shared per SM.
pub fn volta_like(multiprocessor_count: usize, total_global_mem: usize) -> DeviceProps {
    DeviceProps {
        major: 7,
        minor: 0,
        max_threads_per_block: 1024,
        max_threads_per_multiprocessor: 2048,
        regs_per_block: 65536,
        shared_mem_per_multiprocessor: 49152,
        multiprocessor_count,
        total_global_mem,
    }
}

impl SynapseKernelSizing for MockToolchain {}

impl CodeGenerator for MockToolchain {
    fn generate(
        &self,
        _model: &ModelInfo,
        backend: &Backend,
        _output_dir: &Path,
    ) -> Result<Vec<String>> {
        // Reference rounds set a uniform block size; remember it so module
        // probing can report size-dependent shared memory.
        self.block_size.store(
            backend.kernel_block_size(Kernel::NeuronUpdate),
            Ordering::SeqCst,
        );
        Ok(vec!["model".to_string()])
    }
}

impl ModuleCompiler for MockToolchain {
    fn compile(&self, source: &Path, _flags: &str) -> Result<PathBuf> {
        let current = *self.context.lock().unwrap();
        if self.fail_compile_on.is_some() && self.fail_compile_on == current {
            return Err(BackendError::CompileFailed {
                module: source.to_path_buf(),
                code: Some(1),
            });
        }
        Ok(source.with_extension("cubin"))
    }
}

impl DeviceLayer for MockToolchain {
    fn device_count(&self) -> Result<usize> {
        Ok(self.devices.len())
    }

    fn capabilities(&self, device: usize) -> Result<DeviceProps> {
        self.devices
            .get(device)
            .copied()
            .ok_or_else(|| BackendError::Driver(format!("no such device: {device}")))
    }

    fn acquire_context(&self, device: usize) -> Result<()> {
        *self.context.lock().unwrap() = Some(device);
        Ok(())
    }

    fn make_current(&self) -> Result<()> {
        if self.context.lock().unwrap().is_some() {
            Ok(())
        } else {
            Err(BackendError::Driver("no active context".to_string()))
        }
    }

    fn release_context(&self) -> Result<()> {
        let released = self.context.lock().unwrap().take();
        if released.is_none() {
            return Err(BackendError::Driver("no active context".to_string()));
        }
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn probe_module(&self, _binary: &Path) -> Result<Vec<(Kernel, KernelResources)>> {
        let threads = self.block_size.load(Ordering::SeqCst);
        Ok(self
            .kernels
            .iter()
            .map(|cost| {
                (
                    cost.kernel,
                    KernelResources {
                        registers: cost.registers,
                        shared_mem_bytes: (cost.smem_slope * threads + cost.smem_base)
                            .saturating_sub(cost.smem_drop_per_thread * threads),
                    },
                )
            })
            .collect())
    }
}
