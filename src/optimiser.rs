//! Empirical block-size optimisation for one device.
//!
//! Two measurement rounds compile the whole model at reference block sizes
//! of one and two warps and read back each kernel's compiled register and
//! shared-memory usage. Shared memory is modelled as affine in the block
//! size and fitted from the two samples; registers are vector-width and
//! taken from the smaller sample. A discrete search over warp-multiple
//! block sizes then maximises estimated occupancy, preferring the smallest
//! size that lets a kernel's whole workload run concurrently.

use std::collections::BTreeMap;

use crate::arch::ArchParams;
use crate::backend::{Backend, Preferences};
use crate::codegen::CodeGenerator;
use crate::compile::ModuleCompiler;
use crate::device::{DeviceContext, DeviceLayer, KernelResources};
use crate::error::Result;
use crate::kernel::{Kernel, KernelBlockSize};
use crate::model::ModelInfo;
use crate::util::{ceil_divide, pad_size};
use crate::workload::WorkloadSizes;

/// Hardware warp width; candidate block sizes are multiples of this.
pub const WARP_SIZE: usize = 32;

/// Reference block sizes used for the two measurement rounds.
const REP_BLOCK_SIZES: [usize; 2] = [WARP_SIZE, WARP_SIZE * 2];

/// External collaborators driven during an optimisation pass.
pub struct Toolchain<'a> {
    /// Code generator emitting per-kernel source modules.
    pub codegen: &'a dyn CodeGenerator,
    /// Compiler turning source modules into loadable binaries.
    pub compiler: &'a dyn ModuleCompiler,
    /// Device driver layer.
    pub devices: &'a dyn DeviceLayer,
}

/// Per-kernel optimisation outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelOptimisation {
    /// Whether the whole workload fits on the device concurrently at the
    /// chosen block size.
    pub small_model: bool,
    /// Estimated occupancy (resident threads device-wide) at the chosen
    /// block size.
    pub occupancy: usize,
}

/// Optimisation outcome for every kernel present in the compiled model.
pub type OptimisationOutput = BTreeMap<Kernel, KernelOptimisation>;

/// Optimises the per-kernel block sizes for `device`.
///
/// Returns the block-size assignment together with each kernel's
/// small-model flag and achieved occupancy. Compile failure aborts the
/// pass; the device context is released on every exit path.
pub fn optimize_block_size(
    device: usize,
    model: &ModelInfo,
    preferences: &Preferences,
    toolchain: &Toolchain<'_>,
) -> Result<(KernelBlockSize, OptimisationOutput)> {
    let workloads = WorkloadSizes::derive(model, toolchain.codegen);

    // Driver context for reading kernel attributes; scoped so the
    // fatal-compile path still releases it.
    let context = DeviceContext::acquire(toolchain.devices, device)?;

    let mut profiles: [BTreeMap<Kernel, KernelResources>; 2] = Default::default();
    for (rep, &threads) in REP_BLOCK_SIZES.iter().enumerate() {
        tracing::debug!(block_size = threads, "generating code at reference block size");

        let candidate = Backend::new(device, KernelBlockSize::uniform(threads), preferences.clone());
        let modules =
            toolchain
                .codegen
                .generate(model, &candidate, &preferences.output_directory)?;

        // Toolchain invocations can clobber the driver context.
        context.make_current()?;

        for module in &modules {
            let source = preferences.output_directory.join(format!("{module}.cu"));
            let binary = toolchain.compiler.compile(&source, &preferences.compiler_flags)?;

            for (kernel, resources) in toolchain.devices.probe_module(&binary)? {
                tracing::debug!(
                    kernel = %kernel,
                    registers = resources.registers,
                    shared_mem_bytes = resources.shared_mem_bytes,
                    "kernel entry point found"
                );
                profiles[rep].insert(kernel, resources);
            }
        }
    }

    context.release()?;

    let props = toolchain.devices.capabilities(device)?;
    let arch = ArchParams::lookup(props.major, props.minor);

    let mut block_size = KernelBlockSize::default();
    let mut output = OptimisationOutput::new();

    for (&kernel, first) in &profiles[0] {
        // A kernel must appear in both rounds to fit the memory model.
        let Some(second) = profiles[1].get(&kernel) else {
            continue;
        };

        // Registers are per-thread and invariant across block sizes.
        let registers = first.registers;

        // Fit shared bytes = A * blockThreads + B from the two samples.
        let (smem_a, smem_b) =
            fit_shared_mem([first.shared_mem_bytes, second.shared_mem_bytes]);

        let mut best = KernelOptimisation::default();
        let max_block_warps = props.max_threads_per_block / WARP_SIZE;
        for block_warps in 1..max_block_warps {
            let threads = block_warps * WARP_SIZE;

            let padded_smem = pad_size(smem_a * threads + smem_b, arch.smem_alloc_gran);

            let required_blocks: usize = workloads
                .group_sizes(kernel)
                .iter()
                .map(|&size| ceil_divide(size, threads))
                .sum();

            let mut sm_block_limit = props.max_threads_per_multiprocessor / threads;
            sm_block_limit = sm_block_limit.min(arch.max_blocks_per_sm);

            if props.major == 1 {
                // These generations allocate registers per block.
                let padded_warps = pad_size(block_warps, arch.warp_alloc_gran);
                let padded_regs =
                    pad_size(padded_warps * registers * WARP_SIZE, arch.reg_alloc_gran);
                if padded_regs > 0 {
                    sm_block_limit = sm_block_limit.min(props.regs_per_block / padded_regs);
                }
            }
            // Newer generations allocate registers per warp; no register
            // cap is modelled for them.

            if padded_smem != 0 {
                sm_block_limit =
                    sm_block_limit.min(props.shared_mem_per_multiprocessor / padded_smem);
            }

            let occupancy = block_warps * sm_block_limit * props.multiprocessor_count;
            tracing::debug!(
                kernel = %kernel,
                threads,
                padded_smem,
                required_blocks,
                sm_block_limit,
                occupancy,
                "candidate block size"
            );

            if required_blocks <= sm_block_limit * props.multiprocessor_count {
                // The whole workload is resident at once; take the
                // smallest block size that achieves this.
                block_size[kernel] = threads;
                best = KernelOptimisation {
                    small_model: true,
                    occupancy,
                };
                break;
            } else if occupancy > best.occupancy {
                block_size[kernel] = threads;
                best.occupancy = occupancy;
            }
        }

        tracing::info!(
            kernel = %kernel,
            block_size = block_size[kernel],
            small_model = best.small_model,
            occupancy = best.occupancy,
            "selected block size"
        );
        output.insert(kernel, best);
    }

    Ok((block_size, output))
}

/// Fits `bytes(blockThreads) = A * blockThreads + B` to the shared-memory
/// samples measured at the two reference block sizes.
///
/// The slope is truncated to whole bytes per thread, so a delta that is
/// not a warp multiple underestimates usage at larger block sizes. A
/// decreasing sample pair cannot be expressed by this model; it degrades
/// to a constant fit at the larger measurement.
fn fit_shared_mem(samples: [usize; 2]) -> (usize, usize) {
    let Some(delta) = samples[1].checked_sub(samples[0]) else {
        tracing::warn!(
            first = samples[0],
            second = samples[1],
            "shared memory shrank between measurement rounds, using constant fit"
        );
        return (0, samples[0]);
    };
    let a = delta / (REP_BLOCK_SIZES[1] - REP_BLOCK_SIZES[0]);
    let b = samples[0] - a * REP_BLOCK_SIZES[0];
    (a, b)
}
