//! Derives per-kernel workload sizes from the model description.

use crate::codegen::SynapseKernelSizing;
use crate::kernel::Kernel;
use crate::model::{Connectivity, ModelInfo};

/// Ordered per-group element counts for each kernel.
///
/// Built once per optimisation pass and never mutated afterwards; the
/// table is independent of device and block size.
#[derive(Debug, Clone, Default)]
pub struct WorkloadSizes {
    sizes: [Vec<usize>; Kernel::COUNT],
}

impl WorkloadSizes {
    /// Walks the model once and collects each kernel's group sizes.
    #[must_use]
    pub fn derive<S: SynapseKernelSizing + ?Sized>(model: &ModelInfo, sizing: &S) -> Self {
        let mut table = Self::default();

        for group in &model.neuron_groups {
            table.push(Kernel::NeuronUpdate, group.num_neurons);
            if group.requires_device_init() {
                table.push(Kernel::Initialize, group.num_neurons);
            }
        }

        for group in &model.synapse_groups {
            table.push(
                Kernel::PresynapticUpdate,
                sizing.presynaptic_update_threads(group),
            );

            if group.postsynaptic_learning {
                table.push(
                    Kernel::PostsynapticUpdate,
                    sizing.postsynaptic_update_threads(group),
                );
                table.push(
                    Kernel::SynapseDynamicsUpdate,
                    sizing.synapse_dynamics_threads(group),
                );
            }

            if group.requires_weight_init() {
                match group.connectivity {
                    Connectivity::Sparse => {
                        table.push(Kernel::InitializeSparse, group.num_src_neurons);
                    }
                    Connectivity::Dense => {
                        table.push(
                            Kernel::Initialize,
                            group.num_src_neurons * group.num_trg_neurons,
                        );
                    }
                }
            }
        }

        // The reset kernels run one thread per group rather than per element.
        table.push(Kernel::PreNeuronReset, model.neuron_groups.len());
        table.push(
            Kernel::PreSynapseReset,
            model.pre_synapse_reset_group_count(),
        );

        table
    }

    /// Group sizes assigned to `kernel`, in model order.
    #[must_use]
    pub fn group_sizes(&self, kernel: Kernel) -> &[usize] {
        &self.sizes[kernel as usize]
    }

    fn push(&mut self, kernel: Kernel, size: usize) {
        self.sizes[kernel as usize].push(size);
    }
}
