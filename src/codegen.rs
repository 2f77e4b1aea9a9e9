//! Code-generator collaborator interface.
//!
//! The code generator owns kernel emission; the optimiser only needs to
//! re-invoke it with different candidate block sizes and to borrow its
//! connectivity-aware workload sizing.

use std::path::Path;

use crate::backend::Backend;
use crate::error::Result;
use crate::model::{Connectivity, ModelInfo, SynapseGroup};

/// Connectivity-aware thread-count sizing for synaptic kernels.
///
/// The defaults assume one thread per postsynaptic target (dense) or per
/// row slot (sparse); real code generators override these to match their
/// parallelisation strategy.
pub trait SynapseKernelSizing {
    /// Threads needed for one group's presynaptic update.
    fn presynaptic_update_threads(&self, group: &SynapseGroup) -> usize {
        match group.connectivity {
            Connectivity::Dense => group.num_trg_neurons,
            Connectivity::Sparse => group.max_row_length,
        }
    }

    /// Threads needed for one group's postsynaptic learning update.
    fn postsynaptic_update_threads(&self, group: &SynapseGroup) -> usize {
        group.num_src_neurons
    }

    /// Threads needed for one group's synapse-dynamics update.
    fn synapse_dynamics_threads(&self, group: &SynapseGroup) -> usize {
        match group.connectivity {
            Connectivity::Dense => group.num_src_neurons * group.num_trg_neurons,
            Connectivity::Sparse => group.num_src_neurons * group.max_row_length,
        }
    }
}

/// External code generator driven during the measurement rounds.
pub trait CodeGenerator: SynapseKernelSizing {
    /// Emits one source module per logical compilation unit into
    /// `output_dir`, sized to the block-size assignment carried by
    /// `backend`, and returns the module names (without extension).
    fn generate(
        &self,
        model: &ModelInfo,
        backend: &Backend,
        output_dir: &Path,
    ) -> Result<Vec<String>>;
}
