//! Kernel identities and per-kernel block-size assignments.

use std::fmt;
use std::ops::{Index, IndexMut};

/// One GPU kernel per simulation pipeline stage.
///
/// The set is closed and known at build time; module probing looks each
/// entry point up by [`Kernel::entry_point`] name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kernel {
    /// Per-timestep neuron state update.
    NeuronUpdate,
    /// Spike propagation along synapses.
    PresynapticUpdate,
    /// Postsynaptic learning rules.
    PostsynapticUpdate,
    /// Continuous synapse dynamics.
    SynapseDynamicsUpdate,
    /// Dense state initialization.
    Initialize,
    /// Sparse-connectivity state initialization.
    InitializeSparse,
    /// Per-timestep neuron bookkeeping reset.
    PreNeuronReset,
    /// Per-timestep synapse bookkeeping reset.
    PreSynapseReset,
}

impl Kernel {
    /// Number of kernel kinds.
    pub const COUNT: usize = 8;

    /// All kernel kinds, in pipeline order.
    pub const ALL: [Kernel; Kernel::COUNT] = [
        Kernel::NeuronUpdate,
        Kernel::PresynapticUpdate,
        Kernel::PostsynapticUpdate,
        Kernel::SynapseDynamicsUpdate,
        Kernel::Initialize,
        Kernel::InitializeSparse,
        Kernel::PreNeuronReset,
        Kernel::PreSynapseReset,
    ];

    /// Entry-point name of this kernel in compiled modules.
    #[must_use]
    pub fn entry_point(self) -> &'static str {
        match self {
            Kernel::NeuronUpdate => "neuron_update_kernel",
            Kernel::PresynapticUpdate => "presynaptic_update_kernel",
            Kernel::PostsynapticUpdate => "postsynaptic_update_kernel",
            Kernel::SynapseDynamicsUpdate => "synapse_dynamics_kernel",
            Kernel::Initialize => "initialize_kernel",
            Kernel::InitializeSparse => "initialize_sparse_kernel",
            Kernel::PreNeuronReset => "pre_neuron_reset_kernel",
            Kernel::PreSynapseReset => "pre_synapse_reset_kernel",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}

/// Thread-block size chosen for each kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelBlockSize([usize; Kernel::COUNT]);

impl KernelBlockSize {
    /// Creates an assignment with every kernel set to `threads`.
    #[must_use]
    pub fn uniform(threads: usize) -> Self {
        Self([threads; Kernel::COUNT])
    }

    /// Sets every kernel's block size to `threads`.
    pub fn fill(&mut self, threads: usize) {
        self.0 = [threads; Kernel::COUNT];
    }

    /// Iterates over `(kernel, block size)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Kernel, usize)> + '_ {
        Kernel::ALL.iter().map(move |&k| (k, self.0[k.index()]))
    }
}

impl Index<Kernel> for KernelBlockSize {
    type Output = usize;

    fn index(&self, kernel: Kernel) -> &usize {
        &self.0[kernel.index()]
    }
}

impl IndexMut<Kernel> for KernelBlockSize {
    fn index_mut(&mut self, kernel: Kernel) -> &mut usize {
        &mut self.0[kernel.index()]
    }
}
