//! Read-only view of the simulation model consumed by the optimiser.
//!
//! The code generator owns the full model description; the optimiser only
//! needs group lists, per-group element counts, connectivity kinds and
//! initialization flags, so that is all this boundary exposes.

/// Synaptic connectivity representation of a synapse group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Full source×target matrix.
    Dense,
    /// Row-compressed sparse matrix with a bounded row length.
    Sparse,
}

/// One population of simulated units.
#[derive(Debug, Clone)]
pub struct NeuronGroup {
    /// Group name, unique within the model.
    pub name: String,
    /// Number of neurons in the group.
    pub num_neurons: usize,
    /// Whether the group draws per-neuron random state during simulation.
    pub sim_rng_required: bool,
    /// Whether any state variable needs on-device initialization.
    pub var_init_required: bool,
}

impl NeuronGroup {
    /// Creates a group with no on-device initialization requirements.
    #[must_use]
    pub fn new(name: impl Into<String>, num_neurons: usize) -> Self {
        Self {
            name: name.into(),
            num_neurons,
            sim_rng_required: false,
            var_init_required: false,
        }
    }

    /// Builder method to require a per-neuron simulation RNG.
    #[must_use]
    pub fn with_sim_rng(mut self) -> Self {
        self.sim_rng_required = true;
        self
    }

    /// Builder method to require on-device variable initialization.
    #[must_use]
    pub fn with_var_init(mut self) -> Self {
        self.var_init_required = true;
        self
    }

    /// Whether this group contributes to the initialize kernel.
    #[must_use]
    pub fn requires_device_init(&self) -> bool {
        self.sim_rng_required || self.var_init_required
    }
}

/// One group of synaptic connections between two neuron groups.
#[derive(Debug, Clone)]
pub struct SynapseGroup {
    /// Group name, unique within the model.
    pub name: String,
    /// Neuron count of the presynaptic group.
    pub num_src_neurons: usize,
    /// Neuron count of the postsynaptic group.
    pub num_trg_neurons: usize,
    /// Connectivity representation.
    pub connectivity: Connectivity,
    /// Upper bound on connections per presynaptic neuron (sparse only;
    /// equals the target count for dense groups).
    pub max_row_length: usize,
    /// Whether each connection carries its own weight state.
    pub individual_weights: bool,
    /// Whether weight state needs on-device initialization.
    pub weight_init_required: bool,
    /// Whether the weight-update model defines postsynaptic learning code.
    pub postsynaptic_learning: bool,
    /// Whether this group needs a per-timestep pre-synapse reset step.
    pub pre_synapse_reset_required: bool,
}

impl SynapseGroup {
    /// Creates a dense synapse group with global weights and no learning.
    #[must_use]
    pub fn dense(name: impl Into<String>, num_src: usize, num_trg: usize) -> Self {
        Self {
            name: name.into(),
            num_src_neurons: num_src,
            num_trg_neurons: num_trg,
            connectivity: Connectivity::Dense,
            max_row_length: num_trg,
            individual_weights: false,
            weight_init_required: false,
            postsynaptic_learning: false,
            pre_synapse_reset_required: false,
        }
    }

    /// Creates a sparse synapse group bounded to `max_row_length`
    /// connections per presynaptic neuron.
    #[must_use]
    pub fn sparse(
        name: impl Into<String>,
        num_src: usize,
        num_trg: usize,
        max_row_length: usize,
    ) -> Self {
        Self {
            max_row_length,
            connectivity: Connectivity::Sparse,
            ..Self::dense(name, num_src, num_trg)
        }
    }

    /// Builder method to give each connection individually initialized
    /// weight state.
    #[must_use]
    pub fn with_individual_weights(mut self) -> Self {
        self.individual_weights = true;
        self.weight_init_required = true;
        self
    }

    /// Builder method to attach postsynaptic learning code.
    #[must_use]
    pub fn with_postsynaptic_learning(mut self) -> Self {
        self.postsynaptic_learning = true;
        self
    }

    /// Builder method to require a pre-synapse reset step.
    #[must_use]
    pub fn with_pre_synapse_reset(mut self) -> Self {
        self.pre_synapse_reset_required = true;
        self
    }

    /// Whether weight state must be initialized on the device.
    #[must_use]
    pub fn requires_weight_init(&self) -> bool {
        self.individual_weights && self.weight_init_required
    }
}

/// The facts about a model that block-size optimisation consumes.
#[derive(Debug, Clone, Default)]
pub struct ModelInfo {
    /// Simulated unit groups.
    pub neuron_groups: Vec<NeuronGroup>,
    /// Connection groups.
    pub synapse_groups: Vec<SynapseGroup>,
}

impl ModelInfo {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add a neuron group.
    #[must_use]
    pub fn with_neuron_group(mut self, group: NeuronGroup) -> Self {
        self.neuron_groups.push(group);
        self
    }

    /// Builder method to add a synapse group.
    #[must_use]
    pub fn with_synapse_group(mut self, group: SynapseGroup) -> Self {
        self.synapse_groups.push(group);
        self
    }

    /// Number of synapse groups needing a pre-synapse reset step.
    #[must_use]
    pub fn pre_synapse_reset_group_count(&self) -> usize {
        self.synapse_groups
            .iter()
            .filter(|s| s.pre_synapse_reset_required)
            .count()
    }
}
