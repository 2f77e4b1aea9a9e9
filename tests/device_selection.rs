//! Device ranking, fallback selection and the backend factory.

mod common;

use common::{volta_like, KernelCost, MockToolchain};
use spikegen_cuda::{
    choose_device_with_most_memory, choose_optimal_device, create_backend, BackendError,
    DeviceProps, Kernel, ModelInfo, NeuronGroup, Preferences,
};

fn large_model() -> ModelInfo {
    ModelInfo::new().with_neuron_group(NeuronGroup::new("big", 100_000))
}

fn neuron_kernel() -> Vec<KernelCost> {
    vec![KernelCost::new(Kernel::NeuronUpdate, 40)]
}

#[test]
fn higher_occupancy_device_wins() {
    // Identical devices except for multiprocessor count; neither reaches
    // small-model on this workload, so total occupancy decides.
    let mock = MockToolchain::new(
        vec![volta_like(10, 8 << 30), volta_like(20, 8 << 30)],
        neuron_kernel(),
    );
    let preferences = Preferences::default();

    let (device, block_size) =
        choose_optimal_device(&large_model(), &preferences, &mock.toolchain()).unwrap();

    assert_eq!(device, 1);
    assert_eq!(block_size[Kernel::NeuronUpdate], 64);
}

#[test]
fn sm_version_breaks_full_ties() {
    let older = volta_like(20, 8 << 30);
    let newer = DeviceProps {
        minor: 5,
        ..volta_like(20, 8 << 30)
    };

    let mock = MockToolchain::new(vec![older, newer], neuron_kernel());
    let preferences = Preferences::default();

    let (device, _) =
        choose_optimal_device(&large_model(), &preferences, &mock.toolchain()).unwrap();
    assert_eq!(device, 1);
}

#[test]
fn full_ties_keep_the_first_device() {
    let mock = MockToolchain::new(
        vec![volta_like(20, 8 << 30), volta_like(20, 8 << 30)],
        neuron_kernel(),
    );
    let preferences = Preferences::default();

    let (device, _) =
        choose_optimal_device(&large_model(), &preferences, &mock.toolchain()).unwrap();
    assert_eq!(device, 0);
}

#[test]
fn failing_device_is_skipped() {
    let mut mock = MockToolchain::new(
        vec![volta_like(20, 8 << 30), volta_like(10, 8 << 30)],
        neuron_kernel(),
    );
    mock.fail_compile_on = Some(0);
    let preferences = Preferences::default();

    let (device, _) =
        choose_optimal_device(&large_model(), &preferences, &mock.toolchain()).unwrap();
    assert_eq!(device, 1);
}

#[test]
fn selection_fails_when_every_device_fails() {
    let mut mock = MockToolchain::new(vec![volta_like(20, 8 << 30)], neuron_kernel());
    mock.fail_compile_on = Some(0);
    let preferences = Preferences::default();

    let err = choose_optimal_device(&large_model(), &preferences, &mock.toolchain())
        .expect_err("all passes failed");
    assert!(matches!(err, BackendError::CompileFailed { .. }));
}

#[test]
fn zero_devices_is_fatal_on_both_paths() {
    let mock = MockToolchain::new(vec![], neuron_kernel());

    let auto = Preferences::default();
    assert!(matches!(
        create_backend(&large_model(), &auto, &mock.toolchain()),
        Err(BackendError::NoDeviceFound)
    ));

    let manual = Preferences {
        auto_choose_device: false,
        ..Preferences::default()
    };
    assert!(matches!(
        create_backend(&large_model(), &manual, &mock.toolchain()),
        Err(BackendError::NoDeviceFound)
    ));
}

#[test]
fn manual_mode_picks_most_global_memory() {
    let mock = MockToolchain::new(
        vec![
            volta_like(20, 4 << 30),
            volta_like(4, 16 << 30),
            volta_like(40, 8 << 30),
        ],
        neuron_kernel(),
    );

    assert_eq!(choose_device_with_most_memory(&mock).unwrap(), 1);

    // The factory in manual mode optimises only that device, regardless
    // of what the others would have scored.
    let preferences = Preferences {
        auto_choose_device: false,
        ..Preferences::default()
    };
    let backend = create_backend(&large_model(), &preferences, &mock.toolchain()).unwrap();
    assert_eq!(backend.device(), 1);
    assert_eq!(backend.kernel_block_size(Kernel::NeuronUpdate), 64);
}

#[test]
fn auto_mode_returns_the_ranked_winner() {
    let mock = MockToolchain::new(
        vec![volta_like(10, 32 << 30), volta_like(20, 4 << 30)],
        neuron_kernel(),
    );
    let preferences = Preferences::default();

    let backend = create_backend(&large_model(), &preferences, &mock.toolchain()).unwrap();
    // Auto mode ranks by optimisation outcome, not by memory size.
    assert_eq!(backend.device(), 1);
    assert_eq!(backend.kernel_block_size(Kernel::NeuronUpdate), 64);
}
