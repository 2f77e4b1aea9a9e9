//! Error types for backend selection and block-size optimisation.

use std::path::PathBuf;

/// Errors surfaced while optimising block sizes or selecting a device.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No CUDA-capable device was enumerated.
    #[error("no CUDA devices found")]
    NoDeviceFound,

    /// The external compiler exited with a non-zero status for a module.
    ///
    /// This aborts the current device's optimisation pass; the device
    /// context is released before the error propagates.
    #[error("compilation of module '{}' failed (exit code {code:?})", module.display())]
    CompileFailed {
        /// Path of the source module that failed to compile.
        module: PathBuf,
        /// Exit code of the compiler process, if it exited normally.
        code: Option<i32>,
    },

    /// A device driver call failed.
    #[error("device driver error: {0}")]
    Driver(String),

    /// The external code generator failed to emit modules.
    #[error("code generation failed: {0}")]
    CodeGen(String),

    /// An I/O error while driving the external toolchain.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, BackendError>;
