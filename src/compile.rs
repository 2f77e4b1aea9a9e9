//! External compiler invocation.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{BackendError, Result};

/// Compiles one generated source module into a loadable device binary.
///
/// Invocations are blocking; a non-zero exit is fatal for the current
/// optimisation pass.
pub trait ModuleCompiler {
    /// Compiles `source`, returning the path of the produced binary.
    fn compile(&self, source: &Path, flags: &str) -> Result<PathBuf>;
}

/// `nvcc`-based compiler producing `.cubin` binaries.
#[derive(Debug, Clone)]
pub struct NvccCompiler {
    nvcc: PathBuf,
}

impl NvccCompiler {
    /// Uses the `nvcc` found on `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nvcc: PathBuf::from("nvcc"),
        }
    }

    /// Uses a specific `nvcc` executable.
    #[must_use]
    pub fn with_path(nvcc: impl Into<PathBuf>) -> Self {
        Self { nvcc: nvcc.into() }
    }
}

impl Default for NvccCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleCompiler for NvccCompiler {
    fn compile(&self, source: &Path, flags: &str) -> Result<PathBuf> {
        let binary = source.with_extension("cubin");

        let mut command = Command::new(&self.nvcc);
        command.arg("-cubin");
        command.args(flags.split_whitespace());
        command.arg("-o").arg(&binary).arg(source);

        tracing::debug!(source = %source.display(), flags, "invoking nvcc");
        let status = command.status()?;
        if !status.success() {
            return Err(BackendError::CompileFailed {
                module: source.to_path_buf(),
                code: status.code(),
            });
        }

        Ok(binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_compiler_surfaces_io_error() {
        let compiler = NvccCompiler::with_path("/nonexistent/nvcc");
        let err = compiler
            .compile(Path::new("module.cu"), "")
            .expect_err("spawn should fail");
        assert!(matches!(err, BackendError::Io(_)));
    }

    #[test]
    fn binary_path_replaces_extension() {
        // Use a shell as a stand-in compiler that always succeeds.
        let compiler = NvccCompiler::with_path("true");
        let binary = compiler
            .compile(Path::new("/tmp/neuron_update.cu"), "-O3 -lineinfo")
            .expect("stub compiler should succeed");
        assert_eq!(binary, PathBuf::from("/tmp/neuron_update.cubin"));
    }
}
