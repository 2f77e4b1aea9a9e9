//! Architecture allocation-granularity parameters per compute capability.

/// Hardware resource-allocation granularities for one device generation.
///
/// Warps, registers and shared memory are reserved per block in these
/// rounding units; the units change between hardware generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchParams {
    /// Warp allocation granularity.
    pub warp_alloc_gran: usize,
    /// Register allocation granularity.
    pub reg_alloc_gran: usize,
    /// Shared-memory allocation granularity in bytes.
    pub smem_alloc_gran: usize,
    /// Maximum blocks resident on one multiprocessor.
    pub max_blocks_per_sm: usize,
}

impl ArchParams {
    /// Looks up allocation parameters for a compute capability.
    ///
    /// Total over all `(major, minor)` pairs: capabilities newer than the
    /// table falls back to the newest known entry, warning for majors
    /// beyond 7 since the table may be stale.
    #[must_use]
    pub fn lookup(major: u32, minor: u32) -> Self {
        match major {
            1 => Self {
                smem_alloc_gran: 512,
                warp_alloc_gran: 2,
                reg_alloc_gran: if minor < 2 { 256 } else { 512 },
                max_blocks_per_sm: 8,
            },
            2 => Self {
                smem_alloc_gran: 128,
                warp_alloc_gran: 2,
                reg_alloc_gran: 64,
                max_blocks_per_sm: 8,
            },
            3 => Self {
                smem_alloc_gran: 256,
                warp_alloc_gran: 4,
                reg_alloc_gran: 256,
                max_blocks_per_sm: 16,
            },
            5 => Self {
                smem_alloc_gran: 256,
                warp_alloc_gran: 4,
                reg_alloc_gran: 256,
                max_blocks_per_sm: 32,
            },
            6 => Self {
                smem_alloc_gran: 256,
                warp_alloc_gran: if minor == 0 { 2 } else { 4 },
                reg_alloc_gran: 256,
                max_blocks_per_sm: 32,
            },
            _ => {
                if major > 7 {
                    tracing::warn!(
                        major,
                        minor,
                        "unknown compute capability, falling back to newest known parameters"
                    );
                }
                Self {
                    smem_alloc_gran: 256,
                    warp_alloc_gran: 4,
                    reg_alloc_gran: 256,
                    max_blocks_per_sm: 32,
                }
            }
        }
    }
}
