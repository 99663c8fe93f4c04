use std::fmt;

/// Configuration errors: detected and rejected at submission-build time,
/// before any device work is scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownBuffer(usize),
    HostLengthMismatch { expected: usize, got: usize },
    ZeroExtent,
    RankOutOfRange(usize),
    LocalRankMismatch { global: usize, local: usize },
    LocalDoesNotDivide { dim: usize, global: usize, local: usize },
    BindingCount { kernel: &'static str, expected: usize, got: usize },
    BindingMode { kernel: &'static str, slot: usize, expected: &'static str, got: &'static str },
    ScratchCount { kernel: &'static str, expected: usize, got: usize },
    MultipleWriters { buffer: usize },
    LocalScratchWithoutPartition,
    PartitionRequired { kernel: &'static str },
    BadReinterpret { scalar_elems: usize, vec_elems: usize },
    KernelShape { kernel: &'static str, detail: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownBuffer(id) => write!(f, "Unknown buffer handle #{}", id),
            ConfigError::HostLengthMismatch { expected, got } => {
                write!(f, "Host array length {} does not match shape element count {}", got, expected)
            }
            ConfigError::ZeroExtent => write!(f, "Shape has a zero extent"),
            ConfigError::RankOutOfRange(r) => write!(f, "Rank {} is outside the supported 1..=3 range", r),
            ConfigError::LocalRankMismatch { global, local } => {
                write!(f, "Local rank {} does not match global rank {}", local, global)
            }
            ConfigError::LocalDoesNotDivide { dim, global, local } => {
                write!(f, "Local extent {} does not evenly divide global extent {} in dimension {}", local, global, dim)
            }
            ConfigError::BindingCount { kernel, expected, got } => {
                write!(f, "Kernel {} expects {} buffer bindings, got {}", kernel, expected, got)
            }
            ConfigError::BindingMode { kernel, slot, expected, got } => {
                write!(f, "Kernel {} expects a {} binding in slot {}, got {}", kernel, expected, slot, got)
            }
            ConfigError::ScratchCount { kernel, expected, got } => {
                write!(f, "Kernel {} expects {} local scratch declarations, got {}", kernel, expected, got)
            }
            ConfigError::MultipleWriters { buffer } => {
                write!(f, "More than one writable accessor bound to buffer #{} in one submission", buffer)
            }
            ConfigError::LocalScratchWithoutPartition => {
                write!(f, "Local scratch declared on an unpartitioned execution grid")
            }
            ConfigError::PartitionRequired { kernel } => {
                write!(f, "Kernel {} requires a partitioned execution grid", kernel)
            }
            ConfigError::BadReinterpret { scalar_elems, vec_elems } => {
                write!(
                    f,
                    "Reinterpreted shape covers {} vector elements ({} scalars), buffer holds {} scalars",
                    vec_elems,
                    vec_elems * 4,
                    scalar_elems
                )
            }
            ConfigError::KernelShape { kernel, detail } => {
                write!(f, "Kernel {}: {}", kernel, detail)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime errors: raised during kernel execution and surfaced from
/// `wait_all` / buffer synchronization, after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    KernelFault { submission: usize, cause: String },
    DependencyFailed { submission: usize, dep: usize },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::KernelFault { submission, cause } => {
                write!(f, "Submission #{} faulted: {}", submission, cause)
            }
            RuntimeError::DependencyFailed { submission, dep } => {
                write!(f, "Submission #{} not executed: dependency submission #{} failed", submission, dep)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Combined error for host-side operations that can fail either way,
/// e.g. `read_back` on an unknown handle vs. a failed writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Config(ConfigError),
    Runtime(RuntimeError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(e) => write!(f, "{}", e),
            EngineError::Runtime(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::Config(e)
    }
}

impl From<RuntimeError> for EngineError {
    fn from(e: RuntimeError) -> Self {
        EngineError::Runtime(e)
    }
}
