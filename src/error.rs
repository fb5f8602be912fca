use thiserror::Error;

/// Top-level error type for mesh creation, caching and the reference kernel.
///
/// Every variant is `Clone` so that one failed computation can be handed to
/// all requests coalesced onto it.
#[derive(Debug, Clone, Error)]
pub enum MeshCacheError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Errors related to geometric computations.
#[derive(Debug, Clone, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors related to topological lookups.
#[derive(Debug, Clone, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("wire is not closed")]
    WireNotClosed,

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Errors related to modelling operations.
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Errors related to tessellation.
#[derive(Debug, Clone, Error)]
pub enum TessellationError {
    #[error("invalid tessellation parameters: {0}")]
    InvalidParameters(String),

    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Errors raised while scheduling work against the kernel.
#[derive(Debug, Clone, Error)]
pub enum KernelError {
    #[error("kernel task failed: {0}")]
    TaskFailed(String),

    #[error("topology store lock poisoned")]
    Poisoned,

    #[error("coalesced mesh computation was abandoned before completing")]
    Abandoned,

    #[error("concurrency limiter closed")]
    LimiterClosed,
}

/// Errors related to the solid copy pool.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    #[error("face correspondence length mismatch: {original} original vs {copy} copied")]
    CorrespondenceMismatch { original: usize, copy: usize },

    #[error("pool target size must be positive")]
    EmptyTarget,
}

impl From<tokio::task::JoinError> for KernelError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for MeshCacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        KernelError::from(err).into()
    }
}

/// Convenience type alias for results using [`MeshCacheError`].
pub type Result<T> = std::result::Result<T, MeshCacheError>;
