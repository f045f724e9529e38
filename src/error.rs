use thiserror::Error;

/// Everything that can go wrong while loading a morphology or building the cell.
///
/// Construction is all-or-nothing: the first error aborts the pipeline and no
/// partial cell is handed out.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read morphology file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed SWC at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("no root node found (parent id == -1)")]
    NoRoot,

    /// Strict mode only; outside strict mode a zero radius is clamped to 1.0.
    #[error("zero-radius for non-endpoint node {node}")]
    ZeroRadius { node: u64 },

    #[error("morphology produced no soma compartment")]
    NoSoma,
}
