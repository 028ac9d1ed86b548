/// Errors this collector can report.
///
/// [`GcError::OutOfMemory`] ends the process, since there is no heap resizing to fall back to.
/// [`GcError::UnequalSemiSpaceSizes`] is a configuration precondition checked once, before either
/// semi-space is ever allocated.
#[derive(Debug, thiserror::Error)]
pub enum GcError {
    /// A collection cycle completed and the following allocation still didn't fit.
    #[error("out of memory")]
    OutOfMemory,

    /// `FROM_SPACE_SIZE` and `TO_SPACE_SIZE` must be equal.
    #[error("FROM_SPACE_SIZE ({from}) and TO_SPACE_SIZE ({to}) must be equal")]
    UnequalSemiSpaceSizes { from: u64, to: u64 },
}
