use thiserror::Error;

/// Errors surfaced when constructing a block format descriptor.
///
/// Format parameters are validated once, when the descriptor is built. The
/// per-block encoder itself never fails: degenerate blocks (e.g. fully
/// masked-out input) are encoded to a canonical empty block instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FormatError {
    /// The requested endpoint layout is not in the support table.
    #[error(
        "unsupported endpoint layout: {cb} color bits, {ab} alpha bits, \
         {sb} shared bits, {ib} index bits"
    )]
    InvalidParameters { cb: u8, ab: u8, sb: u8, ib: u8 },

    /// Palette block modes are numbered 0 through 7.
    #[error("palette mode {0} does not exist")]
    UnknownMode(u8),
}
