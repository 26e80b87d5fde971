use std::error::Error;
use std::fmt;

/// Error returned by the sort entry points.
///
/// `InvalidRange` is a caller error, raised before the buffer is touched;
/// retrying with a corrected range is fine. The remaining variants report a
/// broken internal invariant, which in practice means the comparator is not a
/// consistent total order. Those are not recoverable for the current call and
/// the buffer contents are unspecified afterwards, as partial merges have
/// already overwritten original positions by the time the violation is
/// detectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortError {
    /// The requested range does not satisfy `from <= to && to <= len`.
    InvalidRange {
        from: usize,
        to: usize,
        len: usize,
    },
    /// The merge machinery observed a run of length zero.
    ZeroLenRun { base: usize },
    /// A merge loop saw a run become empty in a position that is only valid
    /// for the final exhausted side. Only an inconsistent comparator can
    /// produce this state.
    ComparatorViolation,
    /// More than one run remained on the stack after the forced collapse.
    UnbalancedMergeStack { remaining: usize },
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SortError::InvalidRange { from, to, len } => {
                write!(f, "range {from}..{to} out of bounds for buffer of length {len}")
            }
            SortError::ZeroLenRun { base } => {
                write!(f, "zero-length run at base index {base}")
            }
            SortError::ComparatorViolation => {
                write!(f, "comparison function violates its total order contract")
            }
            SortError::UnbalancedMergeStack { remaining } => {
                write!(f, "merge stack holds {remaining} runs after forced collapse")
            }
        }
    }
}

impl Error for SortError {}
