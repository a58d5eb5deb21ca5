//! Per-call inlining failures.

use derive_more::{Display, Error};

/// Why a resolvable call could not be inlined.
///
/// Every variant is detected before the IR is touched, so a failed call is
/// left exactly as it was.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum InlineError {
    #[display("callee body has {blocks} blocks; only single-block bodies can be inlined")]
    MultiBlockBody { blocks: usize },
    #[display("callee body has no blocks")]
    EmptyBody,
    #[display("callee body does not end in `func.return`")]
    MissingTerminator,
    #[display("call passes {actual} argument(s) but the callee takes {expected}")]
    ArityMismatch { expected: usize, actual: usize },
    #[display("callee returns {returned} value(s) but the call has {results} result(s)")]
    ResultCountMismatch { returned: usize, results: usize },
    #[display("call is nested inside the body it would inline")]
    RecursiveCall,
    #[display("call was erased before it could be inlined")]
    StaleCall,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_counts() {
        let err = InlineError::ArityMismatch {
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "call passes 1 argument(s) but the callee takes 2"
        );
        assert_eq!(
            InlineError::MultiBlockBody { blocks: 3 }.to_string(),
            "callee body has 3 blocks; only single-block bodies can be inlined"
        );
    }
}
