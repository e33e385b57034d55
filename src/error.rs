//! Fatal-error taxonomy.
//!
//! Every decode/evaluate operation in this crate returns `Result<T,
//! FatalError>` on the safe library surface (see [`crate::machine::Machine`])
//! so unit tests can assert on error *shape*. Only the `extern "C"` boundary
//! in [`crate::ffi`] converts an `Err` into a logged process abort, matching
//! the host contract: malformed input is a bug in the caller or the compiled
//! image, not a runtime condition to recover from.

use crate::expr::AtomKind;
use thiserror::Error;

/// A condition that the original design treats as unrecoverable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// An image-framing token (`SCAN`/`DEF`/`GG`) appeared where an
    /// expression-tree atom was expected, or vice versa.
    #[error("unexpected framing token {kind:?} at stream offset {offset}")]
    UnexpectedFraming {
        /// The token that should not have appeared here.
        kind: AtomKind,
        /// Index into the token stream where it was read.
        offset: usize,
    },
    /// A token stream ended before a well-formed expression (or image
    /// envelope) was fully parsed.
    #[error("token stream ended after {consumed} tokens while {consumed} < expected span")]
    TruncatedStream {
        /// Number of tokens consumed before the stream ran out.
        consumed: usize,
    },
    /// A raw tag value decoded to something outside the closed set of atom
    /// kinds.
    #[error("unrecognized atom tag {tag} at stream offset {offset}")]
    MalformedToken {
        /// The raw `i64` tag value.
        tag: i64,
        /// Index into the token stream where it was read.
        offset: usize,
    },
    /// Arithmetic (`add`/`mul`/`div`/`neg`/`lt`/`eq`) or `as_number` was
    /// asked to treat a non-`number` weak-head-normal-form result as a
    /// number.
    #[error("expected a number, found atom kind {found:?}")]
    NonNumericOperand {
        /// The atom kind actually produced.
        found: AtomKind,
    },
    /// A single allocation would not fit in one arena chunk.
    #[error("allocation of {requested} bytes exceeds the {capacity}-byte arena chunk")]
    ArenaCapacityExceeded {
        /// Bytes requested.
        requested: usize,
        /// Configured chunk capacity.
        capacity: usize,
    },
    /// Encoding a result overran the fixed output buffer.
    #[error("encoded output of {produced} words exceeds the {capacity}-word output buffer")]
    OutputBufferOverflow {
        /// Words produced before the overflow was detected.
        produced: usize,
        /// Configured buffer capacity.
        capacity: usize,
    },
    /// A `FUN`/`galaxy` index named a slot beyond the function table's
    /// configured capacity.
    #[error("function index {index} exceeds the function table capacity of {capacity}")]
    FunctionSlotOutOfRange {
        /// The out-of-range index.
        index: i64,
        /// Configured table capacity.
        capacity: usize,
    },
    /// A `FUN`/`galaxy` reference named a slot that was never populated by
    /// `load_machine`.
    #[error("function index {index} has no definition in the loaded image")]
    UnoccupiedFunctionSlot {
        /// The unoccupied index.
        index: i64,
    },
    /// `evaluate` was called with no program loaded and default-image
    /// loading itself failed.
    #[error("no program is loaded and the default image failed to load")]
    NoProgramLoaded,
    /// An image parsed to completion (reached `GG`) without ever defining
    /// the entry point (`galaxy`, conventionally index `0`).
    #[error("image defined no galaxy (entry point) function")]
    MissingEntryPoint,
    /// An atom kind that is legal to decode (e.g. `galaxy`, read back from a
    /// request) but illegal to re-encode appeared where an encodable
    /// expression was expected.
    #[error("atom kind {kind:?} cannot appear in an encoded expression tree")]
    IllegalInEncodedTree {
        /// The offending kind.
        kind: AtomKind,
    },
    /// The bit-stream codec read a character other than `'0'`/`'1'`.
    #[error("bit stream contains non-binary character {found:?} at offset {offset}")]
    MalformedBit {
        /// The offending character.
        found: char,
        /// Index into the character stream where it was read.
        offset: usize,
    },
    /// The evaluator's fixed-point loop or `try_eval` reached a node whose
    /// kind can never legally appear in an evaluated tree (`SCAN`/`DEF`/`GG`).
    #[error("evaluator reached an unreachable atom kind {kind:?}")]
    UnreachableAtomKind {
        /// The offending kind.
        kind: AtomKind,
    },
    /// `div` was asked to divide by zero.
    #[error("division by zero")]
    DivisionByZero,
}
