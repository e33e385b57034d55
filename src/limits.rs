//! Fixed capacities for the interpreter.
//!
//! These are hard limits in the original design: exceeding any of them is a
//! fatal condition, not a recoverable one (see [`crate::error::FatalError`]).
//! They are grouped here, rather than left as scattered magic numbers, so an
//! embedder that genuinely needs more headroom has a single, documented knob.

/// Capacity knobs for a [`crate::machine::Machine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Number of bump-allocated bytes per arena chunk before a new chunk is
    /// chained on.
    pub arena_chunk_bytes: usize,
    /// Number of function-table slots. Slot `0` is the entry point.
    pub function_table_capacity: usize,
    /// Number of `i64` words the token-stream result buffer can hold.
    pub output_buffer_words: usize,
    /// Number of `'0'`/`'1'` characters the bit-stream encode buffer can hold.
    pub bit_buffer_chars: usize,
}

impl Limits {
    /// The capacities named in the design: a 200 KB arena chunk, a
    /// 2000-slot function table, a 100000-word result buffer, and a
    /// 20000-char bit-encode buffer.
    pub const fn default_const() -> Self {
        Self {
            arena_chunk_bytes: 200_000,
            function_table_capacity: 2_000,
            output_buffer_words: 100_000,
            bit_buffer_chars: 20_000,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::default_const()
    }
}
