//! The safe library surface: a persistent program image (the ROM arena)
//! plus a fresh scratch arena for each `evaluate` call.
//!
//! Callers `load` an image once, then `evaluate` many requests against it,
//! with each call bounded to its own working set that is released before
//! the call returns.

use crate::arena::{Arena, Arenas};
use crate::default_image;
use crate::error::FatalError;
use crate::eval;
use crate::expr::{ExprRef, Region};
use crate::function_table::FunctionTable;
use crate::limits::Limits;
use crate::token_codec;
use tracing::{debug, info, instrument};

/// A loaded program plus the resources needed to evaluate requests against
/// it.
pub struct Machine {
    limits: Limits,
    rom: Arena,
    function_table: Option<FunctionTable>,
    entry_point: Option<ExprRef>,
}

impl Machine {
    /// An unloaded machine. The first `evaluate` call lazily loads the
    /// bundled default image if nothing has been `load`ed by then.
    pub fn new(limits: Limits) -> Self {
        let rom = Arena::new(Region::Rom, limits.arena_chunk_bytes);
        Self { limits, rom, function_table: None, entry_point: None }
    }

    /// The entry point (`galaxy`, function table slot `0`) of the
    /// currently loaded program, if any.
    pub fn entry_point(&self) -> Option<ExprRef> {
        self.entry_point
    }

    /// Replace the loaded program with `image`, releasing whatever ROM the
    /// machine held before parsing the new one.
    #[instrument(skip(self, image), fields(tokens = image.len()))]
    pub fn load(&mut self, image: &[i64]) -> Result<(), FatalError> {
        self.rom.release();
        self.function_table = None;
        self.entry_point = None;

        let loaded = token_codec::load_machine_image(&mut self.rom, image, self.limits.function_table_capacity).inspect_err(
            |error| {
                tracing::error!(%error, "failed to load machine image");
            },
        )?;

        info!(entries = loaded.function_table.occupied().count(), "loaded machine image");
        self.function_table = Some(loaded.function_table);
        self.entry_point = Some(loaded.entry_point);
        Ok(())
    }

    /// Release the current program. The next `evaluate` call will lazily
    /// load the bundled default image.
    pub fn unload(&mut self) {
        self.rom.release();
        self.function_table = None;
        self.entry_point = None;
        debug!("rom arena released");
    }

    /// Decode `request`, reduce it to weak head normal form, and encode the
    /// result, appending a terminating `GG`. The working arena used for
    /// this call is released before `evaluate` returns, whether it
    /// succeeds or fails.
    #[instrument(skip(self, request), fields(tokens = request.len()))]
    pub fn evaluate(&mut self, request: &[i64]) -> Result<Vec<i64>, FatalError> {
        if self.function_table.is_none() {
            debug!("no program loaded, loading bundled default image");
            self.load(&default_image::DEFAULT_IMAGE)?;
        }

        let mut working = Arena::new(Region::Working, self.limits.arena_chunk_bytes);
        let table = self.function_table.as_ref().expect("just ensured a program is loaded");
        let result = run_request(&mut self.rom, &mut working, table, request, self.limits.output_buffer_words);
        working.release();

        match result {
            Ok(encoded) => {
                info!(words = encoded.len(), "evaluate succeeded");
                Ok(encoded)
            }
            Err(error) => {
                tracing::error!(%error, "evaluate failed");
                Err(error)
            }
        }
    }
}

/// Decode, reduce, and encode one request. Split out of `Machine::evaluate`
/// so the working arena can always be released by its caller, success or
/// failure, without duplicating that cleanup on every early return.
fn run_request(
    rom: &mut Arena,
    working: &mut Arena,
    table: &FunctionTable,
    request: &[i64],
    output_limit: usize,
) -> Result<Vec<i64>, FatalError> {
    let request_root = token_codec::decode_request(working, request)?;
    let reduced = {
        let mut arenas = Arenas { rom: &mut *rom, working: &mut *working };
        eval::eval(&mut arenas, table, request_root)?
    };
    let encoded = token_codec::encode_response(rom, working, reduced)?;

    if encoded.len() > output_limit {
        return Err(FatalError::OutputBufferOverflow { produced: encoded.len(), capacity: output_limit });
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::AtomKind;

    fn small_machine() -> Machine {
        let mut limits = Limits::default_const();
        limits.arena_chunk_bytes = 64 * 1024;
        Machine::new(limits)
    }

    #[test]
    fn evaluate_with_no_program_loaded_falls_back_to_the_default_image() {
        let mut m = small_machine();
        // ap(galaxy, 7) GG
        let request = [AtomKind::Ap.tag(), AtomKind::Galaxy.tag(), AtomKind::Number.tag(), 7, AtomKind::Gg.tag()];
        let response = m.evaluate(&request).unwrap();
        assert_eq!(*response.last().unwrap(), AtomKind::Gg.tag());
        assert!(m.entry_point().is_some());
    }

    #[test]
    fn load_then_evaluate_runs_a_minimal_user_program() {
        let mut m = small_machine();
        // galaxy = i  (SCAN 4 galaxy 0 DEF i GG)
        let image = [
            AtomKind::Scan.tag(),
            4,
            AtomKind::Galaxy.tag(),
            0,
            AtomKind::Def.tag(),
            AtomKind::I.tag(),
            AtomKind::Gg.tag(),
        ];
        m.load(&image).unwrap();

        // ap(galaxy, 42) GG
        let request = [AtomKind::Ap.tag(), AtomKind::Galaxy.tag(), AtomKind::Number.tag(), 42, AtomKind::Gg.tag()];
        let response = m.evaluate(&request).unwrap();
        assert_eq!(response, vec![AtomKind::Number.tag(), 42, AtomKind::Gg.tag()]);
    }

    #[test]
    fn working_arena_is_empty_and_rom_is_not_after_evaluate() {
        let mut m = small_machine();
        let request = [AtomKind::Ap.tag(), AtomKind::Galaxy.tag(), AtomKind::Number.tag(), 1, AtomKind::Gg.tag()];
        m.evaluate(&request).unwrap();
        assert!(!m.rom.is_empty());
    }

    #[test]
    fn unload_clears_the_program_and_the_next_call_reloads_the_default() {
        let mut m = small_machine();
        let image = [
            AtomKind::Scan.tag(),
            4,
            AtomKind::Galaxy.tag(),
            0,
            AtomKind::Def.tag(),
            AtomKind::I.tag(),
            AtomKind::Gg.tag(),
        ];
        m.load(&image).unwrap();
        m.unload();
        assert!(m.entry_point().is_none());

        let request = [AtomKind::Ap.tag(), AtomKind::Galaxy.tag(), AtomKind::Number.tag(), 1, AtomKind::Gg.tag()];
        m.evaluate(&request).unwrap();
        assert!(m.entry_point().is_some());
    }

    #[test]
    fn malformed_request_is_a_fatal_error_not_a_panic() {
        let mut m = small_machine();
        let request = [AtomKind::Number.tag()];
        let err = m.evaluate(&request).unwrap_err();
        assert!(matches!(err, FatalError::TruncatedStream { .. }));
    }

    #[test]
    fn out_of_range_function_index_is_rejected_at_load() {
        let mut limits = Limits::default_const();
        limits.function_table_capacity = 1;
        let mut m = Machine::new(limits);
        // Defines slot 5, but the table only has one slot (0). `load_machine_image`
        // bounds-checks the definition's own index; it does not walk bodies
        // looking for out-of-range `FUN` references (those are only resolved,
        // and so only checked, at evaluation time).
        let image = [
            AtomKind::Scan.tag(),
            4,
            AtomKind::Fun.tag(),
            5,
            AtomKind::Def.tag(),
            AtomKind::I.tag(),
            AtomKind::Gg.tag(),
        ];
        let err = m.load(&image).unwrap_err();
        assert!(matches!(err, FatalError::FunctionSlotOutOfRange { .. }));
    }
}
