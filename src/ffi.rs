//! The `extern "C"` boundary: a single process-wide machine,
//! GG-terminated sentinel buffers instead of explicit lengths (matching the
//! wire format already used by [`crate::token_codec`]), and abort-on-fatal
//! semantics. Everything behind this file is ordinary `Result`-returning
//! code in [`crate::machine`] — this is the only place the crate gives up
//! recoverability for a flat C calling convention.

use crate::expr::AtomKind;
use crate::limits::Limits;
use crate::machine::Machine;
use std::cell::RefCell;
use std::slice;
use std::sync::{Mutex, OnceLock};

static MACHINE: OnceLock<Mutex<Machine>> = OnceLock::new();

thread_local! {
    /// Backs the pointer `evaluate` returns. Reused (overwritten) by the
    /// next call on the same thread, mirroring the original design's
    /// single shared output buffer.
    static RESPONSE: RefCell<Vec<i64>> = const { RefCell::new(Vec::new()) };
}

fn machine() -> &'static Mutex<Machine> {
    MACHINE.get_or_init(|| Mutex::new(Machine::new(Limits::default())))
}

/// Read a `GG`-terminated `i64` buffer of unknown length starting at `ptr`.
///
/// # Safety
/// `ptr` must be non-null and point to a contiguous run of initialized
/// `i64`s that contains a `GG` tag before the end of any owned allocation.
unsafe fn read_sentinel_terminated<'a>(ptr: *const i64) -> &'a [i64] {
    let mut len = 0usize;
    while *ptr.add(len) != AtomKind::Gg.tag() {
        len += 1;
    }
    slice::from_raw_parts(ptr, len + 1)
}

/// Load (or reload) the program image at `image`. A null `image` releases
/// the current program; the next `evaluate` call falls back to the bundled
/// default image. Any [`crate::error::FatalError`] aborts the process —
/// there is no way to signal failure back through this signature.
///
/// # Safety
/// `image` must be null, or point to a `GG`-terminated, initialized `i64`
/// buffer valid for the duration of this call.
#[no_mangle]
pub unsafe extern "C" fn load_machine(image: *const i64) {
    let mut guard = machine().lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if image.is_null() {
        guard.unload();
        tracing::info!("rom released via null image");
        return;
    }

    let tokens = read_sentinel_terminated(image);
    if let Err(error) = guard.load(tokens) {
        tracing::error!(%error, "load_machine failed, aborting");
        std::process::abort();
    }
}

/// Evaluate the `size`-word request at `request` against the currently
/// loaded (or lazily-loaded default) program. Returns a pointer to a
/// `GG`-terminated response buffer owned by this thread, valid until the
/// next call to `evaluate` on the same thread. The caller must not free
/// it. Any [`crate::error::FatalError`] aborts the process.
///
/// # Safety
/// `request` must point to `size` valid, initialized `i64`s.
#[no_mangle]
pub unsafe extern "C" fn evaluate(size: u32, request: *const i64) -> *const i64 {
    let tokens = slice::from_raw_parts(request, size as usize);
    let mut guard = machine().lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let response = match guard.evaluate(tokens) {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(%error, "evaluate failed, aborting");
            std::process::abort();
        }
    };
    drop(guard);

    RESPONSE.with(|cell| {
        *cell.borrow_mut() = response;
        cell.borrow().as_ptr()
    })
}
