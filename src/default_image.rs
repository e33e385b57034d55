//! The bundled fallback program, loaded lazily the first time `evaluate`
//! is called against a machine with nothing loaded.
//!
//! The original design's bundled image is the compiled arcade-game
//! interpreter (the `galaxy` function implementing the actual game's
//! `(state, event) -> (flag, state', frames)` protocol). Those program
//! bytes are not part of this crate's sources; shipping a placeholder that
//! exercises the same protocol shape without claiming to reproduce the
//! original program is the one deliberate deviation from a faithful port
//! (recorded in `DESIGN.md`).
//!
//! `galaxy = b (ap cons t) (c cons nil)`, applied to one argument `event`,
//! reduces to `cons t (cons event nil)`: a `(continue, [event])` response
//! whose shape matches the `(flag, state, frames)` tuple the real protocol
//! returns, carrying the input back out as the sole "drawn" item.

use crate::expr::AtomKind;

const AP: i64 = AtomKind::Ap as i64;
const SCAN: i64 = AtomKind::Scan as i64;
const GALAXY: i64 = AtomKind::Galaxy as i64;
const DEF: i64 = AtomKind::Def as i64;
const GG: i64 = AtomKind::Gg as i64;
const CONS: i64 = AtomKind::Cons as i64;
const NIL: i64 = AtomKind::Nil as i64;
const T: i64 = AtomKind::T as i64;
const B: i64 = AtomKind::B as i64;
const C: i64 = AtomKind::C as i64;

/// `ap(ap(b, ap(cons, t)), ap(ap(c, cons), nil))`, pre-order encoded.
///
/// `b z y x -> ap(z, ap(y, x))` and `c z y x -> ap(ap(z, x), y)`, so
/// applying this to `event` reduces to `ap(ap(cons, t), ap(ap(cons,
/// event), nil))`, i.e. `cons t (cons event nil)`.
const BODY: [i64; 11] = [
    AP, //
    AP, B, AP, CONS, T, // left:  ap(b, ap(cons, t))
    AP, AP, C, CONS, NIL, // right: ap(ap(c, cons), nil)
];

/// `SCAN <len> galaxy 0 DEF <body> GG`.
pub const DEFAULT_IMAGE: [i64; 5 + BODY.len() + 1] = build_image();

const fn build_image() -> [i64; 5 + BODY.len() + 1] {
    let mut out = [0i64; 5 + BODY.len() + 1];
    out[0] = SCAN;
    out[1] = 3 + BODY.len() as i64;
    out[2] = GALAXY;
    out[3] = 0;
    out[4] = DEF;
    let mut i = 0;
    while i < BODY.len() {
        out[5 + i] = BODY[i];
        i += 1;
    }
    out[5 + BODY.len()] = GG;
    out
}
