//! The expression model: atom tags, node shape, and arena-relative
//! references between nodes.

use strum::{Display, EnumCount, EnumIter};

/// Which of a [`crate::machine::Machine`]'s two arenas an [`ExprRef`] was
/// allocated from. `evaluate` builds trees that mix references into both:
/// a request can select an unevaluated sub-expression of a ROM-resident
/// function body, and a fixed point can land on a ROM node unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// The persistent program image, populated by `load_machine` and
    /// never written to by the evaluator except to cache `evaluated`.
    Rom,
    /// The per-`evaluate`-call scratch arena, released once the call
    /// returns.
    Working,
}

/// An index into one of a machine's two [`crate::arena::Arena`]s. Cheap to
/// copy; resolving one requires knowing which arena it came from, which is
/// why the region tag travels with the index instead of being implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprRef {
    pub(crate) region: Region,
    pub(crate) index: u32,
}

impl ExprRef {
    pub(crate) fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn region(self) -> Region {
        self.region
    }
}

/// The closed set of node tags.
///
/// Discriminants are a wire contract: an
/// embedder linking a real compiled image must have been compiled against
/// this exact assignment. `SCAN`/`DEF`/`GG` only ever appear in image
/// streams, never inside a tree handed to the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumCount, EnumIter)]
#[repr(i64)]
pub enum AtomKind {
    /// Application node; the only kind with children.
    Ap = 0,
    /// A signed 64-bit integer literal.
    Number = 1,
    /// Reference to `function_table[number]`.
    Fun = 2,
    /// Reference to the entry point, `function_table[0]`.
    Galaxy = 3,
    /// The empty list.
    Nil = 4,
    /// List/pair constructor, also usable as a 3-ary selector.
    Cons = 5,
    /// `car x = x t`.
    Car = 6,
    /// `cdr x = x f`.
    Cdr = 7,
    /// `isnil x = x (t (t f))`.
    Isnil = 8,
    /// K / boolean true / binary selector returning its first argument.
    T = 9,
    /// Boolean false / binary selector returning its second argument.
    F = 10,
    /// Binary addition.
    Add = 11,
    /// Binary multiplication.
    Mul = 12,
    /// Binary truncating division.
    Div = 13,
    /// Unary negation.
    Neg = 14,
    /// Binary numeric equality.
    Eq = 15,
    /// Binary numeric less-than.
    Lt = 16,
    /// Identity combinator.
    I = 17,
    /// S combinator.
    S = 18,
    /// C combinator.
    C = 19,
    /// B combinator.
    B = 20,
    /// Image-framing: begins a definition of `scan_size` tokens.
    Scan = 21,
    /// Image-framing: separates a definition's header from its body.
    Def = 22,
    /// Image-framing: terminates an image or a request/response stream.
    Gg = 23,
}

impl AtomKind {
    /// Decode a raw wire tag. `Err` carries nothing — callers attach the
    /// offset themselves, since only they know where in the stream they are.
    pub fn from_tag(tag: i64) -> Option<Self> {
        use AtomKind::*;
        Some(match tag {
            0 => Ap,
            1 => Number,
            2 => Fun,
            3 => Galaxy,
            4 => Nil,
            5 => Cons,
            6 => Car,
            7 => Cdr,
            8 => Isnil,
            9 => T,
            10 => F,
            11 => Add,
            12 => Mul,
            13 => Div,
            14 => Neg,
            15 => Eq,
            16 => Lt,
            17 => I,
            18 => S,
            19 => C,
            20 => B,
            21 => Scan,
            22 => Def,
            23 => Gg,
            _ => return None,
        })
    }

    /// The raw wire tag for this kind.
    pub const fn tag(self) -> i64 {
        self as i64
    }

    /// True for `number`/`Fun`/`galaxy`, the kinds that carry a second
    /// payload word on the wire.
    pub const fn has_payload(self) -> bool {
        matches!(self, AtomKind::Number | AtomKind::Fun | AtomKind::Galaxy)
    }

    /// True for `SCAN`/`DEF`/`GG`: legal only in image-framing position,
    /// fatal anywhere inside an expression tree.
    pub const fn is_framing(self) -> bool {
        matches!(self, AtomKind::Scan | AtomKind::Def | AtomKind::Gg)
    }

    /// Nullary atoms that stand for themselves in weak head normal form:
    /// everything except `ap`, `Fun`, `galaxy`, and the framing tokens.
    pub const fn is_self_evaluating(self) -> bool {
        !matches!(
            self,
            AtomKind::Ap | AtomKind::Fun | AtomKind::Galaxy | AtomKind::Scan | AtomKind::Def | AtomKind::Gg
        )
    }
}

/// An expression node.
///
/// `l`/`r` are meaningful only when `kind == Ap`. `number` is meaningful
/// only for `Number`/`Fun`/`Galaxy`. `evaluated`, once set, is never
/// overwritten with a different value (see [`crate::eval`]).
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub kind: AtomKind,
    pub l: Option<ExprRef>,
    pub r: Option<ExprRef>,
    pub number: i64,
    pub evaluated: Option<ExprRef>,
}

impl Node {
    pub(crate) fn atom(kind: AtomKind) -> Self {
        Self {
            kind,
            l: None,
            r: None,
            number: 0,
            evaluated: None,
        }
    }

    pub(crate) fn number(value: i64) -> Self {
        Self {
            number: value,
            ..Self::atom(AtomKind::Number)
        }
    }

    pub(crate) fn function_ref(kind: AtomKind, index: i64) -> Self {
        debug_assert!(matches!(kind, AtomKind::Fun | AtomKind::Galaxy));
        Self {
            number: index,
            ..Self::atom(kind)
        }
    }

    pub(crate) fn ap(l: ExprRef, r: ExprRef) -> Self {
        Self {
            l: Some(l),
            r: Some(r),
            ..Self::atom(AtomKind::Ap)
        }
    }
}
