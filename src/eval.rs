//! Normal-order combinator reduction with memoization.
//!
//! `eval` is the fixed-point loop; `try_eval` performs one reduction step;
//! `eval_ap` peels off one, two, or three argument applications depending
//! on which primitive sits at the head of the spine. Arithmetic on an
//! operand that is not in weak head normal form as a `number` after
//! evaluation is a [`FatalError::NonNumericOperand`].
//!
//! Every function here takes [`Arenas`] rather than a single [`Arena`]:
//! reduction can read from a function body still sitting in ROM, from a
//! request decoded into the working arena, or from a mix of both once a
//! rewrite stitches a ROM sub-expression into a freshly built node.

use crate::arena::Arenas;
use crate::error::FatalError;
use crate::expr::{AtomKind, ExprRef, Node};
use crate::function_table::FunctionTable;

/// Evaluate `input` to weak head normal form, memoizing the result on
/// `input` itself (not on intermediate nodes visited along the way — that
/// matches the original design's memoization granularity).
pub fn eval(arenas: &mut Arenas, table: &FunctionTable, input: ExprRef) -> Result<ExprRef, FatalError> {
    let mut current = input;
    loop {
        let r = try_eval(arenas, table, current)?;
        if r == current {
            arenas.get_mut(input).evaluated = Some(r);
            return Ok(r);
        }
        current = r;
    }
}

/// Perform one reduction step without looping to a fixed point.
fn try_eval(arenas: &mut Arenas, table: &FunctionTable, e: ExprRef) -> Result<ExprRef, FatalError> {
    let node = *arenas.get(e);

    if let Some(cached) = node.evaluated {
        return Ok(cached);
    }

    match node.kind {
        AtomKind::Ap => eval_ap(arenas, table, e),
        AtomKind::Fun | AtomKind::Galaxy => table.get(node.number),
        AtomKind::Scan | AtomKind::Def | AtomKind::Gg => Err(FatalError::UnreachableAtomKind { kind: node.kind }),
        _ => Ok(e),
    }
}

fn eval_ap(arenas: &mut Arenas, table: &FunctionTable, root: ExprRef) -> Result<ExprRef, FatalError> {
    let root_node = *arenas.get(root);
    let x = root_node.r.expect("ap node always has a right child");
    let fun1 = eval(arenas, table, root_node.l.expect("ap node always has a left child"))?;
    let fun1_kind = arenas.get(fun1).kind;

    if is_unary_primitive(fun1_kind) {
        return apply_unary(arenas, table, fun1_kind, x);
    }
    if fun1_kind != AtomKind::Ap {
        return Ok(root);
    }

    let fun1_node = *arenas.get(fun1);
    let y = fun1_node.r.expect("ap node always has a right child");
    let fun2 = eval(arenas, table, fun1_node.l.expect("ap node always has a left child"))?;
    let fun2_kind = arenas.get(fun2).kind;

    if is_binary_primitive(fun2_kind) {
        return apply_binary(arenas, table, fun2_kind, x, y);
    }
    if fun2_kind != AtomKind::Ap {
        return Ok(root);
    }

    let fun2_node = *arenas.get(fun2);
    let z = fun2_node.r.expect("ap node always has a right child");
    let fun3 = eval(arenas, table, fun2_node.l.expect("ap node always has a left child"))?;
    let fun3_kind = arenas.get(fun3).kind;

    if is_ternary_combinator(fun3_kind) {
        return apply_ternary(arenas, fun3_kind, x, y, z);
    }

    Ok(root)
}

const fn is_unary_primitive(kind: AtomKind) -> bool {
    matches!(
        kind,
        AtomKind::Nil | AtomKind::Neg | AtomKind::I | AtomKind::Isnil | AtomKind::Car | AtomKind::Cdr
    )
}

const fn is_binary_primitive(kind: AtomKind) -> bool {
    matches!(
        kind,
        AtomKind::T | AtomKind::F | AtomKind::Add | AtomKind::Mul | AtomKind::Div | AtomKind::Lt | AtomKind::Eq | AtomKind::Cons
    )
}

const fn is_ternary_combinator(kind: AtomKind) -> bool {
    matches!(kind, AtomKind::S | AtomKind::C | AtomKind::B | AtomKind::Cons)
}

fn apply_unary(arenas: &mut Arenas, table: &FunctionTable, kind: AtomKind, x: ExprRef) -> Result<ExprRef, FatalError> {
    match kind {
        AtomKind::Nil => alloc_atom(arenas, AtomKind::T),
        AtomKind::Neg => {
            let v = as_number(arenas, table, x)?;
            alloc_number(arenas, -v)
        }
        AtomKind::I => Ok(x),
        AtomKind::Isnil => {
            // x (t (t f))
            let f = alloc_atom(arenas, AtomKind::F)?;
            let t_inner = alloc_atom(arenas, AtomKind::T)?;
            let t_f = alloc_ap(arenas, t_inner, f)?;
            let t_outer = alloc_atom(arenas, AtomKind::T)?;
            let t_t_f = alloc_ap(arenas, t_outer, t_f)?;
            alloc_ap(arenas, x, t_t_f)
        }
        AtomKind::Car => {
            let t = alloc_atom(arenas, AtomKind::T)?;
            alloc_ap(arenas, x, t)
        }
        AtomKind::Cdr => {
            let f = alloc_atom(arenas, AtomKind::F)?;
            alloc_ap(arenas, x, f)
        }
        other => unreachable!("is_unary_primitive guarantees only list/boolean unary kinds, got {other:?}"),
    }
}

fn apply_binary(arenas: &mut Arenas, table: &FunctionTable, kind: AtomKind, x: ExprRef, y: ExprRef) -> Result<ExprRef, FatalError> {
    match kind {
        AtomKind::T => Ok(y),
        AtomKind::F => Ok(x),
        AtomKind::Add => {
            let yv = as_number(arenas, table, y)?;
            let xv = as_number(arenas, table, x)?;
            alloc_number(arenas, yv.wrapping_add(xv))
        }
        AtomKind::Mul => {
            let yv = as_number(arenas, table, y)?;
            let xv = as_number(arenas, table, x)?;
            alloc_number(arenas, yv.wrapping_mul(xv))
        }
        AtomKind::Div => {
            let yv = as_number(arenas, table, y)?;
            let xv = as_number(arenas, table, x)?;
            if xv == 0 {
                return Err(FatalError::DivisionByZero);
            }
            // Rust's `/` already truncates toward zero for signed integers.
            alloc_number(arenas, yv.wrapping_div(xv))
        }
        AtomKind::Lt => {
            let yv = as_number(arenas, table, y)?;
            let xv = as_number(arenas, table, x)?;
            alloc_atom(arenas, if yv < xv { AtomKind::T } else { AtomKind::F })
        }
        AtomKind::Eq => {
            let yv = as_number(arenas, table, y)?;
            let xv = as_number(arenas, table, x)?;
            alloc_atom(arenas, if yv == xv { AtomKind::T } else { AtomKind::F })
        }
        AtomKind::Cons => {
            let yv = eval(arenas, table, y)?;
            let xv = eval(arenas, table, x)?;
            let cons = alloc_atom(arenas, AtomKind::Cons)?;
            let inner = alloc_ap(arenas, cons, yv)?;
            let pair = alloc_ap(arenas, inner, xv)?;
            // Self-memoed: this pair is already its own weak head normal form.
            arenas.get_mut(pair).evaluated = Some(pair);
            Ok(pair)
        }
        other => unreachable!("is_binary_primitive guarantees only t/f/arithmetic/cons, got {other:?}"),
    }
}

fn apply_ternary(arenas: &mut Arenas, kind: AtomKind, x: ExprRef, y: ExprRef, z: ExprRef) -> Result<ExprRef, FatalError> {
    match kind {
        AtomKind::S => {
            let zx = alloc_ap(arenas, z, x)?;
            let yx = alloc_ap(arenas, y, x)?;
            alloc_ap(arenas, zx, yx)
        }
        AtomKind::C => {
            let zx = alloc_ap(arenas, z, x)?;
            alloc_ap(arenas, zx, y)
        }
        AtomKind::B => {
            let yx = alloc_ap(arenas, y, x)?;
            alloc_ap(arenas, z, yx)
        }
        AtomKind::Cons => {
            let xz = alloc_ap(arenas, x, z)?;
            alloc_ap(arenas, xz, y)
        }
        other => unreachable!("is_ternary_combinator guarantees only s/c/b/cons, got {other:?}"),
    }
}

fn as_number(arenas: &mut Arenas, table: &FunctionTable, e: ExprRef) -> Result<i64, FatalError> {
    let r = eval(arenas, table, e)?;
    let node = arenas.get(r);
    if node.kind == AtomKind::Number {
        Ok(node.number)
    } else {
        Err(FatalError::NonNumericOperand { found: node.kind })
    }
}

fn alloc_atom(arenas: &mut Arenas, kind: AtomKind) -> Result<ExprRef, FatalError> {
    arenas.alloc(Node::atom(kind))
}

fn alloc_number(arenas: &mut Arenas, value: i64) -> Result<ExprRef, FatalError> {
    arenas.alloc(Node::number(value))
}

fn alloc_ap(arenas: &mut Arenas, l: ExprRef, r: ExprRef) -> Result<ExprRef, FatalError> {
    arenas.alloc(Node::ap(l, r))
}

/// Structural equality over expression trees. Unused on the production
/// fixed-point path (which relies on reference identity) — kept as a
/// test-only helper for asserting two independently built trees denote the
/// same value.
#[cfg(test)]
pub(crate) fn structural_eq(arenas: &Arenas, a: ExprRef, b: ExprRef) -> bool {
    let mut stack = vec![(a, b)];
    while let Some((a, b)) = stack.pop() {
        let (na, nb) = (arenas.get(a), arenas.get(b));
        if na.kind != nb.kind {
            return false;
        }
        if matches!(na.kind, AtomKind::Number | AtomKind::Fun | AtomKind::Galaxy) && na.number != nb.number {
            return false;
        }
        match (na.l, nb.l, na.r, nb.r) {
            (Some(al), Some(bl), Some(ar), Some(br)) => {
                stack.push((al, bl));
                stack.push((ar, br));
            }
            (None, None, None, None) => {}
            _ => return false,
        }
    }
    true
}
