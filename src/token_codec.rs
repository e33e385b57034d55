//! Codec between the 64-bit integer token stream and expression
//! trees: the shift-reduce expression decoder/encoder, the program-image
//! loader, and its inverse, the image writer.

use crate::arena::Arena;
use crate::error::FatalError;
use crate::expr::{AtomKind, ExprRef, Node, Region};
use crate::function_table::FunctionTable;

/// A parsed program image: the populated function table plus the entry
/// point it named.
pub struct LoadedImage {
    pub function_table: FunctionTable,
    pub entry_point: ExprRef,
}

/// Decode a single expression from a bare (non-framed) token slice.
///
/// `tokens` must hold exactly one complete expression and nothing else —
/// no leading/trailing framing tokens, no leftover tokens after the
/// expression closes. This is the function both `evaluate`'s request decode
/// and the image loader's per-definition body decode funnel through.
pub fn decode_expr(arena: &mut Arena, tokens: &[i64]) -> Result<ExprRef, FatalError> {
    // Two `None` sentinels under the real stack let the reduce step probe
    // two levels down without a bounds check on every iteration.
    let mut stack: Vec<Option<ExprRef>> = vec![None, None];

    let mut i = 0usize;
    while i < tokens.len() {
        let offset = i;
        let tag = tokens[i];
        i += 1;
        let kind = AtomKind::from_tag(tag).ok_or(FatalError::MalformedToken { tag, offset })?;

        if kind.is_framing() {
            return Err(FatalError::UnexpectedFraming { kind, offset });
        }

        match kind {
            AtomKind::Ap => stack.push(None),
            AtomKind::Number | AtomKind::Fun => {
                let payload = *tokens.get(i).ok_or(FatalError::TruncatedStream { consumed: i })?;
                i += 1;
                let node = if kind == AtomKind::Number {
                    Node::number(payload)
                } else {
                    Node::function_ref(kind, payload)
                };
                let r = arena.alloc(node)?;
                stack.push(Some(r));
                reduce_ap(&mut stack, arena)?;
            }
            _ => {
                let r = arena.alloc(Node::atom(kind))?;
                stack.push(Some(r));
                reduce_ap(&mut stack, arena)?;
            }
        }
    }

    match stack.as_slice() {
        [None, None, Some(result)] => Ok(*result),
        _ => Err(FatalError::TruncatedStream { consumed: tokens.len() }),
    }
}

/// While the top three stack entries are "completed-right, completed-left,
/// hole" (i.e. second-from-top is a value and third-from-top is a pending
/// `ap` hole), collapse them into `ap(left, right)`.
fn reduce_ap(stack: &mut Vec<Option<ExprRef>>, arena: &mut Arena) -> Result<(), FatalError> {
    while stack.len() >= 3 {
        let len = stack.len();
        let (left_ready, hole) = (stack[len - 2], stack[len - 3]);
        match (left_ready, hole) {
            (Some(_), None) => {
                let r = stack.pop().unwrap().unwrap();
                let l = stack.pop().unwrap().unwrap();
                stack.pop(); // the hole itself
                let ap = arena.alloc(Node::ap(l, r))?;
                stack.push(Some(ap));
            }
            _ => break,
        }
    }
    Ok(())
}

/// Decode a `GG`-terminated request/response buffer: everything but the
/// final token is the expression; the final token must be `GG`.
pub fn decode_request(arena: &mut Arena, tokens: &[i64]) -> Result<ExprRef, FatalError> {
    let (&last, body) = tokens
        .split_last()
        .ok_or(FatalError::TruncatedStream { consumed: 0 })?;
    if last != AtomKind::Gg.tag() {
        return Err(FatalError::MalformedToken {
            tag: last,
            offset: tokens.len() - 1,
        });
    }
    decode_expr(arena, body)
}

/// Pre-order encode `root` into the token stream form, appending a
/// terminating `GG`. `root` may reference either arena — a fixed point can
/// land directly on a ROM-resident node (e.g. a `FUN` body that reduced to
/// a bare atom) — so both are needed to resolve the tree.
pub fn encode_response(rom: &Arena, working: &Arena, root: ExprRef) -> Result<Vec<i64>, FatalError> {
    let mut out = encode_expr(rom, working, root)?;
    out.push(AtomKind::Gg.tag());
    Ok(out)
}

/// Pre-order encode `root` with no terminator. `galaxy` and the framing
/// tokens are illegal inside an encodable tree.
pub fn encode_expr(rom: &Arena, working: &Arena, root: ExprRef) -> Result<Vec<i64>, FatalError> {
    let mut out = Vec::new();
    let mut work = vec![root];

    while let Some(r) = work.pop() {
        let node = resolve(rom, working, r);
        match node.kind {
            AtomKind::Ap => {
                out.push(AtomKind::Ap.tag());
                // Push right then left so left is visited (popped) first,
                // preserving pre-order: node, left-subtree, right-subtree.
                work.push(node.r.expect("ap node always has both children"));
                work.push(node.l.expect("ap node always has both children"));
            }
            AtomKind::Number | AtomKind::Fun => {
                out.push(node.kind.tag());
                out.push(node.number);
            }
            AtomKind::Galaxy | AtomKind::Scan | AtomKind::Def | AtomKind::Gg => {
                return Err(FatalError::IllegalInEncodedTree { kind: node.kind });
            }
            _ => out.push(node.kind.tag()),
        }
    }

    Ok(out)
}

/// Dispatch a reference to whichever of the two arenas it was allocated
/// from.
fn resolve<'a>(rom: &'a Arena, working: &'a Arena, r: ExprRef) -> &'a Node {
    match r.region() {
        Region::Rom => rom.get(r),
        Region::Working => working.get(r),
    }
}

/// Parse a full program image: `(SCAN <len> (galaxy|FUN) <idx> DEF <expr
/// tokens>)* GG`.
pub fn load_machine_image(arena: &mut Arena, tokens: &[i64], table_capacity: usize) -> Result<LoadedImage, FatalError> {
    let mut table = FunctionTable::with_capacity(table_capacity);
    let mut entry_point = None;
    let mut i = 0usize;

    loop {
        let offset = i;
        let tag = *tokens.get(i).ok_or(FatalError::TruncatedStream { consumed: i })?;
        i += 1;
        let kind = AtomKind::from_tag(tag).ok_or(FatalError::MalformedToken { tag, offset })?;

        match kind {
            AtomKind::Gg => break,
            AtomKind::Scan => {
                let mut scan_size = *tokens.get(i).ok_or(FatalError::TruncatedStream { consumed: i })? as i64;
                i += 1;

                let header_offset = i;
                let header_tag = *tokens.get(i).ok_or(FatalError::TruncatedStream { consumed: i })?;
                i += 1;
                let header_kind =
                    AtomKind::from_tag(header_tag).ok_or(FatalError::MalformedToken { tag: header_tag, offset: header_offset })?;
                if !matches!(header_kind, AtomKind::Fun | AtomKind::Galaxy) {
                    return Err(FatalError::UnexpectedFraming { kind: header_kind, offset: header_offset });
                }
                if scan_size < 2 {
                    return Err(FatalError::TruncatedStream { consumed: i });
                }
                scan_size -= 2;

                let index = *tokens.get(i).ok_or(FatalError::TruncatedStream { consumed: i })?;
                i += 1;

                let def_offset = i;
                let def_tag = *tokens.get(i).ok_or(FatalError::TruncatedStream { consumed: i })?;
                i += 1;
                let def_kind = AtomKind::from_tag(def_tag).ok_or(FatalError::MalformedToken { tag: def_tag, offset: def_offset })?;
                if def_kind != AtomKind::Def {
                    return Err(FatalError::UnexpectedFraming { kind: def_kind, offset: def_offset });
                }
                if scan_size < 1 {
                    return Err(FatalError::TruncatedStream { consumed: i });
                }
                scan_size -= 1;

                let body_len = scan_size as usize;
                let body = tokens
                    .get(i..i + body_len)
                    .ok_or(FatalError::TruncatedStream { consumed: i })?;
                let body_expr = decode_expr(arena, body)?;
                i += body_len;

                table.define(index, body_expr)?;
                if header_kind == AtomKind::Galaxy {
                    entry_point = Some(body_expr);
                }
            }
            _ => return Err(FatalError::UnexpectedFraming { kind, offset }),
        }
    }

    let entry_point = entry_point.ok_or(FatalError::MissingEntryPoint)?;
    Ok(LoadedImage { function_table: table, entry_point })
}

/// Write a program image in the exact layout `load_machine_image` expects:
/// every non-zero slot first (ascending index), then the entry point last.
/// This is the inverse of `load_machine_image`, and re-parsing its output
/// reproduces the function table and entry point exactly.
pub fn write_machine_image(arena: &Arena, table: &FunctionTable) -> Result<Vec<i64>, FatalError> {
    let mut out = Vec::new();

    for (index, expr) in table.occupied().filter(|&(index, _)| index != 0) {
        write_definition(&mut out, arena, AtomKind::Fun, index as i64, expr)?;
    }
    if let Ok(entry) = table.get(0) {
        write_definition(&mut out, arena, AtomKind::Galaxy, 0, entry)?;
    }

    out.push(AtomKind::Gg.tag());
    Ok(out)
}

fn write_definition(out: &mut Vec<i64>, arena: &Arena, kind: AtomKind, index: i64, expr: ExprRef) -> Result<(), FatalError> {
    // The image has just been loaded and never evaluated, so every
    // definition is entirely ROM-resident; pass it as both halves.
    let body = encode_expr(arena, arena, expr)?;
    let scan_size = 3 + body.len() as i64;

    out.push(AtomKind::Scan.tag());
    out.push(scan_size);
    out.push(kind.tag());
    out.push(index);
    out.push(AtomKind::Def.tag());
    out.extend(body);
    Ok(())
}
