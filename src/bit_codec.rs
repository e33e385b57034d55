//! The `'0'`/`'1'` textual codec used for host-side interoperability and
//! tests. Not on the hot evaluation path: restricted to trees
//! built purely from `nil`/`cons`/`number`, i.e. fully-reduced data values.

use crate::arena::Arena;
use crate::error::FatalError;
use crate::expr::{AtomKind, ExprRef, Node, Region};

/// Decode a `nil`/`cons`/`number` value from its bit-string encoding.
pub fn bit_decode(arena: &mut Arena, text: &str) -> Result<ExprRef, FatalError> {
    #[derive(Clone, Copy)]
    enum State {
        /// Waiting for the first bit of a 2-bit kind prefix.
        Start,
        /// Saw a leading `'0'`: next bit picks `nil` (`00`) or non-negative (`01`).
        SawZero,
        /// Saw a leading `'1'`: next bit picks negative (`10`) or `cons` (`11`).
        SawOne,
        /// Reading the unary length prefix of a number.
        Length { negative: bool, nibbles: u32 },
        /// Reading the `4*nibbles` magnitude bits, most significant first.
        Magnitude { negative: bool, remaining: u32, value: u64 },
    }

    let mut stack: Vec<Option<ExprRef>> = vec![None, None];
    let mut state = State::Start;

    for (offset, c) in text.chars().enumerate() {
        let bit = match c {
            '0' => false,
            '1' => true,
            other => return Err(FatalError::MalformedBit { found: other, offset }),
        };

        state = match state {
            State::Start => {
                if bit {
                    State::SawOne
                } else {
                    State::SawZero
                }
            }
            State::SawZero => {
                if bit {
                    State::Length { negative: false, nibbles: 0 }
                } else {
                    let r = arena.alloc(Node::atom(AtomKind::Nil))?;
                    stack.push(Some(r));
                    reduce_cons(&mut stack, arena)?;
                    State::Start
                }
            }
            State::SawOne => {
                if bit {
                    stack.push(None);
                    State::Start
                } else {
                    State::Length { negative: true, nibbles: 0 }
                }
            }
            State::Length { negative, nibbles } => {
                if bit {
                    State::Length { negative, nibbles: nibbles + 1 }
                } else if nibbles == 0 {
                    let r = arena.alloc(Node::number(0))?;
                    stack.push(Some(r));
                    reduce_cons(&mut stack, arena)?;
                    State::Start
                } else {
                    State::Magnitude { negative, remaining: nibbles * 4, value: 0 }
                }
            }
            State::Magnitude { negative, remaining, value } => {
                let value = (value << 1) | u64::from(bit);
                let remaining = remaining - 1;
                if remaining == 0 {
                    let signed = if negative { -(value as i64) } else { value as i64 };
                    let r = arena.alloc(Node::number(signed))?;
                    stack.push(Some(r));
                    reduce_cons(&mut stack, arena)?;
                    State::Start
                } else {
                    State::Magnitude { negative, remaining, value }
                }
            }
        };
    }

    match stack.as_slice() {
        [None, None, Some(result)] => Ok(*result),
        _ => Err(FatalError::TruncatedStream { consumed: text.chars().count() }),
    }
}

/// Collapse a completed `(l, r)` pair sitting above a pending `cons` hole
/// into `ap(ap(cons, l), r)`, self-memoing is left to the evaluator — this
/// codec only builds the shape, it does not evaluate it.
fn reduce_cons(stack: &mut Vec<Option<ExprRef>>, arena: &mut Arena) -> Result<(), FatalError> {
    while stack.len() >= 3 {
        let len = stack.len();
        match (stack[len - 2], stack[len - 3]) {
            (Some(_), None) => {
                let r = stack.pop().unwrap().unwrap();
                let l = stack.pop().unwrap().unwrap();
                stack.pop(); // the hole
                let cons = arena.alloc(Node::atom(AtomKind::Cons))?;
                let inner = arena.alloc(Node::ap(cons, l))?;
                let pair = arena.alloc(Node::ap(inner, r))?;
                stack.push(Some(pair));
            }
            _ => break,
        }
    }
    Ok(())
}

/// Encode a `nil`/`cons`/`number` value as its bit string.
pub fn bit_encode(arena: &Arena, root: ExprRef) -> Result<String, FatalError> {
    let mut out = String::new();
    encode_value(arena, root, &mut out)?;
    Ok(out)
}

fn encode_value(arena: &Arena, r: ExprRef, out: &mut String) -> Result<(), FatalError> {
    let node = arena.get(r);
    match node.kind {
        AtomKind::Nil => {
            out.push_str("00");
            Ok(())
        }
        AtomKind::Number => {
            encode_number(node.number, out);
            Ok(())
        }
        AtomKind::Ap => {
            let (left, right) = cons_pair_children(arena, node.l, node.r)
                .ok_or(FatalError::IllegalInEncodedTree { kind: AtomKind::Ap })?;
            out.push_str("11");
            encode_value(arena, left, out)?;
            encode_value(arena, right, out)
        }
        other => Err(FatalError::IllegalInEncodedTree { kind: other }),
    }
}

/// If `ap(l, r)` has the shape `ap(ap(cons, left), right)`, return
/// `(left, right)`.
fn cons_pair_children(arena: &Arena, l: Option<ExprRef>, r: Option<ExprRef>) -> Option<(ExprRef, ExprRef)> {
    let l = l?;
    let r = r?;
    let l_node = arena.get(l);
    if l_node.kind != AtomKind::Ap {
        return None;
    }
    let cons_ref = l_node.l?;
    if arena.get(cons_ref).kind != AtomKind::Cons {
        return None;
    }
    Some((l_node.r?, r))
}

fn encode_number(value: i64, out: &mut String) {
    if value < 0 {
        out.push('1');
        out.push('0');
    } else {
        out.push('0');
        out.push('1');
    }

    let magnitude = value.unsigned_abs();
    let nibbles = number_nibbles(magnitude);
    for _ in 0..nibbles {
        out.push('1');
    }
    out.push('0');

    for nibble_index in (0..nibbles).rev() {
        let nibble = (magnitude >> (nibble_index * 4)) & 0xf;
        for bit in (0..4).rev() {
            out.push(if (nibble >> bit) & 1 == 1 { '1' } else { '0' });
        }
    }
}

/// Smallest `N` such that `N` nibbles (4 bits each) hold `magnitude`;
/// `0` for `magnitude == 0`.
fn number_nibbles(magnitude: u64) -> u32 {
    if magnitude == 0 {
        return 0;
    }
    let bit_len = u64::BITS - magnitude.leading_zeros();
    (bit_len + 3) / 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Limits;

    fn arena() -> Arena {
        Arena::new(Region::Working, Limits::default_const().arena_chunk_bytes)
    }

    #[test]
    fn encodes_nil_as_00() {
        let mut a = arena();
        let nil = a.alloc(Node::atom(AtomKind::Nil)).unwrap();
        assert_eq!(bit_encode(&a, nil).unwrap(), "00");
    }

    #[test]
    fn encodes_zero_as_010() {
        let mut a = arena();
        let n = a.alloc(Node::number(0)).unwrap();
        assert_eq!(bit_encode(&a, n).unwrap(), "010");
    }

    #[test]
    fn round_trips_small_positive_and_negative_numbers() {
        for value in [0_i64, 1, 15, 16, 255, 256, -1, -255, i64::MAX, i64::MIN + 1] {
            let mut a = arena();
            let n = a.alloc(Node::number(value)).unwrap();
            let bits = bit_encode(&a, n).unwrap();
            let decoded = bit_decode(&mut a, &bits).unwrap();
            assert_eq!(a.get(decoded).kind, AtomKind::Number);
            assert_eq!(a.get(decoded).number, value, "round-trip of {value}");
        }
    }

    #[test]
    fn round_trips_a_cons_pair() {
        let mut a = arena();
        let one = a.alloc(Node::number(1)).unwrap();
        let two = a.alloc(Node::number(2)).unwrap();
        let cons = a.alloc(Node::atom(AtomKind::Cons)).unwrap();
        let inner = a.alloc(Node::ap(cons, one)).unwrap();
        let pair = a.alloc(Node::ap(inner, two)).unwrap();

        let bits = bit_encode(&a, pair).unwrap();
        let decoded = bit_decode(&mut a, &bits).unwrap();

        let decoded_node = a.get(decoded);
        assert_eq!(decoded_node.kind, AtomKind::Ap);
        let inner_node = a.get(decoded_node.l.unwrap());
        assert_eq!(a.get(inner_node.l.unwrap()).kind, AtomKind::Cons);
        assert_eq!(a.get(inner_node.r.unwrap()).number, 1);
        assert_eq!(a.get(decoded_node.r.unwrap()).number, 2);
    }

    #[test]
    fn rejects_non_binary_characters() {
        let mut a = arena();
        let err = bit_decode(&mut a, "012").unwrap_err();
        assert!(matches!(err, FatalError::MalformedBit { found: '2', .. }));
    }
}
