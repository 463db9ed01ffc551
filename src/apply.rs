//! Operator algebra for the apply engine (§4.4.7 "C7").
//!
//! `Op` is a closed, compile-time-indexed set (§9 "Operator dispatch"): AND,
//! OR, XOR, NAND, NOR, IMPLIES, NOT, the arithmetic PLUS/TIMES, and the
//! pseudo-boolean PI_CONJ used by the reliability layer's MCV/MPV
//! tree-folds. AND/OR generalise to multi-valued codomains as min/max —
//! this is what makes spec scenario S4 (`f = max(x0, x1)` on a 3-state MDD)
//! and S5 (`f = min(x0, x1)`) line up with `Op::Or`/`Op::And` rather than
//! needing separate multi-valued max/min operators.

use crate::node::Value;

/// A binary operator over codomain values `0..codomain_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Multi-valued conjunction, `min(x, y)`; boolean AND when codomain is `{0,1}`.
    And,
    /// Multi-valued disjunction, `max(x, y)`; boolean OR when codomain is `{0,1}`.
    Or,
    /// `0` if `x == y`, else `1`. Boolean XOR when codomain is `{0,1}`.
    Xor,
    /// Complement of `And`.
    Nand,
    /// Complement of `Or`.
    Nor,
    /// Gödel-style implication, `max(codomain_size - 1 - x, y)`.
    Implies,
    /// Unary complement, `codomain_size - 1 - x` (the right operand is ignored).
    Not,
    /// Saturating addition, clamped to `codomain_size - 1`.
    Plus,
    /// Saturating multiplication, clamped to `codomain_size - 1`.
    Times,
    /// Saturating addition with `Undefined` as identity rather than absorbing
    /// element — the reliability layer's pseudo-boolean conjunction (§4.6
    /// "PI-conjunction tree-fold").
    PiConj,
}

impl Op {
    /// Whether `apply(op, f, g) == apply(op, g, f)` for every `f, g` — used
    /// by the commutativity property test (§8).
    pub fn is_commutative(self) -> bool {
        !matches!(self, Op::Implies | Op::Not)
    }

    /// Whether folding this operator over a sequence is order-independent
    /// (associative and commutative) — `left_fold`/`tree_fold` agree exactly
    /// when this holds (§8 "any fold order yields the same root").
    pub fn is_associative(self) -> bool {
        matches!(
            self,
            Op::And | Op::Or | Op::Xor | Op::Plus | Op::Times | Op::PiConj
        )
    }
}

/// Evaluates `op(a, b)` over a codomain of size `codomain_size`, applying
/// the per-operator `Undefined` rule from §4.4.7: "for PI_CONJ, Undefined is
/// the identity; for AND, Undefined ∧ 0 = 0" and otherwise Undefined
/// propagates (absorbs).
pub(crate) fn eval_op(op: Op, codomain_size: u32, a: Value, b: Value) -> Value {
    let top = codomain_size.saturating_sub(1);
    match (a, b) {
        (Value::Undefined, Value::Undefined) => Value::Undefined,
        (Value::Undefined, Value::Val(v)) | (Value::Val(v), Value::Undefined) => match op {
            Op::PiConj => Value::Val(v),
            Op::And if v == 0 => Value::Val(0),
            _ => Value::Undefined,
        },
        (Value::Val(x), Value::Val(y)) => Value::Val(eval_numeric(op, top, x, y)),
    }
}

fn eval_numeric(op: Op, top: u32, x: u32, y: u32) -> u32 {
    match op {
        Op::And => x.min(y),
        Op::Or => x.max(y),
        Op::Xor => u32::from(x != y),
        Op::Nand => top - x.min(y),
        Op::Nor => top - x.max(y),
        Op::Implies => (top - x).max(y),
        Op::Not => top - x,
        Op::Plus => x.saturating_add(y).min(top),
        Op::Times => x.saturating_mul(y).min(top),
        Op::PiConj => x.saturating_add(y).min(top),
    }
}

/// Fold order for combining a sequence of diagrams (§4.4.7 "Folds").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    /// Sequential: `((d0 op d1) op d2) op ...`.
    Left,
    /// Halve the sequence at each step; balanced depth, better cache reuse.
    Tree,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_is_min_or_is_max() {
        assert_eq!(eval_op(Op::And, 3, Value::Val(2), Value::Val(1)), Value::Val(1));
        assert_eq!(eval_op(Op::Or, 3, Value::Val(2), Value::Val(1)), Value::Val(2));
    }

    #[test]
    fn boolean_and_or_xor_match_classical_truth_tables() {
        let v = |x| Value::Val(x);
        assert_eq!(eval_op(Op::And, 2, v(1), v(1)), v(1));
        assert_eq!(eval_op(Op::And, 2, v(1), v(0)), v(0));
        assert_eq!(eval_op(Op::Or, 2, v(0), v(0)), v(0));
        assert_eq!(eval_op(Op::Or, 2, v(1), v(0)), v(1));
        assert_eq!(eval_op(Op::Xor, 2, v(1), v(1)), v(0));
        assert_eq!(eval_op(Op::Xor, 2, v(1), v(0)), v(1));
        assert_eq!(eval_op(Op::Nand, 2, v(1), v(1)), v(0));
        assert_eq!(eval_op(Op::Nor, 2, v(0), v(0)), v(1));
        assert_eq!(eval_op(Op::Implies, 2, v(1), v(0)), v(0));
        assert_eq!(eval_op(Op::Implies, 2, v(0), v(0)), v(1));
    }

    #[test]
    fn double_negation_is_identity() {
        let v = Value::Val(1);
        let once = eval_op(Op::Not, 2, v, v);
        let twice = eval_op(Op::Not, 2, once, once);
        assert_eq!(twice, v);
    }

    #[test]
    fn undefined_absorbs_except_for_pi_conj_identity_and_and_zero() {
        assert_eq!(
            eval_op(Op::PiConj, 4, Value::Undefined, Value::Val(2)),
            Value::Val(2)
        );
        assert_eq!(
            eval_op(Op::And, 4, Value::Undefined, Value::Val(0)),
            Value::Val(0)
        );
        assert_eq!(
            eval_op(Op::And, 4, Value::Undefined, Value::Val(2)),
            Value::Undefined
        );
        assert_eq!(
            eval_op(Op::Or, 4, Value::Undefined, Value::Val(2)),
            Value::Undefined
        );
    }

    #[test]
    fn plus_and_times_saturate_at_top_of_codomain() {
        assert_eq!(eval_op(Op::Plus, 3, Value::Val(2), Value::Val(2)), Value::Val(2));
        assert_eq!(eval_op(Op::Times, 3, Value::Val(2), Value::Val(2)), Value::Val(2));
    }
}
