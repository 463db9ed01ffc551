//! End-to-end scenarios from `spec.md` §8 "Testable properties" (S1-S8).

use teddy_mdd::node::Value;
use teddy_mdd::reliability::{self, DpldPredicate, ProbabilityTable, VarChange};
use teddy_mdd::{pla, Fold, Manager, Op};

fn s1_function(m: &Manager) -> teddy_mdd::Diagram {
    let x0 = m.variable(0).unwrap();
    let x1 = m.variable(1).unwrap();
    let x2 = m.variable(2).unwrap();
    let x3 = m.variable(3).unwrap();
    let lhs = m.apply(Op::And, &x0, &x1).unwrap();
    let rhs = m.apply(Op::And, &x2, &x3).unwrap();
    m.apply(Op::Or, &lhs, &rhs).unwrap()
}

#[test]
fn s1_evaluate() {
    let m = Manager::new_bdd(4, None).unwrap();
    let f = s1_function(&m);
    assert_eq!(m.evaluate(&f, &[1, 1, 0, 1]).unwrap(), Value::Val(1));
}

#[test]
fn s2_satisfy_count() {
    let m = Manager::new_bdd(4, None).unwrap();
    let f = s1_function(&m);
    assert_eq!(m.satisfy_count(&f, 1).unwrap(), 7);
}

#[test]
fn s3_probability() {
    let m = Manager::new_bdd(4, None).unwrap();
    let f = s1_function(&m);
    let table = ProbabilityTable::new(&m, vec![vec![0.5, 0.5]; 4]).unwrap();
    let p = reliability::probability(&m, &f, &table, 1).unwrap();
    assert!((p - 0.4375).abs() < 1e-9);
}

#[test]
fn s4_mdd_max() {
    let m = Manager::new_fixed(2, 3, 3, None).unwrap();
    let x0 = m.variable(0).unwrap();
    let x1 = m.variable(1).unwrap();
    let f = m.apply(Op::Or, &x0, &x1).unwrap(); // max(x0, x1)
    assert_eq!(m.satisfy_count(&f, 2).unwrap(), 5);
}

#[test]
fn s5_availability() {
    let m = Manager::new_fixed(2, 3, 3, None).unwrap();
    let x0 = m.variable(0).unwrap();
    let x1 = m.variable(1).unwrap();
    let f = m.apply(Op::And, &x0, &x1).unwrap(); // min(x0, x1)
    let table = ProbabilityTable::new(&m, vec![vec![0.1, 0.3, 0.6]; 2]).unwrap();
    let a = reliability::availability(&m, &f, &table, 2).unwrap();
    assert!((a - 0.36).abs() < 1e-9);
}

#[test]
fn s6_node_count_is_bounded() {
    let m = Manager::new_bdd(4, None).unwrap();
    let f = s1_function(&m);
    assert!(m.node_count(&f).unwrap() <= 6);
}

#[test]
fn s7_structural_importance() {
    let m = Manager::new_bdd(4, None).unwrap();
    let f = s1_function(&m);
    let change = VarChange { index: 0, from: 0, to: 1 };
    let d = reliability::dpld(&m, &f, change, DpldPredicate::Basic { a: 0, b: 1 }).unwrap();
    let si = reliability::structural_importance(&m, &d).unwrap();
    // Toggling x0 flips f exactly when x1 = 1 and x2 ∧ x3 = 0: 3 of the 8
    // assignments to (x1, x2, x3), i.e. 3/8 of the full 4-variable space.
    assert!((si - 0.375).abs() < 1e-9);
}

#[test]
fn s8_pla_satisfy_count() {
    let source = ".i 3\n.o 1\n.p 2\n10- 1\n-11 1\n.e\n";
    let (m, outputs) = pla::from_pla_str(source, Fold::Tree).unwrap();
    // ON-set: x0=1 (4 assignments) union x1=1,x2=1 (2 assignments) minus
    // overlap (x0=1,x1=1,x2=1 counted once): 4 + 2 - 1 = 5.
    assert_eq!(m.satisfy_count(&outputs[0], 1).unwrap(), 5);
}

#[test]
fn double_negation_is_identity() {
    let m = Manager::new_bdd(2, None).unwrap();
    let x0 = m.variable(0).unwrap();
    let once = m.apply(Op::Not, &x0, &x0).unwrap();
    let twice = m.apply(Op::Not, &once, &once).unwrap();
    assert_eq!(m.satisfy_all(&twice, 1).unwrap(), m.satisfy_all(&x0, 1).unwrap());
}

#[test]
fn apply_is_commutative_for_and() {
    let m = Manager::new_bdd(3, None).unwrap();
    let x0 = m.variable(0).unwrap();
    let x1 = m.variable(1).unwrap();
    let fg = m.apply(Op::And, &x0, &x1).unwrap();
    let gf = m.apply(Op::And, &x1, &x0).unwrap();
    assert_eq!(fg, gf);
}

#[test]
fn tree_fold_and_left_fold_agree_for_associative_ops() {
    let m = Manager::new_bdd(4, None).unwrap();
    let vars: Vec<_> = (0..4).map(|i| m.variable(i).unwrap()).collect();
    let left = m.fold(Op::And, &vars, Fold::Left).unwrap();
    let tree = m.fold(Op::And, &vars, Fold::Tree).unwrap();
    assert_eq!(left, tree);
}

#[test]
fn availability_and_unavailability_sum_to_one() {
    let m = Manager::new_fixed(2, 3, 3, None).unwrap();
    let x0 = m.variable(0).unwrap();
    let x1 = m.variable(1).unwrap();
    let f = m.apply(Op::And, &x0, &x1).unwrap();
    let table = ProbabilityTable::new(&m, vec![vec![0.1, 0.3, 0.6]; 2]).unwrap();
    let a = reliability::availability(&m, &f, &table, 2).unwrap();
    let u = reliability::unavailability(&m, &f, &table, 2).unwrap();
    assert!((a + u - 1.0).abs() < 1e-9);
}
