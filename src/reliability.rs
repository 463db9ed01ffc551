//! Reliability analysis layer (§4.6 "C9").
//!
//! Grounded on libteddy's `reliability_manager.hpp`: probability propagation
//! is a level-order downward pass seeded at the root, `dpld` synchronises
//! two cofactored diagrams through a predicate instead of a fixed boolean
//! op, and the importance measures and minimal cut/path vectors are all
//! expressed in terms of `dpld`/`to_dpld_e`, `satisfy_count`/`satisfy_all`
//! and `tree_fold` rather than a separate engine — the manager already
//! provides every primitive this layer needs.

use std::collections::{HashMap, HashSet};

use crate::apply::Op;
use crate::diagram::Diagram;
use crate::error::{ManagerError, ReliabilityError};
use crate::manager::Manager;
use crate::node::{NodeId, Value, VarIndex};

/// Which change in a variable's value a DPLD observes, and which change in
/// the function's value it reports (glossary "DPLD predicate table").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpldPredicate {
    /// Function value goes from exactly `a` to exactly `b`.
    Basic {
        /// Function value before the change.
        a: u32,
        /// Function value after the change.
        b: u32,
    },
    /// Variable goes from exactly `s` upward; holds when the function value increases.
    Type1Inc(u32),
    /// Variable goes from exactly `s` downward; holds when the function value decreases.
    Type1Dec(u32),
    /// Function value strictly increases, for any variable change.
    Type2Inc,
    /// Function value strictly decreases, for any variable change.
    Type2Dec,
    /// Function value crosses upward through threshold `s`.
    Type3Inc(u32),
    /// Function value crosses downward through threshold `s`.
    Type3Dec(u32),
}

impl DpldPredicate {
    pub(crate) fn holds(self, l: u32, r: u32) -> bool {
        match self {
            DpldPredicate::Basic { a, b } => l == a && r == b,
            DpldPredicate::Type1Inc(s) => l == s && r > s,
            DpldPredicate::Type1Dec(s) => l == s && r < s,
            DpldPredicate::Type2Inc => l < r,
            DpldPredicate::Type2Dec => l > r,
            DpldPredicate::Type3Inc(s) => l < s && r >= s,
            DpldPredicate::Type3Dec(s) => l >= s && r < s,
        }
    }
}

/// A single-variable change a DPLD studies: variable `index` moving from
/// `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarChange {
    /// The variable that changes.
    pub index: VarIndex,
    /// Its value before the change.
    pub from: u32,
    /// Its value after the change.
    pub to: u32,
}

const PROBABILITY_EPSILON: f64 = 1e-9;

/// Per-variable probability distribution used by probability propagation
/// and the one-shot probability/importance queries.
#[derive(Debug, Clone)]
pub struct ProbabilityTable {
    rows: Vec<Vec<f64>>,
}

impl ProbabilityTable {
    /// Validates that `rows` has one row per variable, each the width of
    /// that variable's domain and summing to 1 within tolerance.
    pub fn new(manager: &Manager, rows: Vec<Vec<f64>>) -> Result<Self, ReliabilityError> {
        if rows.len() != manager.var_count() {
            return Err(ReliabilityError::Manager(ManagerError::DomainCountMismatch {
                var_count: manager.var_count(),
                domains_given: rows.len(),
            }));
        }
        for (i, row) in rows.iter().enumerate() {
            let domain = manager.domain(i)?;
            let sum: f64 = row.iter().sum();
            if row.len() != domain as usize || (sum - 1.0).abs() > PROBABILITY_EPSILON {
                return Err(ReliabilityError::InvalidProbabilityTable { index: i, sum });
            }
        }
        Ok(ProbabilityTable { rows })
    }

    /// The probability row for variable `index`.
    pub fn row(&self, index: VarIndex) -> &[f64] {
        &self.rows[index]
    }
}

/// Populates the manager's probability cache via a level-order downward
/// propagation pass: the root carries probability 1, and probability flows
/// to each son weighted by `table`'s entry for that variable/value. Reading
/// results back out is `get_probability`/`get_availability`/
/// `get_unavailability`.
pub fn calculate_probabilities(
    manager: &Manager,
    f: &Diagram,
    table: &ProbabilityTable,
) -> Result<(), ReliabilityError> {
    manager.check_same_manager(f)?;
    let mut order = manager.reachable_preorder(f.root());
    order.sort_by_key(|&id| manager.level_of_node(id));

    let mut data: HashMap<NodeId, f64> = HashMap::new();
    data.insert(f.root(), 1.0);

    let mut totals: HashMap<u32, f64> = HashMap::new();
    for id in order {
        let p = data.get(&id).copied().unwrap_or(0.0);
        match manager.node_value(id) {
            Some(Value::Val(v)) => {
                *totals.entry(v).or_insert(0.0) += p;
            }
            Some(Value::Undefined) => {}
            None => {
                let index = manager.node_index(id).expect("internal node has an index");
                let sons = manager.node_sons(id);
                let row = table.row(index);
                for (k, &son) in sons.iter().enumerate() {
                    *data.entry(son).or_insert(0.0) += p * row[k];
                }
            }
        }
    }
    manager.set_probabilities(totals);
    Ok(())
}

/// Reads `Prob(f = value)` from the manager's probability cache. Fails if
/// `calculate_probabilities` hasn't populated it yet; a value the table
/// simply never reached is a legitimate `0.0`, not an error.
pub fn get_probability(manager: &Manager, value: u32) -> Result<f64, ReliabilityError> {
    if !manager.has_probabilities() {
        return Err(ReliabilityError::UndefinedQuery);
    }
    Ok(manager.probability_of_value(value).unwrap_or(0.0))
}

/// `Prob(f >= s)` from the manager's probability cache.
pub fn get_availability(manager: &Manager, s: u32) -> Result<f64, ReliabilityError> {
    if !manager.has_probabilities() {
        return Err(ReliabilityError::UndefinedQuery);
    }
    let codomain = manager.codomain_size();
    Ok((s..codomain)
        .map(|v| manager.probability_of_value(v).unwrap_or(0.0))
        .sum())
}

/// `Prob(f < s)` from the manager's probability cache.
pub fn get_unavailability(manager: &Manager, s: u32) -> Result<f64, ReliabilityError> {
    if !manager.has_probabilities() {
        return Err(ReliabilityError::UndefinedQuery);
    }
    Ok((0..s)
        .map(|v| manager.probability_of_value(v).unwrap_or(0.0))
        .sum())
}

/// Post-order "number of true points" computation: the probability that
/// `node`'s function lands in `target`, under `table`, without touching the
/// manager's stored probability cache.
fn ntp_rec(
    manager: &Manager,
    node: NodeId,
    target: &HashSet<u32>,
    table: &ProbabilityTable,
    cache: &mut HashMap<NodeId, f64>,
) -> f64 {
    if let Some(&v) = cache.get(&node) {
        return v;
    }
    let result = match manager.node_value(node) {
        Some(Value::Val(v)) => {
            if target.contains(&v) {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::Undefined) => 0.0,
        None => {
            let index = manager.node_index(node).expect("internal node has an index");
            let sons = manager.node_sons(node);
            let row = table.row(index);
            sons.iter()
                .enumerate()
                .map(|(k, &son)| row[k] * ntp_rec(manager, son, target, table, cache))
                .sum()
        }
    };
    cache.insert(node, result);
    result
}

/// One-shot `Prob(f = value)`, computed directly from `f` and `table`
/// without requiring `calculate_probabilities` to have run first.
pub fn probability(
    manager: &Manager,
    f: &Diagram,
    table: &ProbabilityTable,
    value: u32,
) -> Result<f64, ReliabilityError> {
    manager.check_same_manager(f)?;
    let target: HashSet<u32> = [value].into_iter().collect();
    let mut cache = HashMap::new();
    Ok(ntp_rec(manager, f.root(), &target, table, &mut cache))
}

/// One-shot `Prob(f >= s)`.
pub fn availability(
    manager: &Manager,
    f: &Diagram,
    table: &ProbabilityTable,
    s: u32,
) -> Result<f64, ReliabilityError> {
    manager.check_same_manager(f)?;
    let target: HashSet<u32> = (s..manager.codomain_size()).collect();
    let mut cache = HashMap::new();
    Ok(ntp_rec(manager, f.root(), &target, table, &mut cache))
}

/// One-shot `Prob(f < s)`.
pub fn unavailability(
    manager: &Manager,
    f: &Diagram,
    table: &ProbabilityTable,
    s: u32,
) -> Result<f64, ReliabilityError> {
    manager.check_same_manager(f)?;
    let target: HashSet<u32> = (0..s).collect();
    let mut cache = HashMap::new();
    Ok(ntp_rec(manager, f.root(), &target, table, &mut cache))
}

/// `satisfy_count(value, f) / domain_product` — the fraction of the input
/// space mapping to `value`, independent of any probability table.
pub fn state_frequency(manager: &Manager, f: &Diagram, value: u32) -> Result<f64, ReliabilityError> {
    manager.check_same_manager(f)?;
    let count = manager.satisfy_count(f, value)?;
    let mut domain_product: u128 = 1;
    for i in 0..manager.var_count() {
        domain_product *= manager.domain(i)? as u128;
    }
    Ok(count as f64 / domain_product as f64)
}

/// Direct Partial Logic Derivative of `f` with respect to `change`: a
/// diagram over the remaining variables that is `1` exactly where `pred`
/// holds between `f` restricted to `change.from` and `f` restricted to
/// `change.to`.
pub fn dpld(
    manager: &Manager,
    f: &Diagram,
    change: VarChange,
    pred: DpldPredicate,
) -> Result<Diagram, ReliabilityError> {
    manager.check_same_manager(f)?;
    let fa = manager.restrict(f, change.index, change.from)?;
    let fb = manager.restrict(f, change.index, change.to)?;
    Ok(manager.dpld_combine(&fa, &fb, pred))
}

/// Extended DPLD: `dpld` with the changed variable reinserted at its
/// original level, fixed at `change.from`, `Undefined` everywhere else —
/// needed so `mcvs`/`mpvs` can report which value of the changed variable
/// produced the crossing.
pub fn to_dpld_e(
    manager: &Manager,
    f: &Diagram,
    change: VarChange,
    pred: DpldPredicate,
) -> Result<Diagram, ReliabilityError> {
    let d = dpld(manager, f, change, pred)?;
    Ok(manager.to_dpld_e_raw(&d, change.index, change.from))
}

/// `satisfy_count(1, dpld) / domain_product` over the DPLD's own variables.
pub fn structural_importance(manager: &Manager, dpld: &Diagram) -> Result<f64, ReliabilityError> {
    state_frequency(manager, dpld, 1)
}

/// `Prob(dpld = 1)` under `table`.
pub fn birnbaum_importance(
    manager: &Manager,
    table: &ProbabilityTable,
    dpld: &Diagram,
) -> Result<f64, ReliabilityError> {
    probability(manager, dpld, table, 1)
}

/// Minimal normal form rewrite (§4.6.1): post-order upward saturation (a
/// `1` terminal absorbs every lower-value sibling) then downward smoothing
/// (a `0` terminal is replaced by its next-higher sibling).
pub fn minimal_normal_form(manager: &Manager, f: &Diagram) -> Result<Diagram, ReliabilityError> {
    manager.check_same_manager(f)?;
    Ok(manager.mnf_raw(f))
}

/// Fussell-Vesely importance of the component changing at `comp_index`:
/// the probability that component is in a failed state below `comp_state`,
/// times the probability the rest of the system is in a minimal-normal-form
/// cut state per `dpld`, over the system's overall unavailability.
pub fn fussell_vesely(
    manager: &Manager,
    table: &ProbabilityTable,
    dpld: &Diagram,
    system_unavailability: f64,
    comp_state: u32,
    comp_index: VarIndex,
) -> Result<f64, ReliabilityError> {
    manager.check_same_manager(dpld)?;
    let comp_prob: f64 = table.row(comp_index)[..comp_state as usize].iter().sum();
    let mnf = minimal_normal_form(manager, dpld)?;
    let p = probability(manager, &mnf, table, 1)?;
    Ok(comp_prob * p / system_unavailability)
}

fn minimal_vectors(
    manager: &Manager,
    f: &Diagram,
    s: u32,
    increase: bool,
) -> Result<Vec<Vec<u32>>, ReliabilityError> {
    let mut dplds = Vec::new();
    for index in 0..manager.var_count() {
        let domain = manager.domain(index)?;
        for k in 0..domain.saturating_sub(1) {
            let (change, pred) = if increase {
                (
                    VarChange { index, from: k, to: k + 1 },
                    DpldPredicate::Type3Inc(s),
                )
            } else {
                (
                    VarChange { index, from: k + 1, to: k },
                    DpldPredicate::Type3Dec(s),
                )
            };
            dplds.push(to_dpld_e(manager, f, change, pred)?);
        }
    }
    if dplds.is_empty() {
        return Ok(Vec::new());
    }
    let combined = manager.tree_fold(Op::PiConj, &dplds)?;
    Ok(manager.satisfy_all(&combined, 1)?)
}

/// Minimal cut vectors of `f` with respect to crossing threshold `s`: every
/// minimal variable assignment (`Undefined` coordinates mean "any value")
/// that pushes `f` from below `s` up to at least `s`.
pub fn mcvs(manager: &Manager, f: &Diagram, s: u32) -> Result<Vec<Vec<u32>>, ReliabilityError> {
    manager.check_same_manager(f)?;
    minimal_vectors(manager, f, s, true)
}

/// Minimal path vectors: dual of `mcvs`, built from the type-3-decrease
/// extended DPLDs.
pub fn mpvs(manager: &Manager, f: &Diagram, s: u32) -> Result<Vec<Vec<u32>>, ReliabilityError> {
    manager.check_same_manager(f)?;
    minimal_vectors(manager, f, s, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::Op;

    fn series_system(manager: &Manager) -> Diagram {
        let x0 = manager.variable(0).unwrap();
        let x1 = manager.variable(1).unwrap();
        manager.apply(Op::And, &x0, &x1).unwrap()
    }

    #[test]
    fn probability_of_a_series_system_is_the_product_of_component_probabilities() {
        let m = Manager::new_bdd(2, None).unwrap();
        let f = series_system(&m);
        let table = ProbabilityTable::new(&m, vec![vec![0.1, 0.9], vec![0.2, 0.8]]).unwrap();
        calculate_probabilities(&m, &f, &table).unwrap();
        let working = get_probability(&m, 1).unwrap();
        assert!((working - 0.72).abs() < 1e-9);
    }

    #[test]
    fn one_shot_probability_agrees_with_calculate_probabilities() {
        let m = Manager::new_bdd(2, None).unwrap();
        let f = series_system(&m);
        let table = ProbabilityTable::new(&m, vec![vec![0.3, 0.7], vec![0.4, 0.6]]).unwrap();
        calculate_probabilities(&m, &f, &table).unwrap();
        let via_cache = get_probability(&m, 1).unwrap();
        let one_shot = probability(&m, &f, &table, 1).unwrap();
        assert!((via_cache - one_shot).abs() < 1e-9);
    }

    #[test]
    fn probability_table_rejects_rows_that_do_not_sum_to_one() {
        let m = Manager::new_bdd(1, None).unwrap();
        let err = ProbabilityTable::new(&m, vec![vec![0.4, 0.4]]).unwrap_err();
        assert!(matches!(err, ReliabilityError::InvalidProbabilityTable { .. }));
    }

    #[test]
    fn queries_before_calculate_probabilities_are_rejected() {
        let m = Manager::new_bdd(1, None).unwrap();
        assert_eq!(
            get_probability(&m, 0).unwrap_err(),
            ReliabilityError::UndefinedQuery
        );
    }

    #[test]
    fn basic_dpld_of_and_is_one_exactly_at_the_other_input() {
        let m = Manager::new_bdd(2, None).unwrap();
        let f = series_system(&m);
        let change = VarChange { index: 0, from: 0, to: 1 };
        let d = dpld(&m, &f, change, DpldPredicate::Basic { a: 0, b: 1 }).unwrap();
        assert_eq!(m.evaluate(&d, &[0, 1]).unwrap(), Value::Val(1));
        assert_eq!(m.evaluate(&d, &[0, 0]).unwrap(), Value::Val(0));
    }

    #[test]
    fn structural_importance_of_a_series_system_input_is_one_half() {
        let m = Manager::new_bdd(2, None).unwrap();
        let f = series_system(&m);
        let change = VarChange { index: 0, from: 0, to: 1 };
        let d = dpld(&m, &f, change, DpldPredicate::Type1Inc(0)).unwrap();
        let si = structural_importance(&m, &d).unwrap();
        assert!((si - 0.5).abs() < 1e-9);
    }

    #[test]
    fn minimal_normal_form_saturates_and_smooths() {
        let m = Manager::new_fixed(1, 3, 2, None).unwrap();
        let x0 = m.variable(0).unwrap();
        let f = m.apply(Op::And, &x0, &m.constant(1).unwrap()).unwrap();
        let mnf = minimal_normal_form(&m, &f).unwrap();
        assert_eq!(m.evaluate(&mnf, &[2]).unwrap(), m.evaluate(&f, &[2]).unwrap());
    }

    #[test]
    fn mcvs_of_a_series_system_are_the_two_single_component_failures() {
        let m = Manager::new_bdd(2, None).unwrap();
        let f = series_system(&m);
        let cuts = mcvs(&m, &f, 1).unwrap();
        assert!(!cuts.is_empty());
    }
}
