//! The node manager (§4.4 "C5"): canonicalisation, allocation, garbage
//! collection, variable reordering and the recursive apply engine.
//!
//! Grounded on `espresso-logic`'s `BddManager` (`src/bdd/mod.rs`), which
//! wraps its tables in `Arc<RwLock<..>>` so a `Bdd` handle can be cloned and
//! shared across threads. This engine has no concurrent collaborators (the
//! spec names none), so the handle is `Rc<RefCell<Inner>>` instead — same
//! shared-ownership shape, without paying for synchronisation nobody needs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::apply::{eval_op, Fold, Op};
use crate::cache::{ApplyCache, NodeCache, PairCache};
use crate::config::ManagerConfig;
use crate::diagram::Diagram;
use crate::error::ManagerError;
use crate::node::{Level, NodeData, NodeId, Value, VarIndex};
use crate::pool::NodePool;
use crate::reliability::DpldPredicate;
use crate::unique_table::{TerminalTable, UniqueTable};

/// How a manager's variables are typed (§4 "Manager").
#[derive(Debug, Clone)]
enum Domains {
    /// Every variable has domain `{0,1}`.
    Bdd,
    /// Every variable shares one domain size.
    Fixed(u32),
    /// Per-variable domain sizes.
    Mixed(Vec<u32>),
}

impl Domains {
    fn resolve(&self, var_count: usize) -> Vec<u32> {
        match self {
            Domains::Bdd => vec![2; var_count],
            Domains::Fixed(k) => vec![*k; var_count],
            Domains::Mixed(v) => v.clone(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Inner {
    pool: NodePool,
    unique_tables: Vec<UniqueTable>,
    terminals: TerminalTable,
    apply_cache: ApplyCache,
    domains: Vec<u32>,
    codomain_size: u32,
    index_to_level: Vec<Level>,
    level_to_index: Vec<VarIndex>,
    config: ManagerConfig,
    defer_reorder: bool,
    /// `Prob(f = v)` per codomain value, populated by
    /// `calculate_probabilities` and consumed by
    /// `get_probability`/`get_availability`/`get_unavailability` (§4.6).
    pub(crate) probabilities: Option<HashMap<u32, f64>>,
}

/// A handle to a shared node manager.
///
/// Cheap to clone (an `Rc` bump); every clone observes the same tables. Two
/// managers are never the same even if constructed identically — compare
/// `Diagram`s, not `Manager`s, for structural equality.
#[derive(Debug, Clone)]
pub struct Manager {
    pub(crate) inner: Rc<RefCell<Inner>>,
}

impl Inner {
    fn var_count(&self) -> usize {
        self.domains.len()
    }

    fn check_var(&self, index: VarIndex) -> Result<(), ManagerError> {
        if index >= self.var_count() {
            Err(ManagerError::VariableOutOfRange {
                index,
                var_count: self.var_count(),
            })
        } else {
            Ok(())
        }
    }

    fn check_value(&self, index: VarIndex, value: u32) -> Result<(), ManagerError> {
        self.check_var(index)?;
        let domain_size = self.domains[index];
        if value >= domain_size {
            Err(ManagerError::ValueOutOfDomain {
                index,
                value,
                domain_size,
            })
        } else {
            Ok(())
        }
    }

    fn check_codomain_value(&self, value: u32) -> Result<(), ManagerError> {
        if value >= self.codomain_size {
            Err(ManagerError::ValueOutOfCodomain {
                value,
                codomain_size: self.codomain_size,
            })
        } else {
            Ok(())
        }
    }

    fn level_of_node(&self, id: NodeId) -> Level {
        match self.pool.get(id).data.index() {
            Some(i) => self.index_to_level[i],
            None => self.var_count(),
        }
    }

    // -- allocation policy (§4.4.3) ------------------------------------

    fn ensure_capacity(&mut self) {
        if self.pool.available() > 0 {
            return;
        }
        if self.config.auto_reorder {
            self.pool.grow();
            self.defer_reorder = true;
        } else {
            let before = self.pool.live_count();
            self.gc();
            let reclaimed = before.saturating_sub(self.pool.live_count());
            let threshold = self.config.gc_ratio * self.config.main_pool_size as f64;
            if (reclaimed as f64) < threshold {
                self.pool.grow();
            }
        }
    }

    /// Runs GC and sifting owed by a deferred allocation, at the boundary of
    /// a public call where no recursion is in flight (§4.4.3, §4.4.5).
    fn run_deferred(&mut self) {
        if self.defer_reorder {
            self.defer_reorder = false;
            self.gc();
            if self.config.auto_reorder {
                self.sift();
            }
        }
    }

    // -- canonicalisation (§4.4.1, §4.4.2) ------------------------------

    fn make_terminal_raw(&mut self, value: u32) -> NodeId {
        if let Some(id) = self.terminals.find(value) {
            self.pool.get_mut(id).mark = true;
            return id;
        }
        self.ensure_capacity();
        let id = self.pool.create(NodeData::Terminal(Value::Val(value)));
        self.terminals.insert(value, id);
        self.pool.get_mut(id).mark = true;
        id
    }

    fn make_special_raw(&mut self) -> NodeId {
        if let Some(id) = self.terminals.find_undefined() {
            self.pool.get_mut(id).mark = true;
            return id;
        }
        self.ensure_capacity();
        let id = self.pool.create(NodeData::Terminal(Value::Undefined));
        self.terminals.set_undefined(id);
        self.pool.get_mut(id).mark = true;
        id
    }

    /// Builds (or finds) the internal node `index -> sons`, applying
    /// reducedness (I2) and uniqueness (I1), and bumping each son's refcount
    /// (I4). The returned node is left `mark`ed, a transient guard cleared
    /// either when it becomes a son of another new node or is wrapped into a
    /// handle by `finish` (§4.4.1).
    fn make_internal_raw(&mut self, index: VarIndex, sons: Vec<NodeId>) -> NodeId {
        debug_assert!(!sons.is_empty());
        if sons.iter().all(|&s| s == sons[0]) {
            let id = sons[0];
            self.pool.get_mut(id).mark = true;
            return id;
        }
        let key: Box<[NodeId]> = sons.clone().into_boxed_slice();
        if let Some(existing) = self.unique_tables[index].find(&key) {
            // `sons` already has an owning edge into it via `existing`'s own
            // node data — no new edge is created here, so no refcount bump,
            // but each son's transient root guard must still be released
            // now that it is not becoming a fresh node's child.
            for &s in sons.iter() {
                self.pool.get_mut(s).mark = false;
            }
            self.pool.get_mut(existing).mark = true;
            return existing;
        }
        self.ensure_capacity();
        let id = self.pool.create(NodeData::Internal {
            index,
            sons: key.clone(),
        });
        self.unique_tables[index].insert(key, id);
        for &s in sons.iter() {
            let node = self.pool.get_mut(s);
            node.refcount += 1;
            node.mark = false;
        }
        self.pool.get_mut(id).mark = true;
        id
    }

    /// Bumps a handle-level refcount and clears the transient mark guard —
    /// the step that turns a freshly built node into something a `Diagram`
    /// can safely own (§4.4.1 point 4).
    fn finish(&mut self, root: NodeId) -> NodeId {
        let node = self.pool.get_mut(root);
        node.refcount += 1;
        node.mark = false;
        root
    }

    pub(crate) fn inc_ref(&mut self, id: NodeId) {
        self.pool.get_mut(id).refcount += 1;
    }

    pub(crate) fn dec_ref(&mut self, id: NodeId) {
        let node = self.pool.get_mut(id);
        if node.refcount > 0 {
            node.refcount -= 1;
        }
    }

    // -- garbage collection (§4.4.4) -------------------------------------

    /// Decrements `id`'s refcount and, if it dies and isn't `mark`ed,
    /// recursively releases it (including its sons) immediately. Used where
    /// the caller needs the node count to reflect the release right away
    /// (variable swap) rather than waiting for the next GC sweep.
    fn release(&mut self, id: NodeId) {
        let node = self.pool.get_mut(id);
        if node.refcount > 0 {
            node.refcount -= 1;
        }
        if node.refcount == 0 && !node.mark {
            self.force_release(id);
        }
    }

    fn force_release(&mut self, id: NodeId) {
        let data = self.pool.get(id).data.clone();
        match data {
            NodeData::Terminal(Value::Val(v)) => {
                self.terminals.remove(v);
                self.pool.destroy(id);
            }
            NodeData::Terminal(Value::Undefined) => {
                self.terminals.clear_undefined();
                self.pool.destroy(id);
            }
            NodeData::Internal { index, sons } => {
                self.unique_tables[index].remove(&sons);
                self.pool.destroy(id);
                for s in sons.iter() {
                    self.release(*s);
                }
            }
        }
    }

    /// Exhaustive sweep: every live node with a zero refcount and a clear
    /// mark is reclaimed, cascading through its sons. Returns the number of
    /// nodes reclaimed.
    fn gc(&mut self) -> usize {
        let before = self.pool.live_count();
        let dead: Vec<NodeId> = self
            .pool
            .live_ids()
            .filter(|&id| {
                let n = self.pool.get(id);
                n.refcount == 0 && !n.mark
            })
            .collect();
        for id in dead {
            if self.pool.is_live(id) {
                self.force_release(id);
            }
        }
        self.apply_cache.evict_dead(|id| self.pool.is_live(id));
        let target = (self.config.cache_ratio * self.pool.live_count() as f64) as usize;
        self.apply_cache.adjust_capacity(target);
        before.saturating_sub(self.pool.live_count())
    }

    // -- variable reordering (§4.4.5) ------------------------------------

    /// Swaps the variables at adjacent levels `level` and `level + 1` in
    /// place, preserving every affected node's `NodeId` so parents and
    /// handles above it need no rewriting. Grounded on the classic
    /// CUDD-style local swap: every node of the upper variable is rebuilt as
    /// a node of the lower one via the cofactor matrix
    /// `C[a][b] = son_a.son_b` (or `son_a` unchanged if `son_a` isn't itself
    /// an instance of the lower variable), then `new_sons[b] =
    /// make_internal(i, col_b)`.
    pub(crate) fn swap_adjacent(&mut self, level: Level) {
        let i = self.level_to_index[level];
        let next = self.level_to_index[level + 1];
        let d_i = self.domains[i] as usize;
        let d_next = self.domains[next] as usize;
        let nodes = self.unique_tables[i].node_ids();
        for n in nodes {
            let sons_i = self.pool.get(n).data.sons().to_vec();
            debug_assert_eq!(sons_i.len(), d_i);

            let depends_on_next = sons_i
                .iter()
                .any(|&s| self.pool.get(s).data.index() == Some(next));
            if !depends_on_next {
                // `n` never tests `next` on any of its branches, so its
                // function doesn't change shape under the swap — leave it
                // testing `i` untouched rather than rebuilding it as a
                // `next`-level node whose branches would all collapse to the
                // same son (an unreduced node, violating the no-redundant-
                // test invariant).
                continue;
            }

            self.unique_tables[i].remove(&sons_i);

            let mut new_sons = Vec::with_capacity(d_next);
            for b in 0..d_next {
                let col: Vec<NodeId> = (0..d_i)
                    .map(|a| {
                        let son = sons_i[a];
                        let son_data = &self.pool.get(son).data;
                        if son_data.index() == Some(next) {
                            son_data.sons()[b]
                        } else {
                            son
                        }
                    })
                    .collect();
                new_sons.push(self.make_internal_raw(i, col));
            }

            for &old_son in sons_i.iter() {
                self.release(old_son);
            }
            for &s in new_sons.iter() {
                let node = self.pool.get_mut(s);
                node.refcount += 1;
                node.mark = false;
            }

            let key: Box<[NodeId]> = new_sons.into_boxed_slice();
            debug_assert!(
                self.unique_tables[next].find(&key).is_none(),
                "variable swap produced a node colliding with an existing canonical node"
            );
            self.pool.get_mut(n).data = NodeData::Internal { index: next, sons: key.clone() };
            self.unique_tables[next].insert(key, n);
        }
        self.level_to_index.swap(level, level + 1);
        self.index_to_level[i] = level + 1;
        self.index_to_level[next] = level;
    }

    /// Moves `var` to the level that minimises the live node count, trying
    /// every adjacent swap downward then upward before settling (§4.4.5).
    fn sift_one(&mut self, var: VarIndex) {
        let start_level = self.index_to_level[var];
        let mut level = start_level;
        let mut best_level = start_level;
        let mut best_count = self.pool.live_count();

        while level + 1 < self.var_count() {
            self.swap_adjacent(level);
            level += 1;
            let count = self.pool.live_count();
            if count < best_count {
                best_count = count;
                best_level = level;
            }
        }
        while level > 0 {
            self.swap_adjacent(level - 1);
            level -= 1;
            let count = self.pool.live_count();
            if count < best_count {
                best_count = count;
                best_level = level;
            }
        }
        while level < best_level {
            self.swap_adjacent(level);
            level += 1;
        }
    }

    /// One sifting pass over every variable, visited in descending order of
    /// how many nodes currently reference it (the variables most likely to
    /// benefit from relocation move first).
    fn sift(&mut self) {
        let mut order: Vec<VarIndex> = (0..self.var_count()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(self.unique_tables[i].len()));
        for var in order {
            self.sift_one(var);
        }
    }

    // -- traversal (§4.4.6) ----------------------------------------------

    /// Reachable nodes from `root`, parent before children, each visited
    /// once regardless of sharing. Restores every mark to `false` before
    /// returning via a mirrored second pass (§4.4.6 "mark-toggle").
    pub(crate) fn reachable_preorder(&mut self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        self.mark_walk(root, true, Some(&mut order));
        self.mark_walk(root, false, None);
        order
    }

    fn mark_walk(&mut self, id: NodeId, target: bool, mut out: Option<&mut Vec<NodeId>>) {
        if self.pool.get(id).mark == target {
            return;
        }
        self.pool.get_mut(id).mark = target;
        if let Some(o) = out.as_deref_mut() {
            o.push(id);
        }
        let sons = self.pool.get(id).data.sons().to_vec();
        for s in sons {
            self.mark_walk(s, target, out.as_deref_mut());
        }
    }

    // -- apply engine (§4.4.7 "C7") ---------------------------------------

    fn min_level_var(&self, f: NodeId, g: NodeId) -> VarIndex {
        let lf = self.level_of_node(f);
        let lg = self.level_of_node(g);
        if lf <= lg {
            self.pool.get(f).data.index().expect("f is not a terminal")
        } else {
            self.pool.get(g).data.index().expect("g is not a terminal")
        }
    }

    fn cofactor(&self, node: NodeId, i_star: VarIndex, k: usize) -> NodeId {
        match &self.pool.get(node).data {
            NodeData::Internal { index, sons } if *index == i_star => sons[k],
            _ => node,
        }
    }

    pub(crate) fn apply_rec(&mut self, op: Op, f: NodeId, g: NodeId) -> NodeId {
        let f_terminal = self.pool.get(f).data.is_terminal();
        let g_terminal = self.pool.get(g).data.is_terminal();
        if f_terminal && g_terminal {
            let a = match &self.pool.get(f).data {
                NodeData::Terminal(v) => *v,
                _ => unreachable!(),
            };
            let b = match &self.pool.get(g).data {
                NodeData::Terminal(v) => *v,
                _ => unreachable!(),
            };
            return match eval_op(op, self.codomain_size, a, b) {
                Value::Val(v) => self.make_terminal_raw(v),
                Value::Undefined => self.make_special_raw(),
            };
        }
        if let Some(cached) = self.apply_cache.get(op, f, g) {
            self.pool.get_mut(cached).mark = true;
            return cached;
        }
        let i_star = self.min_level_var(f, g);
        let d = self.domains[i_star] as usize;
        let mut sons = Vec::with_capacity(d);
        for k in 0..d {
            let fk = self.cofactor(f, i_star, k);
            let gk = self.cofactor(g, i_star, k);
            sons.push(self.apply_rec(op, fk, gk));
        }
        let r = self.make_internal_raw(i_star, sons);
        self.apply_cache.put(op, f, g, r);
        r
    }

    fn restrict_rec(&mut self, node: NodeId, i: VarIndex, v: u32, cache: &mut NodeCache) -> NodeId {
        if let Some(c) = cache.get(node) {
            self.pool.get_mut(c).mark = true;
            return c;
        }
        let data = self.pool.get(node).data.clone();
        let result = match data {
            NodeData::Terminal(_) => {
                self.pool.get_mut(node).mark = true;
                node
            }
            NodeData::Internal { index, sons } if index == i => {
                self.restrict_rec(sons[v as usize], i, v, cache)
            }
            NodeData::Internal { index, sons } => {
                let new_sons: Vec<NodeId> = sons
                    .iter()
                    .map(|&s| self.restrict_rec(s, i, v, cache))
                    .collect();
                self.make_internal_raw(index, new_sons)
            }
        };
        cache.put(node, result);
        result
    }

    // -- reliability layer support (§4.6 "C9") ---------------------------

    /// Two-diagram synchronous rewrite underlying `dpld`: descends in
    /// lock-step by minimum level, combining terminal pairs through `pred`
    /// instead of a fixed `Op` (§4.6 "Implementation"). `lhs`/`rhs` are
    /// expected to already have the changed variable cofactored out (via
    /// `restrict`), so no special-casing of that variable is needed here —
    /// it simply never recurs.
    pub(crate) fn dpld_combine_rec(
        &mut self,
        lhs: NodeId,
        rhs: NodeId,
        pred: DpldPredicate,
        cache: &mut PairCache,
    ) -> NodeId {
        let lhs_terminal = self.pool.get(lhs).data.is_terminal();
        let rhs_terminal = self.pool.get(rhs).data.is_terminal();
        if lhs_terminal && rhs_terminal {
            let a = match &self.pool.get(lhs).data {
                NodeData::Terminal(v) => *v,
                _ => unreachable!(),
            };
            let b = match &self.pool.get(rhs).data {
                NodeData::Terminal(v) => *v,
                _ => unreachable!(),
            };
            return match (a, b) {
                (Value::Val(x), Value::Val(y)) => {
                    self.make_terminal_raw(u32::from(pred.holds(x, y)))
                }
                _ => self.make_special_raw(),
            };
        }
        if let Some(cached) = cache.get(lhs, rhs) {
            self.pool.get_mut(cached).mark = true;
            return cached;
        }
        let i_star = self.min_level_var(lhs, rhs);
        let d = self.domains[i_star] as usize;
        let mut sons = Vec::with_capacity(d);
        for k in 0..d {
            let l = self.cofactor(lhs, i_star, k);
            let r = self.cofactor(rhs, i_star, k);
            sons.push(self.dpld_combine_rec(l, r, pred, cache));
        }
        let result = self.make_internal_raw(i_star, sons);
        cache.put(lhs, rhs, result);
        result
    }

    /// Reinserts `var_index` (fixed at `var_from`, `Undefined` elsewhere) at
    /// its original level above `node` (§4.6 "Extended DPLD").
    pub(crate) fn to_dpld_e_raw(&mut self, root: NodeId, var_index: VarIndex, var_from: u32) -> NodeId {
        let root_level = self.level_of_node(root);
        let var_level = self.index_to_level[var_index];
        if var_level < root_level {
            let var_domain = self.domains[var_index];
            let sons: Vec<NodeId> = (0..var_domain)
                .map(|k| if k == var_from { root } else { self.make_special_raw() })
                .collect();
            self.make_internal_raw(var_index, sons)
        } else {
            let mut cache = NodeCache::new();
            self.to_dpld_e_rec(root, var_index, var_from, &mut cache)
        }
    }

    fn to_dpld_e_rec(
        &mut self,
        node: NodeId,
        var_index: VarIndex,
        var_from: u32,
        cache: &mut NodeCache,
    ) -> NodeId {
        if self.pool.get(node).data.is_terminal() {
            return node;
        }
        if let Some(c) = cache.get(node) {
            self.pool.get_mut(c).mark = true;
            return c;
        }
        let var_level = self.index_to_level[var_index];
        let node_level = self.level_of_node(node);
        let (node_index, sons) = match &self.pool.get(node).data {
            NodeData::Internal { index, sons } => (*index, sons.to_vec()),
            NodeData::Terminal(_) => unreachable!(),
        };
        let var_domain = self.domains[var_index];
        let mut new_sons = Vec::with_capacity(sons.len());
        for &son in sons.iter() {
            let son_level = self.level_of_node(son);
            if var_level > node_level && var_level < son_level {
                let inner_sons: Vec<NodeId> = (0..var_domain)
                    .map(|k| if k == var_from { son } else { self.make_special_raw() })
                    .collect();
                new_sons.push(self.make_internal_raw(var_index, inner_sons));
            } else {
                new_sons.push(self.to_dpld_e_rec(son, var_index, var_from, cache));
            }
        }
        let result = self.make_internal_raw(node_index, new_sons);
        cache.put(node, result);
        result
    }

    /// Minimal normal form rewrite (§4.6.1): post-order upward saturation
    /// then downward smoothing of each internal node's son array.
    pub(crate) fn mnf_rec(&mut self, node: NodeId, cache: &mut NodeCache) -> NodeId {
        if self.pool.get(node).data.is_terminal() {
            return node;
        }
        if let Some(c) = cache.get(node) {
            self.pool.get_mut(c).mark = true;
            return c;
        }
        let (index, sons) = match &self.pool.get(node).data {
            NodeData::Internal { index, sons } => (*index, sons.to_vec()),
            NodeData::Terminal(_) => unreachable!(),
        };
        let mut new_sons: Vec<NodeId> = sons
            .iter()
            .map(|&s| self.mnf_rec(s, cache))
            .collect();
        let d = new_sons.len();

        let mut saturate_from: Option<usize> = None;
        for k in (0..d).rev() {
            if let NodeData::Terminal(Value::Val(1)) = &self.pool.get(new_sons[k]).data {
                saturate_from = Some(k);
                break;
            }
        }
        if let Some(k) = saturate_from {
            let replacement = new_sons[k];
            for slot in new_sons.iter_mut().take(k) {
                *slot = replacement;
            }
        }

        for k in (0..d.saturating_sub(1)).rev() {
            if let NodeData::Terminal(Value::Val(0)) = &self.pool.get(new_sons[k]).data {
                new_sons[k] = new_sons[k + 1];
            }
        }

        let result = self.make_internal_raw(index, new_sons);
        cache.put(node, result);
        result
    }

    // -- satisfy_count / satisfy_all (§4.4.8 "C8") ------------------------

    fn skipped_domain_product(&self, from_level: Level, to_level: Level) -> u128 {
        let mut p: u128 = 1;
        for l in (from_level + 1)..to_level {
            let idx = self.level_to_index[l];
            p *= self.domains[idx] as u128;
        }
        p
    }

    /// Product of domain sizes for every level strictly above `to_level` —
    /// the variables a diagram's root itself skips by not testing them.
    fn top_skipped_domain_product(&self, to_level: Level) -> u128 {
        let mut p: u128 = 1;
        for l in 0..to_level {
            let idx = self.level_to_index[l];
            p *= self.domains[idx] as u128;
        }
        p
    }

    fn satisfy_count_rec(&self, id: NodeId, v: u32, cache: &mut HashMap<NodeId, u128>) -> u128 {
        if let Some(&c) = cache.get(&id) {
            return c;
        }
        let result = match &self.pool.get(id).data {
            NodeData::Terminal(Value::Val(x)) => u128::from(*x == v),
            NodeData::Terminal(Value::Undefined) => 0,
            NodeData::Internal { index, sons } => {
                let my_level = self.index_to_level[*index];
                let mut total: u128 = 0;
                for &son in sons.iter() {
                    let son_level = self.level_of_node(son);
                    let skip = self.skipped_domain_product(my_level, son_level);
                    total += skip * self.satisfy_count_rec(son, v, cache);
                }
                total
            }
        };
        cache.insert(id, result);
        result
    }

    fn satisfy_all_rec(
        &self,
        node: NodeId,
        level: Level,
        v: u32,
        assignment: &mut [u32],
        out: &mut Vec<Vec<u32>>,
    ) {
        if level == self.var_count() {
            if let NodeData::Terminal(Value::Val(x)) = &self.pool.get(node).data {
                if *x == v {
                    out.push(assignment.to_vec());
                }
            }
            return;
        }
        let var_at_level = self.level_to_index[level];
        let dom = self.domains[var_at_level];
        let node_level = self.level_of_node(node);
        if node_level == level {
            let sons = self.pool.get(node).data.sons().to_vec();
            for (k, &son) in sons.iter().enumerate() {
                assignment[var_at_level] = k as u32;
                self.satisfy_all_rec(son, level + 1, v, assignment, out);
            }
        } else {
            for k in 0..dom {
                assignment[var_at_level] = k;
                self.satisfy_all_rec(node, level + 1, v, assignment, out);
            }
        }
    }

    fn dependency_set_rec(&mut self, root: NodeId) -> Vec<VarIndex> {
        let nodes = self.reachable_preorder(root);
        let mut set: Vec<VarIndex> = nodes
            .into_iter()
            .filter_map(|id| self.pool.get(id).data.index())
            .collect();
        set.sort_unstable();
        set.dedup();
        set
    }

    fn evaluate_rec(&self, mut node: NodeId, x: &[u32]) -> Value {
        loop {
            match &self.pool.get(node).data {
                NodeData::Terminal(v) => return *v,
                NodeData::Internal { index, sons } => node = sons[x[*index] as usize],
            }
        }
    }
}

impl Manager {
    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    pub(crate) fn check_same_manager(&self, d: &Diagram) -> Result<(), ManagerError> {
        if Rc::ptr_eq(&self.inner, &d.manager().inner) {
            Ok(())
        } else {
            Err(ManagerError::ForeignHandle)
        }
    }

    fn validate_order(order: &[VarIndex], var_count: usize) -> Result<(), ManagerError> {
        if order.len() != var_count {
            return Err(ManagerError::InvalidOrder);
        }
        let mut seen = vec![false; var_count];
        for &i in order {
            if i >= var_count || seen[i] {
                return Err(ManagerError::InvalidOrder);
            }
            seen[i] = true;
        }
        Ok(())
    }

    fn build(
        domains: Domains,
        var_count: usize,
        codomain_size: u32,
        order: Option<&[VarIndex]>,
        config: ManagerConfig,
    ) -> Result<Manager, ManagerError> {
        if codomain_size < 2 {
            return Err(ManagerError::DegenerateDomain { size: codomain_size });
        }
        let domains = domains.resolve(var_count);
        for &d in &domains {
            if d < 2 {
                return Err(ManagerError::DegenerateDomain { size: d });
            }
        }
        let level_to_index: Vec<VarIndex> = match order {
            Some(o) => {
                Self::validate_order(o, var_count)?;
                o.to_vec()
            }
            None => (0..var_count).collect(),
        };
        let mut index_to_level = vec![0usize; var_count];
        for (level, &index) in level_to_index.iter().enumerate() {
            index_to_level[index] = level;
        }
        let inner = Inner {
            pool: NodePool::new(config.main_pool_size, config.overflow_pool_size),
            unique_tables: (0..var_count).map(|_| UniqueTable::new()).collect(),
            terminals: TerminalTable::new(),
            apply_cache: ApplyCache::new(),
            domains,
            codomain_size,
            index_to_level,
            level_to_index,
            config,
            defer_reorder: false,
            probabilities: None,
        };
        Ok(Manager {
            inner: Rc::new(RefCell::new(inner)),
        })
    }

    /// A manager over `var_count` boolean variables with a boolean codomain.
    pub fn new_bdd(var_count: usize, order: Option<&[VarIndex]>) -> Result<Manager, ManagerError> {
        Self::build(Domains::Bdd, var_count, 2, order, ManagerConfig::default())
    }

    /// A manager where every variable shares domain `0..k` and the codomain
    /// has `codomain_size` values.
    pub fn new_fixed(
        var_count: usize,
        k: u32,
        codomain_size: u32,
        order: Option<&[VarIndex]>,
    ) -> Result<Manager, ManagerError> {
        Self::build(
            Domains::Fixed(k),
            var_count,
            codomain_size,
            order,
            ManagerConfig::default(),
        )
    }

    /// A manager with a per-variable domain table.
    pub fn new_mixed(
        domains: &[u32],
        codomain_size: u32,
        order: Option<&[VarIndex]>,
    ) -> Result<Manager, ManagerError> {
        Self::build(
            Domains::Mixed(domains.to_vec()),
            domains.len(),
            codomain_size,
            order,
            ManagerConfig::default(),
        )
    }

    /// `new_mixed` with an explicit tuning configuration.
    pub fn new_mixed_with_config(
        domains: &[u32],
        codomain_size: u32,
        order: Option<&[VarIndex]>,
        config: ManagerConfig,
    ) -> Result<Manager, ManagerError> {
        Self::build(
            Domains::Mixed(domains.to_vec()),
            domains.len(),
            codomain_size,
            order,
            config,
        )
    }

    pub fn var_count(&self) -> usize {
        self.inner.borrow().var_count()
    }

    pub fn codomain_size(&self) -> u32 {
        self.inner.borrow().codomain_size
    }

    pub fn domain(&self, index: VarIndex) -> Result<u32, ManagerError> {
        let inner = self.inner.borrow();
        inner.check_var(index)?;
        Ok(inner.domains[index])
    }

    /// Number of nodes currently allocated across the whole manager, not
    /// just those reachable from one diagram.
    pub fn total_node_count(&self) -> usize {
        self.inner.borrow().pool.live_count()
    }

    fn wrap(&self, root: NodeId) -> Diagram {
        let root = self.with_inner(|inner| inner.finish(root));
        Diagram::new(self.clone(), root)
    }

    /// Wraps a freshly built node into a handle and drains any allocation
    /// owed from the recursion that produced it, in one step (§4.4.3).
    pub(crate) fn finish_and_wrap(&self, root: NodeId) -> Diagram {
        let d = self.wrap(root);
        self.with_inner(|inner| inner.run_deferred());
        d
    }

    // -- creators (§6) -----------------------------------------------------

    pub fn constant(&self, value: u32) -> Result<Diagram, ManagerError> {
        self.inner.borrow().check_codomain_value(value)?;
        let root = self.with_inner(|inner| inner.make_terminal_raw(value));
        Ok(self.wrap(root))
    }

    pub fn special(&self) -> Diagram {
        let root = self.with_inner(|inner| inner.make_special_raw());
        self.wrap(root)
    }

    /// The projection function `f(x) = x_i`.
    pub fn variable(&self, index: VarIndex) -> Result<Diagram, ManagerError> {
        let root = {
            let mut inner = self.inner.borrow_mut();
            inner.check_var(index)?;
            let d = inner.domains[index] as usize;
            let sons: Vec<NodeId> = (0..d as u32).map(|v| inner.make_terminal_raw(v)).collect();
            inner.make_internal_raw(index, sons)
        };
        Ok(self.wrap(root))
    }

    // -- combinators ---------------------------------------------------

    pub fn apply(&self, op: Op, f: &Diagram, g: &Diagram) -> Result<Diagram, ManagerError> {
        self.check_same_manager(f)?;
        self.check_same_manager(g)?;
        let root = self.with_inner(|inner| inner.apply_rec(op, f.root(), g.root()));
        let d = self.wrap(root);
        self.with_inner(|inner| inner.run_deferred());
        Ok(d)
    }

    pub fn restrict(&self, f: &Diagram, i: VarIndex, v: u32) -> Result<Diagram, ManagerError> {
        self.check_same_manager(f)?;
        self.inner.borrow().check_value(i, v)?;
        let root = self.with_inner(|inner| {
            let mut cache = NodeCache::new();
            inner.restrict_rec(f.root(), i, v, &mut cache)
        });
        let d = self.wrap(root);
        self.with_inner(|inner| inner.run_deferred());
        Ok(d)
    }

    // -- reliability layer support (§4.6 "C9") ---------------------------

    /// Combines two already-`restrict`ed diagrams through `pred` instead of
    /// a fixed boolean/numeric op, underlying `dpld`.
    pub(crate) fn dpld_combine(
        &self,
        lhs: &Diagram,
        rhs: &Diagram,
        pred: DpldPredicate,
    ) -> Diagram {
        let root = self.with_inner(|inner| {
            let mut cache = PairCache::new();
            inner.dpld_combine_rec(lhs.root(), rhs.root(), pred, &mut cache)
        });
        self.finish_and_wrap(root)
    }

    /// Reinserts a variable, fixed at one value, above `f` at its original
    /// level, underlying `to_dpld_e`.
    pub(crate) fn to_dpld_e_raw(
        &self,
        f: &Diagram,
        var_index: VarIndex,
        var_from: u32,
    ) -> Diagram {
        let root = self.with_inner(|inner| inner.to_dpld_e_raw(f.root(), var_index, var_from));
        self.finish_and_wrap(root)
    }

    /// Minimal normal form rewrite, underlying `minimal_normal_form`.
    pub(crate) fn mnf_raw(&self, f: &Diagram) -> Diagram {
        let root = self.with_inner(|inner| {
            let mut cache = NodeCache::new();
            inner.mnf_rec(f.root(), &mut cache)
        });
        self.finish_and_wrap(root)
    }

    pub fn left_fold(&self, op: Op, ds: &[Diagram]) -> Result<Diagram, ManagerError> {
        let (first, rest) = ds.split_first().ok_or(ManagerError::EmptyFold)?;
        self.check_same_manager(first)?;
        for d in rest {
            self.check_same_manager(d)?;
        }
        let root = self.with_inner(|inner| {
            let mut acc = first.root();
            for d in rest {
                acc = inner.apply_rec(op, acc, d.root());
            }
            acc
        });
        let d = self.wrap(root);
        self.with_inner(|inner| inner.run_deferred());
        Ok(d)
    }

    pub fn tree_fold(&self, op: Op, ds: &[Diagram]) -> Result<Diagram, ManagerError> {
        if ds.is_empty() {
            return Err(ManagerError::EmptyFold);
        }
        for d in ds {
            self.check_same_manager(d)?;
        }
        fn rec(inner: &mut Inner, op: Op, ids: &[NodeId]) -> NodeId {
            if ids.len() == 1 {
                return ids[0];
            }
            let mid = ids.len() / 2;
            let l = rec(inner, op, &ids[..mid]);
            let r = rec(inner, op, &ids[mid..]);
            inner.apply_rec(op, l, r)
        }
        let ids: Vec<NodeId> = ds.iter().map(|d| d.root()).collect();
        let root = self.with_inner(|inner| rec(inner, op, &ids));
        let d = self.wrap(root);
        self.with_inner(|inner| inner.run_deferred());
        Ok(d)
    }

    pub fn fold(&self, op: Op, ds: &[Diagram], fold: Fold) -> Result<Diagram, ManagerError> {
        match fold {
            Fold::Left => self.left_fold(op, ds),
            Fold::Tree => self.tree_fold(op, ds),
        }
    }

    // -- queries (§4.4.8 "C8") -----------------------------------------

    pub fn evaluate(&self, f: &Diagram, x: &[u32]) -> Result<Value, ManagerError> {
        self.check_same_manager(f)?;
        let inner = self.inner.borrow();
        if x.len() != inner.var_count() {
            return Err(ManagerError::DomainCountMismatch {
                var_count: inner.var_count(),
                domains_given: x.len(),
            });
        }
        for (i, &v) in x.iter().enumerate() {
            inner.check_value(i, v)?;
        }
        Ok(inner.evaluate_rec(f.root(), x))
    }

    pub fn satisfy_count(&self, f: &Diagram, v: u32) -> Result<u128, ManagerError> {
        self.check_same_manager(f)?;
        let inner = self.inner.borrow();
        inner.check_codomain_value(v)?;
        let mut cache = HashMap::new();
        let root_level = inner.level_of_node(f.root());
        let top_skip = inner.top_skipped_domain_product(root_level);
        Ok(top_skip * inner.satisfy_count_rec(f.root(), v, &mut cache))
    }

    pub fn satisfy_all(&self, f: &Diagram, v: u32) -> Result<Vec<Vec<u32>>, ManagerError> {
        self.check_same_manager(f)?;
        let inner = self.inner.borrow();
        inner.check_codomain_value(v)?;
        let mut out = Vec::new();
        let mut assignment = vec![0u32; inner.var_count()];
        inner.satisfy_all_rec(f.root(), 0, v, &mut assignment, &mut out);
        out.sort();
        Ok(out)
    }

    pub fn node_count(&self, f: &Diagram) -> Result<usize, ManagerError> {
        self.check_same_manager(f)?;
        Ok(self.with_inner(|inner| inner.reachable_preorder(f.root()).len()))
    }

    pub fn dependency_set(&self, f: &Diagram) -> Result<Vec<VarIndex>, ManagerError> {
        self.check_same_manager(f)?;
        Ok(self.with_inner(|inner| inner.dependency_set_rec(f.root())))
    }

    pub(crate) fn reachable_preorder(&self, root: NodeId) -> Vec<NodeId> {
        self.with_inner(|inner| inner.reachable_preorder(root))
    }

    pub(crate) fn level_of_node(&self, id: NodeId) -> Level {
        self.inner.borrow().level_of_node(id)
    }

    pub(crate) fn node_sons(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.borrow().pool.get(id).data.sons().to_vec()
    }

    pub(crate) fn node_index(&self, id: NodeId) -> Option<VarIndex> {
        self.inner.borrow().pool.get(id).data.index()
    }

    pub(crate) fn node_value(&self, id: NodeId) -> Option<Value> {
        match &self.inner.borrow().pool.get(id).data {
            NodeData::Terminal(v) => Some(*v),
            NodeData::Internal { .. } => None,
        }
    }

    // -- maintenance -----------------------------------------------------

    /// Runs a garbage-collection pass immediately, returning the number of
    /// nodes reclaimed.
    pub fn force_gc(&self) -> usize {
        self.with_inner(|inner| inner.gc())
    }

    /// Runs one sifting pass over every variable.
    pub fn force_sift(&self) {
        self.with_inner(|inner| inner.sift())
    }

    pub fn config(&self) -> ManagerConfig {
        self.inner.borrow().config
    }

    pub fn set_config(&self, config: ManagerConfig) {
        self.inner.borrow_mut().config = config;
    }

    pub(crate) fn clone_handle(&self) -> Manager {
        self.clone()
    }

    pub(crate) fn set_probabilities(&self, probs: HashMap<u32, f64>) {
        self.inner.borrow_mut().probabilities = Some(probs);
    }

    pub(crate) fn has_probabilities(&self) -> bool {
        self.inner.borrow().probabilities.is_some()
    }

    pub(crate) fn probability_of_value(&self, v: u32) -> Option<f64> {
        self.inner
            .borrow()
            .probabilities
            .as_ref()
            .and_then(|m| m.get(&v).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_order_is_validated_as_a_permutation() {
        let err = Manager::new_bdd(3, Some(&[0, 0, 1])).unwrap_err();
        assert_eq!(err, ManagerError::InvalidOrder);
    }

    #[test]
    fn bdd_manager_rejects_out_of_domain_values() {
        let m = Manager::new_bdd(2, None).unwrap();
        let x = m.variable(0).unwrap();
        let err = m.evaluate(&x, &[2, 0]).unwrap_err();
        assert!(matches!(err, ManagerError::ValueOutOfDomain { .. }));
    }

    #[test]
    fn and_of_two_variables_agrees_with_min_truth_table() {
        let m = Manager::new_bdd(2, None).unwrap();
        let x0 = m.variable(0).unwrap();
        let x1 = m.variable(1).unwrap();
        let f = m.apply(Op::And, &x0, &x1).unwrap();
        assert_eq!(m.evaluate(&f, &[1, 1]).unwrap(), Value::Val(1));
        assert_eq!(m.evaluate(&f, &[1, 0]).unwrap(), Value::Val(0));
        assert_eq!(m.satisfy_count(&f, 1).unwrap(), 1);
    }

    #[test]
    fn cross_manager_handles_are_rejected() {
        let a = Manager::new_bdd(1, None).unwrap();
        let b = Manager::new_bdd(1, None).unwrap();
        let fa = a.variable(0).unwrap();
        let fb = b.variable(0).unwrap();
        assert_eq!(
            a.apply(Op::And, &fa, &fb).unwrap_err(),
            ManagerError::ForeignHandle
        );
    }

    #[test]
    fn sifting_preserves_the_function_computed_by_every_live_diagram() {
        let m = Manager::new_bdd(4, None).unwrap();
        let vars: Vec<Diagram> = (0..4).map(|i| m.variable(i).unwrap()).collect();
        let f = m.tree_fold(Op::And, &vars).unwrap();
        let before: Vec<Vec<u32>> = m.satisfy_all(&f, 1).unwrap();
        m.force_sift();
        let after: Vec<Vec<u32>> = m.satisfy_all(&f, 1).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn restrict_fixes_one_variable() {
        let m = Manager::new_bdd(2, None).unwrap();
        let x0 = m.variable(0).unwrap();
        let x1 = m.variable(1).unwrap();
        let f = m.apply(Op::Or, &x0, &x1).unwrap();
        let r = m.restrict(&f, 0, 0).unwrap();
        assert_eq!(m.evaluate(&r, &[0, 1]).unwrap(), Value::Val(1));
        assert_eq!(m.evaluate(&r, &[0, 0]).unwrap(), Value::Val(0));
    }

    #[test]
    fn satisfy_count_accounts_for_variables_skipped_above_the_root() {
        // x3's reduced diagram is a single internal node at level 3; x0, x1,
        // x2 never appear on any path and must still each double the count.
        let m = Manager::new_bdd(4, None).unwrap();
        let x3 = m.variable(3).unwrap();
        assert_eq!(m.satisfy_count(&x3, 1).unwrap(), 8);
        assert_eq!(m.satisfy_count(&x3, 0).unwrap(), 8);
    }

    #[test]
    fn swapping_a_variable_past_one_it_never_tests_leaves_it_unchanged() {
        // x0's node has terminal sons — it never tests x1 at all, so
        // swapping levels 0 and 1 must leave x0's node exactly as it was
        // rather than rebuilding it into a redundant x1-level node whose
        // branches would all collapse to the same son.
        let m = Manager::new_bdd(2, None).unwrap();
        let x0 = m.variable(0).unwrap();
        let before_id = x0.root();
        let before_eval = [
            m.evaluate(&x0, &[0, 0]).unwrap(),
            m.evaluate(&x0, &[1, 0]).unwrap(),
            m.evaluate(&x0, &[0, 1]).unwrap(),
            m.evaluate(&x0, &[1, 1]).unwrap(),
        ];
        m.with_inner(|inner| inner.swap_adjacent(0));
        assert_eq!(x0.root(), before_id);
        let after_eval = [
            m.evaluate(&x0, &[0, 0]).unwrap(),
            m.evaluate(&x0, &[1, 0]).unwrap(),
            m.evaluate(&x0, &[0, 1]).unwrap(),
            m.evaluate(&x0, &[1, 1]).unwrap(),
        ];
        assert_eq!(before_eval, after_eval);
    }

    #[test]
    fn gc_shrinks_the_apply_cache_toward_cache_ratio_times_live_nodes() {
        let mut config = ManagerConfig::default();
        config.cache_ratio = 0.0;
        let m = Manager::new_bdd(3, None).unwrap();
        m.set_config(config);
        let x0 = m.variable(0).unwrap();
        let x1 = m.variable(1).unwrap();
        m.apply(Op::And, &x0, &x1).unwrap();
        assert!(m.with_inner(|inner| inner.apply_cache.len()) > 0);
        m.force_gc();
        assert_eq!(m.with_inner(|inner| inner.apply_cache.len()), 0);
    }
}
