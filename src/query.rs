//! DOT emission (§4.4.8 "C8", §6 "to_dot").
//!
//! The rest of C8's query surface (`evaluate`, `satisfy_count`,
//! `satisfy_all`, `dependency_set`, `node_count`) lives directly on
//! [`Manager`] in `manager.rs` since each is a short, self-contained
//! traversal; `to_dot` gets its own file because the output format has
//! enough structure (shape/style per node kind, same-level rank grouping)
//! to be worth separating from the numeric queries.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::diagram::Diagram;
use crate::error::ManagerError;
use crate::manager::Manager;
use crate::node::{Level, Value};

impl Manager {
    /// Writes `f`'s reachable DAG as a Graphviz `digraph`: terminals as
    /// squares, internal nodes as circles labelled by variable index.
    /// Binary-domain nodes use a dashed edge for the `0` son and a solid
    /// edge for the `1` son (matching the conventional BDD drawing); higher
    /// arity nodes label each edge with its son index. Nodes at the same
    /// level are grouped with `rank=same` so the picture reads top-down by
    /// variable order.
    pub fn to_dot<W: Write>(&self, w: &mut W, f: &Diagram) -> io::Result<()> {
        if !std::rc::Rc::ptr_eq(&self.inner, &f.manager().inner) {
            return Err(ManagerError::ForeignHandle.into());
        }
        let nodes = self.reachable_preorder(f.root());
        write_dot(self, w, &nodes)
    }
}

fn write_dot<W: Write>(m: &Manager, w: &mut W, nodes: &[usize]) -> io::Result<()> {
    writeln!(w, "digraph dd {{")?;
    let mut by_level: BTreeMap<Level, Vec<usize>> = BTreeMap::new();
    for &id in nodes {
        by_level.entry(m.level_of_node(id)).or_default().push(id);
    }
    for &id in nodes {
        match m.node_index(id) {
            None => {
                let label = match m.node_value(id) {
                    Some(Value::Val(v)) => v.to_string(),
                    Some(Value::Undefined) | None => "U".to_string(),
                };
                writeln!(w, "  n{} [shape=square,label=\"{}\"];", id, label)?;
            }
            Some(index) => {
                writeln!(w, "  n{} [shape=circle,label=\"x{}\"];", id, index)?;
                let sons = m.node_sons(id);
                let arity = sons.len();
                for (k, &s) in sons.iter().enumerate() {
                    if arity == 2 {
                        let style = if k == 0 { "dashed" } else { "solid" };
                        writeln!(w, "  n{} -> n{} [style={}];", id, s, style)?;
                    } else {
                        writeln!(w, "  n{} -> n{} [label=\"{}\"];", id, s, k)?;
                    }
                }
            }
        }
    }
    for ids in by_level.values() {
        if ids.len() > 1 {
            write!(w, "  {{ rank=same; ")?;
            for id in ids {
                write!(w, "n{}; ", id)?;
            }
            writeln!(w, "}}")?;
        }
    }
    writeln!(w, "}}")?;
    Ok(())
}
