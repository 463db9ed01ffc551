//! Reference-counted diagram handle (§4.5 "C6").
//!
//! Grounded on `espresso-logic`'s `Bdd` (`src/bdd/mod.rs`): a thin handle
//! pairing a manager reference with a root node, `Clone`/`Drop` threading
//! the node's refcount, equality delegating to `Rc::ptr_eq` on the manager
//! plus root identity rather than structural comparison (two equal
//! functions in the same manager are always the *same* node by I1/I2, so
//! pointer-equal roots already mean semantically equal — no deep walk
//! needed).

use std::fmt;

use crate::manager::Manager;
use crate::node::NodeId;

/// A handle to one node of a [`Manager`]'s DAG — the "function" a
/// user-facing operation returns.
pub struct Diagram {
    manager: Manager,
    root: NodeId,
}

impl Diagram {
    pub(crate) fn new(manager: Manager, root: NodeId) -> Self {
        Diagram { manager, root }
    }

    pub(crate) fn manager(&self) -> &Manager {
        &self.manager
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    /// The manager that owns this diagram, for chaining further operations
    /// without holding on to the original handle.
    pub fn owner(&self) -> Manager {
        self.manager.clone_handle()
    }
}

impl Clone for Diagram {
    fn clone(&self) -> Self {
        self.manager.inner.borrow_mut().inc_ref(self.root);
        Diagram {
            manager: self.manager.clone(),
            root: self.root,
        }
    }
}

impl Drop for Diagram {
    fn drop(&mut self) {
        self.manager.inner.borrow_mut().dec_ref(self.root);
    }
}

impl PartialEq for Diagram {
    fn eq(&self, other: &Self) -> bool {
        std::rc::Rc::ptr_eq(&self.manager.inner, &other.manager.inner) && self.root == other.root
    }
}

impl Eq for Diagram {}

impl fmt::Debug for Diagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagram").field("root", &self.root).finish()
    }
}
