//! Node pool (§4.1 "C2"): a slab allocator with overflow slabs and a free list.
//!
//! Grounded on the `teddy` C++ library's `node_pool.hpp`, which preallocates
//! a main pool and appends overflow pools on exhaustion, recycling destroyed
//! slots through a free list threaded through the node itself. Here the pool
//! is a single growable `Vec<Slot>` — a main/overflow split makes sense when
//! slabs are raw memory blocks behind a fixed-size allocator; in safe Rust a
//! `Vec` already amortises growth, so `main_pool_size`/`overflow_pool_size`
//! survive only as the capacities `grow` reserves, not as separate arenas.

use crate::node::{Node, NodeData, NodeId};

#[derive(Debug)]
enum Slot {
    Occupied(Node),
    /// Free list link, threaded through reclaimed slots (`next_in_chain`
    /// in the spec's node layout, §3 "Node").
    Free(Option<NodeId>),
}

/// Slab allocator for decision-diagram nodes.
#[derive(Debug)]
pub(crate) struct NodePool {
    slots: Vec<Slot>,
    free_head: Option<NodeId>,
    free_count: usize,
    live_count: usize,
    main_pool_size: usize,
    overflow_pool_size: usize,
}

impl NodePool {
    pub(crate) fn new(main_pool_size: usize, overflow_pool_size: usize) -> Self {
        NodePool {
            slots: Vec::with_capacity(main_pool_size),
            free_head: None,
            free_count: 0,
            live_count: 0,
            main_pool_size: main_pool_size.max(1),
            overflow_pool_size: overflow_pool_size.max(1),
        }
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live_count
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Number of slots immediately available without a further `grow`.
    pub(crate) fn available(&self) -> usize {
        let uninitialised = self.slots.capacity() - self.slots.len();
        self.free_count + uninitialised
    }

    /// Appends an overflow slab's worth of capacity.
    pub(crate) fn grow(&mut self) {
        let additional = if self.slots.is_empty() {
            self.main_pool_size
        } else {
            self.overflow_pool_size
        };
        self.slots.reserve(additional);
    }

    /// Allocates a fresh node, popping the free list first.
    ///
    /// Precondition: `available() > 0`. Violating it is a contract bug, not
    /// a recoverable condition — callers (the manager) run GC and/or `grow`
    /// before calling this (§4.4.3).
    pub(crate) fn create(&mut self, data: NodeData) -> NodeId {
        self.live_count += 1;
        if let Some(id) = self.free_head {
            let next = match &self.slots[id] {
                Slot::Free(next) => *next,
                Slot::Occupied(_) => unreachable!(),
            };
            self.free_head = next;
            self.free_count -= 1;
            self.slots[id] = Slot::Occupied(Node::new(data));
            return id;
        }
        debug_assert!(
            self.slots.len() < self.slots.capacity(),
            "NodePool::create called on an exhausted pool"
        );
        let id = self.slots.len();
        self.slots.push(Slot::Occupied(Node::new(data)));
        id
    }

    /// Returns a slot to the free list.
    pub(crate) fn destroy(&mut self, id: NodeId) {
        self.slots[id] = Slot::Free(self.free_head);
        self.free_head = Some(id);
        self.free_count += 1;
        self.live_count -= 1;
    }

    pub(crate) fn get(&self, id: NodeId) -> &Node {
        match &self.slots[id] {
            Slot::Occupied(n) => n,
            Slot::Free(_) => panic!("NodePool::get on a freed slot {id}"),
        }
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        match &mut self.slots[id] {
            Slot::Occupied(n) => n,
            Slot::Free(_) => panic!("NodePool::get_mut on a freed slot {id}"),
        }
    }

    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        id < self.slots.len() && matches!(self.slots[id], Slot::Occupied(_))
    }

    /// Iterates the ids of every occupied slot, for GC sweeps and traversals
    /// that need to walk the whole live set (e.g. clearing marks).
    pub(crate) fn live_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(id, slot)| {
            if matches!(slot, Slot::Occupied(_)) {
                Some(id)
            } else {
                None
            }
        })
    }
}
