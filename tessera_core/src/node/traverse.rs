// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::{INVALID, NodeId};
use super::store::SceneStore;

/// An iterator over the direct children of a node, in insertion order.
///
/// Created by [`SceneStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a SceneStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a SceneStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(NodeId {
            idx,
            generation: self.store.generation[idx as usize],
        })
    }
}

impl SceneStore {
    /// Returns the children of `id` in paint order (back to front).
    ///
    /// Children are ordered by descending view order; ties keep insertion
    /// order.
    #[must_use]
    pub fn ordered_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut kids: Vec<NodeId> = self.children(id).collect();
        kids.sort_by(|a, b| {
            self.view_order[b.idx as usize].total_cmp(&self.view_order[a.idx as usize])
        });
        kids
    }

    /// Visits `root`, its clip and all descendants depth first, passing each
    /// node's depth (the root is at 0).
    pub fn walk(&self, root: NodeId, mut visit: impl FnMut(NodeId, usize)) {
        self.validate(root);
        let mut stack = Vec::new();
        stack.push((root.idx, 0_usize));
        while let Some((idx, depth)) = stack.pop() {
            visit(self.id_at(idx), depth);
            // Push in reverse so children pop in insertion order.
            let mut kids = Vec::new();
            let clip = self.clip_node[idx as usize];
            if clip != INVALID {
                kids.push(clip);
            }
            let mut c = self.first_child[idx as usize];
            while c != INVALID {
                kids.push(c);
                c = self.next_sibling[c as usize];
            }
            stack.extend(kids.into_iter().rev().map(|k| (k, depth + 1)));
        }
    }
}
