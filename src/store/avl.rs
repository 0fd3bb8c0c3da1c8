//! Per-variable AVL index over stored clauses.
//!
//! Each variable owns one AVL tree over the clauses whose smallest literal
//! is that variable, ordered by [`Clause::sort_key`]. Nodes are held in a
//! side array parallel to the clause store rather than interleaved with the
//! clause bytes in one buffer; that interleaving was a memory-layout
//! optimization in the original tool, not a behavioral requirement, and
//! keeping the index as ordinary safe-Rust arena indices avoids hand-rolled
//! pointer arithmetic for no behavioral cost.

use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct Node {
    parent: Option<u32>,
    left: Option<u32>,
    right: Option<u32>,
    height: i32,
}

impl Node {
    fn leaf(parent: Option<u32>) -> Node {
        Node { parent, left: None, right: None, height: 1 }
    }
}

/// An AVL tree per first-literal variable, indexed by clause slot.
#[derive(Debug, Default)]
pub struct AvlIndex {
    roots: HashMap<u32, u32>,
    nodes: HashMap<u32, Node>,
}

impl AvlIndex {
    pub fn new() -> AvlIndex {
        AvlIndex::default()
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        self.nodes.clear();
    }

    fn height(&self, idx: Option<u32>) -> i32 {
        idx.map(|i| self.nodes[&i].height).unwrap_or(0)
    }

    fn update_height(&mut self, idx: u32) {
        let n = self.nodes[&idx];
        let h = 1 + self.height(n.left).max(self.height(n.right));
        self.nodes.get_mut(&idx).unwrap().height = h;
    }

    fn balance_factor(&self, idx: u32) -> i32 {
        let n = self.nodes[&idx];
        self.height(n.left) - self.height(n.right)
    }

    /// Finds the clause slot matching `key` under variable `var`'s tree, if
    /// any, by calling `key_of(slot)` to retrieve each visited clause's key.
    pub fn find(&self, var: u32, key: &[u32], key_of: impl Fn(u32) -> Vec<u32>) -> Option<u32> {
        let mut cur = self.roots.get(&var).copied();
        while let Some(idx) = cur {
            match key.cmp(&key_of(idx)[..]) {
                Ordering::Equal => return Some(idx),
                Ordering::Less => cur = self.nodes[&idx].left,
                Ordering::Greater => cur = self.nodes[&idx].right,
            }
        }
        None
    }

    /// Inserts `slot` (already placed in the clause store) into `var`'s
    /// tree, ordered per `key_of`. Does nothing useful if an equal key
    /// already exists — callers must `find` first when dedup matters.
    pub fn insert(&mut self, var: u32, slot: u32, key_of: impl Fn(u32) -> Vec<u32>) {
        let Some(root) = self.roots.get(&var).copied() else {
            self.nodes.insert(slot, Node::leaf(None));
            self.roots.insert(var, slot);
            return;
        };
        let mut cur = root;
        loop {
            let key_cur = key_of(cur);
            let key_slot = key_of(slot);
            let go_left = key_slot < key_cur;
            let child = if go_left { self.nodes[&cur].left } else { self.nodes[&cur].right };
            match child {
                Some(next) => cur = next,
                None => {
                    self.nodes.insert(slot, Node::leaf(Some(cur)));
                    if go_left {
                        self.nodes.get_mut(&cur).unwrap().left = Some(slot);
                    } else {
                        self.nodes.get_mut(&cur).unwrap().right = Some(slot);
                    }
                    self.rebalance_from(cur, var);
                    return;
                }
            }
        }
    }

    fn rotate_left(&mut self, x: u32, var: u32) -> u32 {
        let y = self.nodes[&x].right.unwrap();
        let t2 = self.nodes[&y].left;
        self.nodes.get_mut(&x).unwrap().right = t2;
        if let Some(t2) = t2 {
            self.nodes.get_mut(&t2).unwrap().parent = Some(x);
        }
        let parent = self.nodes[&x].parent;
        self.nodes.get_mut(&y).unwrap().parent = parent;
        self.attach_to_parent(parent, x, y, var);
        self.nodes.get_mut(&y).unwrap().left = Some(x);
        self.nodes.get_mut(&x).unwrap().parent = Some(y);
        self.update_height(x);
        self.update_height(y);
        y
    }

    fn rotate_right(&mut self, x: u32, var: u32) -> u32 {
        let y = self.nodes[&x].left.unwrap();
        let t2 = self.nodes[&y].right;
        self.nodes.get_mut(&x).unwrap().left = t2;
        if let Some(t2) = t2 {
            self.nodes.get_mut(&t2).unwrap().parent = Some(x);
        }
        let parent = self.nodes[&x].parent;
        self.nodes.get_mut(&y).unwrap().parent = parent;
        self.attach_to_parent(parent, x, y, var);
        self.nodes.get_mut(&y).unwrap().right = Some(x);
        self.nodes.get_mut(&x).unwrap().parent = Some(y);
        self.update_height(x);
        self.update_height(y);
        y
    }

    fn attach_to_parent(&mut self, parent: Option<u32>, old_child: u32, new_child: u32, var: u32) {
        match parent {
            None => {
                self.roots.insert(var, new_child);
            }
            Some(p) => {
                let pn = self.nodes.get_mut(&p).unwrap();
                if pn.left == Some(old_child) {
                    pn.left = Some(new_child);
                } else {
                    pn.right = Some(new_child);
                }
            }
        }
    }

    fn rebalance_from(&mut self, start: u32, var: u32) {
        let mut cur = Some(start);
        while let Some(idx) = cur {
            self.update_height(idx);
            let balance = self.balance_factor(idx);
            let new_root = if balance > 1 {
                let left = self.nodes[&idx].left.unwrap();
                if self.balance_factor(left) < 0 {
                    self.rotate_left(left, var);
                }
                Some(self.rotate_right(idx, var))
            } else if balance < -1 {
                let right = self.nodes[&idx].right.unwrap();
                if self.balance_factor(right) > 0 {
                    self.rotate_right(right, var);
                }
                Some(self.rotate_left(idx, var))
            } else {
                Some(idx)
            };
            cur = new_root.and_then(|i| self.nodes[&i].parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_find() {
        let mut idx = AvlIndex::new();
        let keys: HashMap<u32, Vec<u32>> = [(0u32, vec![1, 2]), (1, vec![1, 3]), (2, vec![1, 1])]
            .into_iter()
            .collect();
        for (slot, _) in keys.iter() {
            idx.insert(0, *slot, |s| keys[&s].clone());
        }
        for (slot, key) in keys.iter() {
            assert_eq!(idx.find(0, key, |s| keys[&s].clone()), Some(*slot));
        }
    }

    #[test]
    fn stays_balanced_on_sorted_insert() {
        let mut idx = AvlIndex::new();
        let keys: HashMap<u32, Vec<u32>> = (0..100u32).map(|i| (i, vec![i])).collect();
        for i in 0..100u32 {
            idx.insert(0, i, |s| keys[&s].clone());
        }
        let root = idx.roots[&0];
        let h = idx.height(Some(root));
        assert!((h as f64) < 1.45 * ((101f64).log2()));
    }
}
