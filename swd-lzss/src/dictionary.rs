//! Binary tree match finder.
//!
//! Every window position in the dictionary span owns one node of an arena
//! indexed by slot. Nodes are split into 256 binary search trees by their
//! leading byte and ordered by the string that starts at their slot,
//! compared over at most `max_length` bytes.
//!
//! Inserting a position walks its tree toward the insertion point and
//! measures the common prefix against every node on the way. The longest
//! prefix wins; between equal lengths the nearer position wins, which keeps
//! offsets small. A node whose string matches the full `max_length` is
//! replaced in place by the new position and marked superseded: it stays a
//! dictionary entry until it leaves the span, but it is never searched
//! again since the new node is always the nearer candidate.

use crate::window::Window;
use std::cmp::Ordering;

/// Link value meaning "no node".
const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SlotState {
    #[default]
    Free,
    Tree,
    Superseded,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    parent: u32,
    lesser: u32,
    bigger: u32,
    bucket: u8,
    state: SlotState,
}

impl Node {
    const FREE: Self = Self {
        parent: NIL,
        lesser: NIL,
        bigger: NIL,
        bucket: 0,
        state: SlotState::Free,
    };
}

/// Arena-indexed binary search trees over window positions.
#[derive(Debug, Clone)]
pub struct Dictionary {
    nodes: Vec<Node>,
    roots: Vec<u32>,
    mask: usize,
    max_length: usize,
    entries: usize,
    best_length: usize,
    best_position: usize,
}

impl Dictionary {
    /// Create a dictionary for a window of `window_size` slots.
    pub fn new(window_size: usize, max_length: usize) -> Self {
        Self {
            nodes: vec![Node::FREE; window_size],
            roots: vec![NIL; 256],
            mask: window_size - 1,
            max_length,
            entries: 0,
            best_length: 0,
            best_position: 0,
        }
    }

    /// Number of entries, superseded ones included.
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Check if the dictionary holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Check if `position` is an entry.
    pub fn contains(&self, position: usize) -> bool {
        self.nodes[position & self.mask].state != SlotState::Free
    }

    /// Length of the best match found by the last [`Dictionary::insert`].
    pub fn best_length(&self) -> usize {
        self.best_length
    }

    /// Window slot of the best match found by the last [`Dictionary::insert`].
    pub fn best_position(&self) -> usize {
        self.best_position
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.nodes.fill(Node::FREE);
        self.roots.fill(NIL);
        self.entries = 0;
        self.best_length = 0;
        self.best_position = 0;
    }

    /// Add the string starting at `position` and record the best match
    /// against the strings already present.
    pub fn insert(&mut self, window: &Window, position: usize) {
        let slot = position & self.mask;
        if self.nodes[slot].state != SlotState::Free {
            self.remove(slot);
        }

        self.best_length = 0;
        self.best_position = slot;

        let key = window.slice(slot, self.max_length);
        let bucket = key[0];
        self.entries += 1;

        let mut current = self.roots[bucket as usize];
        if current == NIL {
            self.roots[bucket as usize] = slot as u32;
            self.nodes[slot] = Node {
                bucket,
                state: SlotState::Tree,
                ..Node::FREE
            };
            return;
        }

        loop {
            let cur = current as usize;
            let other = window.slice(cur, self.max_length);
            let (length, ordering) = compare(key, other);

            let distance = slot.wrapping_sub(cur) & self.mask;
            let best_distance = slot.wrapping_sub(self.best_position) & self.mask;
            if length > self.best_length
                || (length == self.best_length && length > 0 && distance < best_distance)
            {
                self.best_length = length;
                self.best_position = cur;
            }

            let next = match ordering {
                Ordering::Equal => {
                    self.supersede(cur, slot, bucket);
                    return;
                }
                Ordering::Less => self.nodes[cur].lesser,
                Ordering::Greater => self.nodes[cur].bigger,
            };

            if next == NIL {
                if ordering == Ordering::Less {
                    self.nodes[cur].lesser = slot as u32;
                } else {
                    self.nodes[cur].bigger = slot as u32;
                }
                self.nodes[slot] = Node {
                    parent: current,
                    bucket,
                    state: SlotState::Tree,
                    ..Node::FREE
                };
                return;
            }
            current = next;
        }
    }

    /// Remove the entry at `position`; a free slot is left alone.
    pub fn remove(&mut self, position: usize) {
        let slot = position & self.mask;
        match self.nodes[slot].state {
            SlotState::Free => return,
            SlotState::Superseded => {}
            SlotState::Tree => self.unlink(slot),
        }
        self.nodes[slot] = Node::FREE;
        self.entries -= 1;
    }

    /// Put `new` in the tree position of `old` and retire `old`.
    fn supersede(&mut self, old: usize, new: usize, bucket: u8) {
        let node = self.nodes[old];
        self.nodes[new] = Node {
            state: SlotState::Tree,
            ..node
        };
        if node.lesser != NIL {
            self.nodes[node.lesser as usize].parent = new as u32;
        }
        if node.bigger != NIL {
            self.nodes[node.bigger as usize].parent = new as u32;
        }
        self.relink_parent(node.parent, old as u32, new as u32, bucket);
        self.nodes[old] = Node {
            bucket,
            state: SlotState::Superseded,
            ..Node::FREE
        };
    }

    fn unlink(&mut self, slot: usize) {
        let node = self.nodes[slot];

        let replacement = if node.lesser == NIL {
            node.bigger
        } else if node.bigger == NIL {
            node.lesser
        } else {
            // Promote the in-order successor.
            let mut successor = node.bigger;
            while self.nodes[successor as usize].lesser != NIL {
                successor = self.nodes[successor as usize].lesser;
            }

            if successor != node.bigger {
                let succ = self.nodes[successor as usize];
                self.nodes[succ.parent as usize].lesser = succ.bigger;
                if succ.bigger != NIL {
                    self.nodes[succ.bigger as usize].parent = succ.parent;
                }
                self.nodes[successor as usize].bigger = node.bigger;
                self.nodes[node.bigger as usize].parent = successor;
            }

            self.nodes[successor as usize].lesser = node.lesser;
            self.nodes[node.lesser as usize].parent = successor;
            successor
        };

        if replacement != NIL {
            self.nodes[replacement as usize].parent = node.parent;
        }
        self.relink_parent(node.parent, slot as u32, replacement, node.bucket);
    }

    fn relink_parent(&mut self, parent: u32, old: u32, new: u32, bucket: u8) {
        if parent == NIL {
            self.roots[bucket as usize] = new;
        } else if self.nodes[parent as usize].lesser == old {
            self.nodes[parent as usize].lesser = new;
        } else {
            self.nodes[parent as usize].bigger = new;
        }
    }
}

/// Common prefix length of two keys and their order.
#[inline]
fn compare(key: &[u8], other: &[u8]) -> (usize, Ordering) {
    match key.iter().zip(other).position(|(a, b)| a != b) {
        Some(i) => (i, key[i].cmp(&other[i])),
        None => (key.len().min(other.len()), Ordering::Equal),
    }
}
