//! Segment trie over inventory and must-keep paths

use crate::allow::{Protection, ProtectionRules};
use crate::path::ImagePath;
use ahash::AHashMap;

/// Index of a node in the trie arena
type NodeId = usize;

const ROOT: NodeId = 0;

/// Node in the path trie
#[derive(Debug, Default)]
struct Node {
    parent: Option<NodeId>,
    children: AHashMap<Box<str>, NodeId>,
    /// Path exists on disk
    in_inventory: bool,
    /// Path is in the must-keep set
    keep: bool,
    /// This node or a descendant is kept
    subtree_keep: bool,
    /// This node or a descendant is an inventory path outside must-keep
    subtree_candidate: bool,
    /// Inventory paths at or below this node
    inventory_count: usize,
}

/// Topmost deletable nodes found by [`PathTrie::deletable_roots`]
#[derive(Debug, Default)]
pub struct Deletable {
    /// Plan entries in segment order
    pub roots: Vec<ImagePath>,
    /// Inventory paths removed along with them
    pub covered: usize,
}

/// Prefix tree keyed by path segments
///
/// Nodes are stored in an arena; a child is always allocated after its
/// parent, so a reverse scan of the arena visits children before parents.
#[derive(Debug)]
pub struct PathTrie {
    nodes: Vec<Node>,
    summarized: bool,
}

impl PathTrie {
    /// Create a trie holding only the root
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            summarized: false,
        }
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn insert(&mut self, path: &ImagePath) -> NodeId {
        self.summarized = false;
        let mut current = ROOT;
        for segment in path.segments() {
            current = match self.nodes[current].children.get(segment) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node {
                        parent: Some(current),
                        ..Node::default()
                    });
                    self.nodes[current].children.insert(segment.into(), child);
                    child
                }
            };
        }
        current
    }

    /// Mark a path as present on disk
    pub fn add_inventory(&mut self, path: &ImagePath) {
        let id = self.insert(path);
        self.nodes[id].in_inventory = true;
    }

    /// Mark a path as must-keep
    pub fn add_keep(&mut self, path: &ImagePath) {
        let id = self.insert(path);
        self.nodes[id].keep = true;
    }

    /// Propagate subtree flags bottom-up
    fn summarize(&mut self) {
        for node in &mut self.nodes {
            node.subtree_keep = node.keep;
            node.subtree_candidate = node.in_inventory && !node.keep;
            node.inventory_count = usize::from(node.in_inventory);
        }
        for id in (1..self.nodes.len()).rev() {
            let (keep, candidate, count) = {
                let node = &self.nodes[id];
                (node.subtree_keep, node.subtree_candidate, node.inventory_count)
            };
            if let Some(parent) = self.nodes[id].parent {
                let parent = &mut self.nodes[parent];
                parent.subtree_keep |= keep;
                parent.subtree_candidate |= candidate;
                parent.inventory_count += count;
            }
        }
        self.summarized = true;
    }

    /// Find the topmost nodes that may be removed
    ///
    /// A node is deletable when something at or below it is an inventory
    /// path outside must-keep, nothing at or below it is kept, and the
    /// protection rules allow it.
    pub fn deletable_roots(&mut self, rules: &ProtectionRules) -> Deletable {
        if !self.summarized {
            self.summarize();
        }
        let mut found = Deletable::default();
        let mut cursor = ImagePath::root();
        self.walk(ROOT, &mut cursor, rules, &mut found);
        found.roots.sort();
        found
    }

    fn walk(
        &self,
        id: NodeId,
        cursor: &mut ImagePath,
        rules: &ProtectionRules,
        found: &mut Deletable,
    ) {
        let node = &self.nodes[id];
        if !node.subtree_candidate {
            return;
        }

        match rules.check(cursor) {
            Protection::Subtree => return,
            Protection::None if !node.subtree_keep => {
                found.roots.push(cursor.clone());
                found.covered += node.inventory_count;
                return;
            }
            Protection::None | Protection::Node => {}
        }

        for (segment, &child) in &node.children {
            cursor.push(segment);
            self.walk(child, cursor, rules, found);
            cursor.pop();
        }
    }
}

impl Default for PathTrie {
    fn default() -> Self {
        Self::new()
    }
}
