use std::collections::HashMap;

/// Identifier of a node in the host's scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Read access to the parent links of the scene graph.
pub trait Hierarchy {
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;

    /// True when `ancestor` is a strict ancestor of `node`. The walk is bounded
    /// so a malformed (cyclic) graph cannot hang the frame.
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        const MAX_DEPTH: usize = 1024;

        let mut current = node;
        for _ in 0..MAX_DEPTH {
            match self.parent_of(current) {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => current = parent,
                None => return false,
            }
        }
        log::warn!("Hierarchy walk from {:?} exceeded {} levels", node, MAX_DEPTH);
        false
    }
}

/// Hierarchy with no parent links.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatHierarchy;

impl Hierarchy for FlatHierarchy {
    fn parent_of(&self, _node: NodeId) -> Option<NodeId> {
        None
    }
}

/// Parent map maintained by the host.
#[derive(Debug, Default, Clone)]
pub struct SceneTree {
    parents: HashMap<NodeId, NodeId>,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        self.parents.insert(child, parent);
    }
}

impl Hierarchy for SceneTree {
    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(&node).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_are_found_transitively() {
        let mut tree = SceneTree::new();
        tree.set_parent(NodeId(2), NodeId(1));
        tree.set_parent(NodeId(3), NodeId(2));

        assert!(tree.is_ancestor(NodeId(1), NodeId(3)));
        assert!(tree.is_ancestor(NodeId(2), NodeId(3)));
        assert!(!tree.is_ancestor(NodeId(3), NodeId(1)));
        assert!(!tree.is_ancestor(NodeId(3), NodeId(3)));
    }

    #[test]
    fn cycles_terminate() {
        let mut tree = SceneTree::new();
        tree.set_parent(NodeId(1), NodeId(2));
        tree.set_parent(NodeId(2), NodeId(1));
        assert!(!tree.is_ancestor(NodeId(9), NodeId(1)));
    }
}
