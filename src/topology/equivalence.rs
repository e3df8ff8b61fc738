//! Point identification across processor meshes.
//!
//! [`PointEquivalence`] is a union-find structure over dense node indices.
//! Nodes are `(mesh, local point)` pairs flattened with per-mesh offsets (see
//! [`NodeNumbering`]); merging the nodes that name the same physical point
//! yields one class per global point.

/// Union-find structure tracking equivalence classes of dense node indices.
#[derive(Debug, Default, Clone)]
pub struct PointEquivalence {
    parent: Vec<usize>,
    rank: Vec<u32>,
}

impl PointEquivalence {
    /// Create `n` singleton classes.
    pub fn with_nodes(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    fn find_root(&mut self, node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression.
        let mut cur = node;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Return the canonical representative for a node (with path compression).
    pub fn representative(&mut self, node: usize) -> usize {
        self.find_root(node)
    }

    /// Union two nodes and return the representative.
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let ra = self.find_root(a);
        let rb = self.find_root(b);
        if ra == rb {
            return ra;
        }
        let (rank_a, rank_b) = (self.rank[ra], self.rank[rb]);
        if rank_a < rank_b {
            self.parent[ra] = rb;
            rb
        } else {
            self.parent[rb] = ra;
            if rank_a == rank_b {
                self.rank[ra] = rank_a + 1;
            }
            ra
        }
    }

    /// Check whether two nodes are in the same equivalence class.
    pub fn are_equivalent(&mut self, a: usize, b: usize) -> bool {
        self.find_root(a) == self.find_root(b)
    }
}

/// Flattens `(mesh, local point)` pairs into dense node indices.
#[derive(Debug, Clone)]
pub struct NodeNumbering {
    offsets: Vec<usize>,
}

impl NodeNumbering {
    /// Offsets for meshes with the given point counts.
    pub fn new(counts: impl IntoIterator<Item = usize>) -> Self {
        let mut offsets = vec![0];
        for c in counts {
            let last = *offsets.last().unwrap_or(&0);
            offsets.push(last + c);
        }
        Self { offsets }
    }

    pub fn node(&self, mesh: usize, point: usize) -> usize {
        self.offsets[mesh] + point
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inverse of [`NodeNumbering::node`].
    pub fn split(&self, node: usize) -> (usize, usize) {
        let mesh = self.offsets.partition_point(|&o| o <= node) - 1;
        (mesh, node - self.offsets[mesh])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalence_groups_nodes() {
        let mut eq = PointEquivalence::with_nodes(4);
        eq.union(0, 1);
        assert!(eq.are_equivalent(0, 1));
        assert!(!eq.are_equivalent(0, 2));
        eq.union(1, 2);
        assert!(eq.are_equivalent(0, 2));
        assert!(!eq.are_equivalent(3, 2));
    }

    #[test]
    fn node_numbering_round_trips() {
        let nodes = NodeNumbering::new([3, 0, 2]);
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes.node(2, 1), 4);
        assert_eq!(nodes.split(4), (2, 1));
        assert_eq!(nodes.split(0), (0, 0));
        assert_eq!(nodes.split(3), (2, 0));
    }
}
