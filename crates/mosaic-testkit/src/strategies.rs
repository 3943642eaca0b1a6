//! Property test strategies for trait graphs
//!
//! A generated [`TraitDag`] describes which earlier traits each trait builds
//! on. Tests turn it into composite types and check construction and
//! flattening properties against it.

use proptest::prelude::*;
use proptest::sample::subsequence;

// Re-export proptest for convenience
pub use proptest;

/// Largest number of parents a generated trait gets
pub const MAX_PARENTS: usize = 3;

/// Trait graph where node `i` builds on `parents[i]`, all lower indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitDag {
    /// Parent indices of each node, in composition order
    pub parents: Vec<Vec<usize>>,
}

impl TraitDag {
    /// Number of traits
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Whether the graph has no traits
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Every node reachable from `node`, including itself
    pub fn ancestry(&self, node: usize) -> Vec<usize> {
        let mut seen = vec![false; self.len()];
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if !seen[current] {
                seen[current] = true;
                stack.extend(self.parents[current].iter().copied());
            }
        }
        (0..self.len()).filter(|i| seen[*i]).collect()
    }
}

/// Strategy for trait graphs of up to `max_nodes` traits
///
/// # Example
///
/// ```rust
/// use mosaic_testkit::strategies::arb_trait_dag;
/// use proptest::prelude::*;
///
/// proptest! {
///     #[test]
///     fn test_dag_property(dag in arb_trait_dag(6)) {
///         assert!(dag.len() >= 1);
///     }
/// }
/// ```
pub fn arb_trait_dag(max_nodes: usize) -> impl Strategy<Value = TraitDag> {
    (1..=max_nodes.max(1)).prop_flat_map(|nodes| {
        let per_node: Vec<_> = (0..nodes)
            .map(|i| subsequence((0..i).collect::<Vec<_>>(), 0..=i.min(MAX_PARENTS)).prop_shuffle())
            .collect();
        per_node.prop_map(|parents| TraitDag { parents })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_parents_point_backwards(dag in arb_trait_dag(8)) {
            for (node, parents) in dag.parents.iter().enumerate() {
                prop_assert!(parents.len() <= MAX_PARENTS);
                prop_assert!(parents.iter().all(|p| *p < node));
            }
        }
    }

    #[test]
    fn test_ancestry_includes_diamond_once() {
        let dag = TraitDag {
            parents: vec![vec![], vec![0], vec![0], vec![1, 2]],
        };
        assert_eq!(dag.ancestry(3), vec![0, 1, 2, 3]);
        assert_eq!(dag.ancestry(1), vec![0, 1]);
    }
}
