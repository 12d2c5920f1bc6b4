use crate::Probability;
use petgraph::algo::connected_components;
use petgraph::graph::NodeIndex;
use petgraph::graph::UnGraph;
use rand::rngs::SmallRng;
use rand::Rng;

/// Synthetic observation graph over the N poses.
///
/// Always contains a spanning cycle so the synchronization problem is well
/// posed; the `completeness` knob controls how many of the remaining node
/// pairs are additionally observed.
#[derive(Debug, Clone)]
pub struct PoseGraph {
    graph: UnGraph<(), ()>,
    edges: Vec<(usize, usize)>,
}

impl PoseGraph {
    pub fn synthetic(nodes: usize, completeness: Probability, rng: &mut SmallRng) -> Self {
        let mut graph = UnGraph::<(), ()>::new_undirected();
        for _ in 0..nodes {
            graph.add_node(());
        }
        let mut edges = Vec::new();
        for i in 0..nodes {
            let j = (i + 1) % nodes;
            if i < j || nodes > 2 {
                edges.push((i, j));
            }
        }
        for i in 0..nodes {
            for j in (i + 1)..nodes {
                if j != i + 1 && !(i == 0 && j == nodes - 1) && rng.random::<f32>() < completeness
                {
                    edges.push((i, j));
                }
            }
        }
        for &(i, j) in edges.iter() {
            graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), ());
        }
        Self { graph, edges }
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn connected(&self) -> bool {
        connected_components(&self.graph) == 1
    }
}
