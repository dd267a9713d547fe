//! Execution order of atomic components.
//!
//! The order is a topological sort (Kahn) of the audio dependency graph: a
//! component runs after every component whose outputs it reads. Among ready
//! components the one with the lexicographically smallest fully-qualified name
//! runs first, so the order depends only on the graph, never on insertion
//! order.
//!
//! Message Queue and Double Buffering connections never make a graph cyclic.
//! They are added afterwards as ordering hints (producer before consumer)
//! wherever that does not contradict the audio order or an earlier edge.
//! Shared Data connections are hard edges: a Shared Data consumer must see the
//! value its producer wrote in the same block, so a Shared Data connection
//! running against the audio order is a [`GraphError::CyclicGraph`].

use std::collections::BTreeSet;

use super::flatten::{FlatGraph, FlatNode};
use crate::error::GraphError;
use crate::protocol::ProtocolKind;

/// Frozen execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSchedule {
    order: Vec<usize>,
    names: Vec<String>,
}

/// Adjacency lists over atomic indices.
struct Dependencies {
    outgoing: Vec<BTreeSet<usize>>,
}

impl Dependencies {
    fn new(n: usize) -> Self {
        Self {
            outgoing: vec![BTreeSet::new(); n],
        }
    }

    fn add(&mut self, from: usize, to: usize) {
        self.outgoing[from].insert(to);
    }

    fn contains(&self, from: usize, to: usize) -> bool {
        self.outgoing[from].contains(&to)
    }

    /// Depth-first search for a path `from` → `to`.
    fn can_reach(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.outgoing.len()];
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if visited[current] {
                continue;
            }
            visited[current] = true;
            stack.extend(self.outgoing[current].iter().copied());
        }
        false
    }

    /// Kahn's algorithm with a name tie-break. On a cycle, returns the names of
    /// every component that could not be ordered, sorted.
    fn kahn_sort(&self, names: &[String]) -> Result<Vec<usize>, GraphError> {
        let n = self.outgoing.len();
        let mut in_degree = vec![0usize; n];
        for targets in &self.outgoing {
            for &to in targets {
                in_degree[to] += 1;
            }
        }

        let mut ready: BTreeSet<(&str, usize)> = (0..n)
            .filter(|&i| in_degree[i] == 0)
            .map(|i| (names[i].as_str(), i))
            .collect();
        let mut sorted = Vec::with_capacity(n);

        while let Some((_, idx)) = ready.pop_first() {
            sorted.push(idx);
            for &to in &self.outgoing[idx] {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    ready.insert((names[to].as_str(), to));
                }
            }
        }

        if sorted.len() != n {
            let mut components: Vec<String> = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| names[i].clone())
                .collect();
            components.sort();
            return Err(GraphError::CyclicGraph { components });
        }
        Ok(sorted)
    }
}

impl ExecutionSchedule {
    /// Orders the atomics of `flat`.
    ///
    /// # Errors
    ///
    /// [`GraphError::CyclicGraph`] if the audio connections form a cycle, or a
    /// Shared Data connection runs against the audio order.
    pub fn compute(flat: &FlatGraph) -> Result<Self, GraphError> {
        let names: Vec<String> = flat.atomics().iter().map(|a| a.path.clone()).collect();
        let mut deps = Dependencies::new(names.len());

        for connection in flat.audio_connections() {
            if let (FlatNode::Atomic(from), FlatNode::Atomic(to)) =
                (connection.sender.node, connection.receiver.node)
            {
                deps.add(from, to);
            }
        }
        // Cycle detection sees audio edges only.
        deps.kahn_sort(&names)?;

        // Shared Data edges are hard; they go in before the soft hints.
        let (shared, hints): (Vec<_>, Vec<_>) = flat
            .parameter_connections()
            .iter()
            .partition(|connection| connection.protocol == ProtocolKind::SharedData);

        for connection in shared.into_iter().chain(hints) {
            let (FlatNode::Atomic(from), FlatNode::Atomic(to)) =
                (connection.sender.node, connection.receiver.node)
            else {
                continue;
            };
            if from == to || deps.contains(from, to) {
                continue;
            }
            if deps.can_reach(to, from) {
                if connection.protocol == ProtocolKind::SharedData {
                    let mut components = vec![names[from].clone(), names[to].clone()];
                    components.sort();
                    return Err(GraphError::CyclicGraph { components });
                }
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    producer = %names[from],
                    consumer = %names[to],
                    "parameter ordering hint contradicts audio order; dropped"
                );
                continue;
            }
            deps.add(from, to);
        }

        let order = deps.kahn_sort(&names)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            order = ?order.iter().map(|&i| names[i].as_str()).collect::<Vec<_>>(),
            "execution schedule"
        );

        Ok(Self { order, names })
    }

    /// Atomic indices in execution order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Fully-qualified names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|&i| self.names[i].as_str())
    }

    /// Position of atomic `index` in the order.
    pub fn position(&self, index: usize) -> Option<usize> {
        self.order.iter().position(|&i| i == index)
    }

    /// Number of scheduled components.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
