//! Update Scheduler
//!
//! Read-only helpers for whoever consumes a finished graph. The builder
//! itself never orders operations; it only records relations.
//!
//! # Algorithm
//!
//! We use Kahn's topological sort over operation relations:
//!
//! 1. Count in-degrees (only counting relations inside the node set)
//! 2. Queue every operation with in-degree zero
//! 3. Pop, emit, and decrement the in-degree of each successor
//!
//! Any operation left unprocessed sits on, or behind, a genuine cycle.
//!
//! Time changes propagate as a breadth-first walk from the time source's
//! direct dependents, followed by a topological sort of everything reached.

use std::collections::{HashMap, HashSet, VecDeque};

use super::depsgraph::Depsgraph;
use super::node::OperationIndex;
use crate::error::GraphError;

/// Computes evaluation orders over a finished [`Depsgraph`].
pub struct UpdateScheduler<'g> {
    graph: &'g Depsgraph,
}

impl<'g> UpdateScheduler<'g> {
    /// Create a scheduler over a graph.
    pub fn new(graph: &'g Depsgraph) -> Self {
        Self { graph }
    }

    /// Order every operation so that dependencies come first.
    ///
    /// Fails with [`GraphError::Cycle`] if the relations are not acyclic.
    pub fn evaluation_order(&self) -> Result<Vec<OperationIndex>, GraphError> {
        let all: Vec<_> = self.graph.operation_indices().collect();
        let total = all.len();
        let order = self.topological_sort(all);
        if order.len() == total {
            Ok(order)
        } else {
            Err(GraphError::Cycle {
                remaining: total - order.len(),
            })
        }
    }

    /// Operations that must run after a time change, in dependency order.
    pub fn mark_time_changed(&self) -> Vec<OperationIndex> {
        let mut queue = VecDeque::new();
        for (_, source) in self.graph.time_sources() {
            for relation in source.outlinks() {
                queue.push_back(relation.to);
            }
        }
        self.propagate(queue)
    }

    /// Operations that must re-run after `op` changed, in dependency order.
    ///
    /// `op` itself is not included.
    pub fn mark_changed(&self, op: OperationIndex) -> Vec<OperationIndex> {
        let queue = self.graph.outgoing(op).map(|relation| relation.to).collect();
        self.propagate(queue)
    }

    fn propagate(&self, mut queue: VecDeque<OperationIndex>) -> Vec<OperationIndex> {
        let mut to_process = Vec::new();
        let mut visited = HashSet::new();

        while let Some(op) = queue.pop_front() {
            if !visited.insert(op) {
                continue;
            }
            to_process.push(op);
            for relation in self.graph.outgoing(op) {
                queue.push_back(relation.to);
            }
        }

        self.topological_sort(to_process)
    }

    /// Perform a topological sort of the given operations.
    ///
    /// Returns operations in order such that dependencies come before
    /// dependents. Operations on a cycle are left out.
    fn topological_sort(&self, ops: Vec<OperationIndex>) -> Vec<OperationIndex> {
        let op_set: HashSet<_> = ops.iter().copied().collect();
        let mut in_degree: HashMap<OperationIndex, usize> = HashMap::new();
        let mut result = Vec::with_capacity(ops.len());
        let mut queue = VecDeque::new();

        for &op in &ops {
            let degree = self
                .graph
                .incoming(op)
                .filter(|relation| op_set.contains(&relation.from))
                .count();
            in_degree.insert(op, degree);
            if degree == 0 {
                queue.push_back(op);
            }
        }

        while let Some(op) = queue.pop_front() {
            result.push(op);
            for relation in self.graph.outgoing(op) {
                if let Some(degree) = in_degree.get_mut(&relation.to) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(relation.to);
                    }
                }
            }
        }

        result
    }
}
