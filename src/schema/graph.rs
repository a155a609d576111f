//! Foreign-key graph and join path finding.
//!
//! Tables are nodes; every declared foreign key is a directed edge from the
//! referencing table to the referenced table. Reachability treats edges as
//! undirected, while each [`JoinEdge`] records which side was already joined.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use super::types::Table;
use crate::error::{ObjectKind, ReportError, ReportResult};

/// Edge data for a declared foreign key.
#[derive(Debug, Clone)]
struct ForeignKeyEdge {
    /// Referencing column (on the edge source).
    column: String,
    /// Referenced column (on the edge target).
    references_column: String,
    /// Position in catalog declaration order, used for tie-breaking.
    ordinal: usize,
}

/// One join step: `from_table.from_column = to_table.to_column`,
/// where `from_table` is already part of the joined row set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEdge {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// A path through the graph (sequence of joins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPath {
    pub edges: Vec<JoinEdge>,
}

impl JoinPath {
    pub fn new() -> Self {
        Self { edges: vec![] }
    }

    /// All tables in this path, including start and end.
    pub fn tables(&self) -> Vec<&str> {
        let mut result: Vec<&str> = Vec::new();
        for edge in &self.edges {
            if result.last().copied() != Some(edge.from_table.as_str()) {
                result.push(&edge.from_table);
            }
            result.push(&edge.to_table);
        }
        result
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Parent pointer for path reconstruction.
struct ParentInfo {
    parent: NodeIndex,
    edge_idx: EdgeIndex,
}

/// Graph of tables linked by declared foreign keys.
#[derive(Debug, Clone)]
pub struct JoinGraph {
    graph: DiGraph<String, ForeignKeyEdge>,
    node_indices: HashMap<String, NodeIndex>,
}

impl JoinGraph {
    /// Build the graph from tables in catalog order.
    ///
    /// Foreign keys pointing at unknown tables are skipped; the catalog
    /// validates them before building the graph.
    pub fn from_tables(tables: &[Table]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for table in tables {
            let idx = graph.add_node(table.name.clone());
            node_indices.insert(table.name.clone(), idx);
        }

        let mut ordinal = 0;
        for table in tables {
            for fk in &table.foreign_keys {
                // Self references never help connect a new table.
                if fk.references_table == table.name {
                    continue;
                }
                let (Some(&from), Some(&to)) = (
                    node_indices.get(&table.name),
                    node_indices.get(&fk.references_table),
                ) else {
                    continue;
                };
                graph.add_edge(
                    from,
                    to,
                    ForeignKeyEdge {
                        column: fk.column.clone(),
                        references_column: fk.references_column.clone(),
                        ordinal,
                    },
                );
                ordinal += 1;
            }
        }

        Self {
            graph,
            node_indices,
        }
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn foreign_key_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn index_of(&self, table: &str) -> ReportResult<NodeIndex> {
        self.node_indices
            .get(table)
            .copied()
            .ok_or_else(|| ReportError::not_found(ObjectKind::Table, table))
    }

    /// Neighbours of a node in either direction, ordered by declaration.
    fn neighbors(&self, node: NodeIndex) -> Vec<(NodeIndex, EdgeIndex)> {
        let mut result: Vec<(usize, NodeIndex, EdgeIndex)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.weight().ordinal, e.target(), e.id()))
            .chain(
                self.graph
                    .edges_directed(node, Direction::Incoming)
                    .map(|e| (e.weight().ordinal, e.source(), e.id())),
            )
            .collect();
        result.sort_by_key(|(ordinal, _, _)| *ordinal);
        result.into_iter().map(|(_, n, e)| (n, e)).collect()
    }

    /// Find the shortest join path between two tables using BFS.
    ///
    /// Edges are traversed in either direction. Ties between equally short
    /// paths are broken by foreign-key declaration order, so the result is
    /// deterministic for a given catalog.
    pub fn find_path(&self, from: &str, to: &str) -> ReportResult<JoinPath> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;

        if from_idx == to_idx {
            return Ok(JoinPath::new());
        }

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut parents: HashMap<NodeIndex, ParentInfo> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();

        queue.push_back(from_idx);
        visited.insert(from_idx);

        while let Some(current) = queue.pop_front() {
            for (neighbor, edge_idx) in self.neighbors(current) {
                if visited.contains(&neighbor) {
                    continue;
                }

                parents.insert(
                    neighbor,
                    ParentInfo {
                        parent: current,
                        edge_idx,
                    },
                );

                if neighbor == to_idx {
                    return Ok(self.reconstruct_path(from_idx, neighbor, &parents));
                }

                visited.insert(neighbor);
                queue.push_back(neighbor);
            }
        }

        Err(ReportError::Unjoinable {
            table: to.into(),
            primary: from.into(),
        })
    }

    /// Walk parent pointers back from the destination, then reverse.
    fn reconstruct_path(
        &self,
        from_idx: NodeIndex,
        to_idx: NodeIndex,
        parents: &HashMap<NodeIndex, ParentInfo>,
    ) -> JoinPath {
        let mut edges = Vec::new();
        let mut current = to_idx;

        while current != from_idx {
            let info = &parents[&current];
            let fk = &self.graph[info.edge_idx];
            let parent_name = &self.graph[info.parent];
            let current_name = &self.graph[current];

            // The FK edge may have been walked against its direction.
            let forward = self
                .graph
                .edge_endpoints(info.edge_idx)
                .map(|(source, _)| source == info.parent)
                .unwrap_or(true);
            let (from_column, to_column) = if forward {
                (fk.column.clone(), fk.references_column.clone())
            } else {
                (fk.references_column.clone(), fk.column.clone())
            };

            edges.push(JoinEdge {
                from_table: parent_name.clone(),
                from_column,
                to_table: current_name.clone(),
                to_column,
            });

            current = info.parent;
        }

        edges.reverse();
        JoinPath { edges }
    }

    /// Check if a path exists between two tables.
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        self.find_path(from, to).is_ok()
    }

    /// Find paths from a root table to multiple targets.
    ///
    /// Returns the union of the individual shortest paths as a join tree:
    /// every table is joined exactly once, in the order first reached.
    pub fn find_join_tree(&self, root: &str, targets: &[&str]) -> ReportResult<JoinPath> {
        let mut all_edges: Vec<JoinEdge> = vec![];
        let mut joined: HashSet<String> = HashSet::new();
        joined.insert(root.to_string());

        for target in targets {
            if *target == root {
                continue;
            }

            let path = self.find_path(root, target)?;

            for edge in path.edges {
                if joined.insert(edge.to_table.clone()) {
                    all_edges.push(edge);
                }
            }
        }

        Ok(JoinPath { edges: all_edges })
    }

    /// All tables reachable from a starting table, excluding itself.
    pub fn reachable_tables(&self, from: &str) -> ReportResult<Vec<&str>> {
        let from_idx = self.index_of(from)?;

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        let mut result = Vec::new();

        visited.insert(from_idx);
        queue.push_back(from_idx);

        while let Some(current) = queue.pop_front() {
            for (neighbor, _) in self.neighbors(current) {
                if visited.insert(neighbor) {
                    result.push(self.graph[neighbor].as_str());
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(result)
    }
}
