//! Area Graph
//!
//! Areas connected by labelled routes, with a single current area:
//! - `move_to` starts the destination before ending the previous area
//! - `move_along` follows the first matching route out of the current area
//! - bidirectional routes can be followed from either end
//!
//! Parallel routes with the same label are allowed; the first one connected
//! wins when travelling.
//!
//! A graph can be recorded as an `AreaGraphRecord` (areas by name, routes with
//! serde-encoded labels) and rebuilt later against the bank its areas live in.

use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::area::Area;
use super::bank::AreaBank;
use crate::error::ConfigError;

/// Index of a node in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    id: NodeId,
    area: Rc<Area>,
}

impl GraphNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn area(&self) -> &Rc<Area> {
        &self.area
    }
}

/// A labelled route between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge<T> {
    pub start: NodeId,
    pub end: NodeId,
    pub label: T,
    /// Travellable from `end` back to `start` as well
    pub both_ways: bool,
}

impl<T> GraphEdge<T> {
    /// Whether this edge can be left from `node`.
    pub fn leaves(&self, node: NodeId) -> bool {
        self.start == node || (self.both_ways && self.end == node)
    }

    /// The endpoint reached when leaving from `node`.
    pub fn other_end(&self, node: NodeId) -> NodeId {
        if self.start == node {
            self.end
        } else {
            self.start
        }
    }
}

/// Navigable graph of areas with labelled routes of type `T`.
#[derive(Debug)]
pub struct AreaGraph<T> {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge<T>>,
    current: Option<NodeId>,
}

impl<T> Default for AreaGraph<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            current: None,
        }
    }
}

impl<T: PartialEq> AreaGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph holding every area of `bank_name`, in declaration order.
    pub fn from_bank(bank: &AreaBank, bank_name: &str) -> Option<Self> {
        let mut graph = Self::new();
        for area in bank.areas(bank_name)? {
            graph.add_area(area);
        }
        Some(graph)
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Add `area` as a node. An area already in the graph keeps its node.
    pub fn add_area(&mut self, area: Rc<Area>) -> NodeId {
        if let Some(node) = self.nodes.iter().find(|n| Rc::ptr_eq(&n.area, &area)) {
            return node.id;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode { id, area });
        id
    }

    /// The first node whose area is named `name`.
    pub fn find_node_by_area_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.area.name() == name).map(|n| n.id)
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Connect two nodes with a route labelled `label`.
    ///
    /// With `overwrite`, an existing route from `start` to `end` with an equal
    /// label is replaced instead of adding a parallel one. Returns false if
    /// either node doesn't exist.
    pub fn connect_nodes(&mut self, start: NodeId, end: NodeId, label: T, both_ways: bool, overwrite: bool) -> bool {
        if self.node(start).is_none() || self.node(end).is_none() {
            return false;
        }

        let edge = GraphEdge {
            start,
            end,
            label,
            both_ways,
        };

        if overwrite {
            if let Some(existing) = self
                .edges
                .iter_mut()
                .find(|e| e.start == start && e.end == end && e.label == edge.label)
            {
                *existing = edge;
                return true;
            }
        }

        self.edges.push(edge);
        true
    }

    /// `connect_nodes` by area name.
    pub fn connect_areas(&mut self, start: &str, end: &str, label: T, both_ways: bool, overwrite: bool) -> bool {
        match (self.find_node_by_area_name(start), self.find_node_by_area_name(end)) {
            (Some(start), Some(end)) => self.connect_nodes(start, end, label, both_ways, overwrite),
            _ => false,
        }
    }

    pub fn edges(&self) -> &[GraphEdge<T>] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Routes that can be taken from `node`, in connection order.
    pub fn leaving_edges(&self, node: NodeId) -> impl Iterator<Item = &GraphEdge<T>> {
        self.edges.iter().filter(move |e| e.leaves(node))
    }

    pub fn leaving_edges_with_label<'a>(&'a self, node: NodeId, label: &'a T) -> impl Iterator<Item = &'a GraphEdge<T>> {
        self.leaving_edges(node).filter(move |e| e.label == *label)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn current_node(&self) -> Option<NodeId> {
        self.current
    }

    pub fn current_area(&self) -> Option<&Rc<Area>> {
        self.current.and_then(|id| self.node(id)).map(|n| &n.area)
    }

    /// Labels of every route out of the current area.
    pub fn routes_from_current(&self) -> Vec<&T> {
        match self.current {
            Some(current) => self.leaving_edges(current).map(|e| &e.label).collect(),
            None => Vec::new(),
        }
    }

    /// Make the area named `name` current. False if there is no such area.
    pub fn move_to(&mut self, name: &str) -> bool {
        match self.find_node_by_area_name(name) {
            Some(id) => self.move_to_node(id),
            None => false,
        }
    }

    /// Make `id` current: start its area, then end the previous current area.
    ///
    /// Moving to the current node changes nothing. False if the node doesn't exist.
    pub fn move_to_node(&mut self, id: NodeId) -> bool {
        let Some(destination) = self.node(id).map(|n| n.area.clone()) else {
            return false;
        };
        if self.current == Some(id) {
            return true;
        }

        let previous = self.current_area().cloned();
        self.current = Some(id);

        tracing::debug!(
            from = previous.as_ref().map(|a| a.name()).unwrap_or("-"),
            to = %destination.name(),
            "moving to area"
        );

        destination.start();
        if let Some(previous) = previous {
            previous.end();
        }
        true
    }

    /// Follow the first route labelled `label` out of the current area.
    ///
    /// False if there is no current area or no such route.
    pub fn move_along(&mut self, label: &T) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        let destination = self
            .leaving_edges_with_label(current, label)
            .next()
            .map(|e| e.other_end(current));

        match destination {
            Some(destination) => self.move_to_node(destination),
            None => false,
        }
    }
}

// ============================================================================
// Recording
// ============================================================================

/// A route of a recorded graph, with both ends named by area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord<T> {
    pub start: String,
    pub end: String,
    pub label: T,
    #[serde(default)]
    pub both_ways: bool,
}

/// Storable form of an `AreaGraph`: node area names and routes, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaGraphRecord<T> {
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default = "Vec::new")]
    pub edges: Vec<EdgeRecord<T>>,
}

impl<T: Serialize> AreaGraphRecord<T> {
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, config)?)
    }
}

impl<T: DeserializeOwned> AreaGraphRecord<T> {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }
}

impl<T: PartialEq + Clone> AreaGraph<T> {
    /// Record the graph's nodes and routes. The current area is not recorded.
    pub fn record(&self) -> AreaGraphRecord<T> {
        let name = |id: NodeId| {
            self.node(id)
                .map(|n| n.area.name().to_string())
                .unwrap_or_default()
        };

        AreaGraphRecord {
            nodes: self.nodes.iter().map(|n| n.area.name().to_string()).collect(),
            edges: self
                .edges
                .iter()
                .map(|e| EdgeRecord {
                    start: name(e.start),
                    end: name(e.end),
                    label: e.label.clone(),
                    both_ways: e.both_ways,
                })
                .collect(),
        }
    }

    /// Rebuild a recorded graph, resolving area names in bank `bank_name`.
    ///
    /// Fails if the bank is unknown or a node or route names an area the bank
    /// (or the recorded node list) doesn't have. The rebuilt graph has no
    /// current area.
    pub fn from_record(bank: &AreaBank, bank_name: &str, record: &AreaGraphRecord<T>) -> Result<Self, ConfigError> {
        if !bank.contains_bank(bank_name) {
            return Err(ConfigError::UnknownBank(bank_name.to_string()));
        }
        let unknown = |area: &str| ConfigError::UnknownArea {
            bank: bank_name.to_string(),
            area: area.to_string(),
        };

        let mut graph = Self::new();
        for name in &record.nodes {
            let area = bank.area(bank_name, name).ok_or_else(|| unknown(name.as_str()))?;
            graph.add_area(area);
        }

        for edge in &record.edges {
            let start = graph.find_node_by_area_name(&edge.start).ok_or_else(|| unknown(edge.start.as_str()))?;
            let end = graph.find_node_by_area_name(&edge.end).ok_or_else(|| unknown(edge.end.as_str()))?;
            graph.connect_nodes(start, end, edge.label.clone(), edge.both_ways, false);
        }
        Ok(graph)
    }
}
