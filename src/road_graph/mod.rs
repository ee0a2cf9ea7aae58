use crate::generation::errors::{RoadError, RoadResult};
use crate::geometry::polyline::{Polyline, horizontal_distance, polyline_length};
use crate::settlements::RoadType;
use bevy::prelude::*;
use derive_more::Display;
use pathfinding::prelude::{astar, connected_components};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[display("n{_0}")]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[display("e{_0}")]
pub struct EdgeId(pub u32);

/// Junction or road end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadNode {
    pub id: NodeId,
    pub position: Vec3,
    pub edges: Vec<EdgeId>,
}

impl RoadNode {
    pub fn degree(&self) -> usize {
        self.edges.len()
    }
}

/// Road between two nodes, with the geometry it follows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub road_type: RoadType,
    pub width: f32,
    pub is_bridge: bool,
    pub waypoints: Polyline,
    /// Travel length in metres, never shorter than the straight line between its nodes
    pub length: f32,
    /// Road segment this edge was built from, if any
    pub segment_id: Option<usize>,
}

/// Attributes of a new edge
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    pub road_type: RoadType,
    pub width: f32,
    pub is_bridge: bool,
    pub waypoints: Polyline,
    pub segment_id: Option<usize>,
}

impl EdgeSpec {
    pub fn new(road_type: RoadType) -> Self {
        Self {
            road_type,
            width: road_type.width(),
            is_bridge: false,
            waypoints: Vec::new(),
            segment_id: None,
        }
    }

    pub fn with_waypoints(mut self, waypoints: Polyline) -> Self {
        self.waypoints = waypoints;
        self
    }

    pub fn bridge(mut self, is_bridge: bool) -> Self {
        self.is_bridge = is_bridge;
        self
    }

    pub fn segment(mut self, segment_id: usize) -> Self {
        self.segment_id = Some(segment_id);
        self
    }
}

/// Route through the graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPath {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub length: f32,
}

/// Summary of graph connectivity and extent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_length: f32,
    pub bridge_count: usize,
    pub bridge_length: f32,
    pub connected_components: usize,
    pub isolated_nodes: usize,
    pub avg_node_degree: f32,
    pub length_by_type: Vec<(RoadType, f32)>,
}

/// Arena-backed road network. Nodes closer than the snap tolerance are merged.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphRecord", into = "GraphRecord")]
pub struct RoadGraph {
    nodes: BTreeMap<NodeId, RoadNode>,
    edges: BTreeMap<EdgeId, RoadEdge>,
    spatial: HashMap<(i32, i32), Vec<NodeId>>,
    snap_tolerance: f32,
    next_node: u32,
    next_edge: u32,
}

/// Serialized form; the spatial index is rebuilt on load
#[derive(Serialize, Deserialize)]
struct GraphRecord {
    snap_tolerance: f32,
    nodes: Vec<RoadNode>,
    edges: Vec<RoadEdge>,
    next_node: u32,
    next_edge: u32,
}

impl From<GraphRecord> for RoadGraph {
    fn from(record: GraphRecord) -> Self {
        let mut graph = RoadGraph::new(record.snap_tolerance);
        graph.next_node = record.next_node;
        graph.next_edge = record.next_edge;
        for node in record.nodes {
            graph.index_node(node.id, node.position);
            graph.nodes.insert(node.id, node);
        }
        graph.edges = record.edges.into_iter().map(|edge| (edge.id, edge)).collect();
        graph
    }
}

impl From<RoadGraph> for GraphRecord {
    fn from(graph: RoadGraph) -> Self {
        Self {
            snap_tolerance: graph.snap_tolerance,
            nodes: graph.nodes.into_values().collect(),
            edges: graph.edges.into_values().collect(),
            next_node: graph.next_node,
            next_edge: graph.next_edge,
        }
    }
}

impl Default for RoadGraph {
    fn default() -> Self {
        Self::new(crate::terrain::constants::DEFAULT_SNAP_TOLERANCE)
    }
}

/// Centimetres, rounded up for edge costs so the rounded-down heuristic stays admissible
fn cost_cm(metres: f32) -> u64 {
    (metres.max(0.0) * 100.0).ceil() as u64
}

impl RoadGraph {
    pub fn new(snap_tolerance: f32) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            spatial: HashMap::new(),
            snap_tolerance: snap_tolerance.max(f32::EPSILON),
            next_node: 0,
            next_edge: 0,
        }
    }

    pub fn snap_tolerance(&self) -> f32 {
        self.snap_tolerance
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&RoadNode> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&RoadEdge> {
        self.edges.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RoadNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &RoadEdge> {
        self.edges.values()
    }

    /// Quantized XZ cell of a position. Cells are `tolerance / √2` wide, so any two
    /// positions in one cell are within the snap tolerance and share a node.
    pub fn quantized_cell(&self, position: Vec3) -> (i32, i32) {
        let cell = self.snap_tolerance * std::f32::consts::FRAC_1_SQRT_2;
        (
            (position.x / cell).floor() as i32,
            (position.z / cell).floor() as i32,
        )
    }

    fn index_node(&mut self, id: NodeId, position: Vec3) {
        let cell = self.quantized_cell(position);
        self.spatial.entry(cell).or_default().push(id);
    }

    fn unindex_node(&mut self, id: NodeId, position: Vec3) {
        let cell = self.quantized_cell(position);
        if let Some(bucket) = self.spatial.get_mut(&cell) {
            bucket.retain(|other| *other != id);
            if bucket.is_empty() {
                self.spatial.remove(&cell);
            }
        }
    }

    /// Closest node within the snap tolerance, measured in XZ.
    /// The tolerance spans at most two cells, hence the 5x5 neighbourhood.
    fn snapped_node(&self, position: Vec3) -> Option<NodeId> {
        let (cx, cz) = self.quantized_cell(position);
        let mut best: Option<(NodeId, f32)> = None;
        for dz in -2..=2 {
            for dx in -2..=2 {
                let Some(bucket) = self.spatial.get(&(cx + dx, cz + dz)) else {
                    continue;
                };
                for id in bucket {
                    let Some(node) = self.nodes.get(id) else {
                        continue;
                    };
                    let distance = horizontal_distance(node.position, position);
                    if distance <= self.snap_tolerance && best.is_none_or(|(_, d)| distance < d) {
                        best = Some((*id, distance));
                    }
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// Existing node within the snap tolerance, or a new one at `position`
    pub fn get_or_create_node(&mut self, position: Vec3) -> NodeId {
        if let Some(id) = self.snapped_node(position) {
            return id;
        }

        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            RoadNode {
                id,
                position,
                edges: Vec::new(),
            },
        );
        self.index_node(id, position);
        id
    }

    /// Nearest node to `position` in XZ, optionally limited to `max_distance`
    pub fn nearest_node(&self, position: Vec3, max_distance: Option<f32>) -> Option<NodeId> {
        self.nodes
            .values()
            .map(|node| (node.id, horizontal_distance(node.position, position)))
            .filter(|(_, distance)| max_distance.is_none_or(|limit| *distance <= limit))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Waypoints oriented from `from` to `to`, and the travel length with the ends
    /// pinned to the node positions
    fn measure(
        &self,
        from: NodeId,
        to: NodeId,
        mut waypoints: Polyline,
    ) -> RoadResult<(Polyline, f32)> {
        let start = self.node(from).ok_or(RoadError::UnknownNode { id: from.0 })?.position;
        let end = self.node(to).ok_or(RoadError::UnknownNode { id: to.0 })?.position;

        if let Some(first) = waypoints.first()
            && first.distance_squared(end) < first.distance_squared(start)
        {
            waypoints.reverse();
        }

        let length = if waypoints.len() >= 2 {
            let mut pinned = waypoints.clone();
            let last = pinned.len() - 1;
            pinned[0] = start;
            pinned[last] = end;
            polyline_length(&pinned)
        } else {
            start.distance(end)
        };
        Ok((waypoints, length))
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, spec: EdgeSpec) -> RoadResult<EdgeId> {
        if from == to {
            return Err(RoadError::SelfLoopEdge { id: from.0 });
        }
        let (waypoints, length) = self.measure(from, to, spec.waypoints)?;

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            RoadEdge {
                id,
                from,
                to,
                road_type: spec.road_type,
                width: spec.width,
                is_bridge: spec.is_bridge,
                waypoints,
                length,
                segment_id: spec.segment_id,
            },
        );
        for node in [from, to] {
            if let Some(node) = self.nodes.get_mut(&node) {
                node.edges.push(id);
            }
        }
        Ok(id)
    }

    /// Snap both positions to nodes and connect them
    pub fn add_edge_between(&mut self, a: Vec3, b: Vec3, spec: EdgeSpec) -> RoadResult<EdgeId> {
        let from = self.get_or_create_node(a);
        let to = self.get_or_create_node(b);
        self.add_edge(from, to, spec)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<RoadEdge> {
        let edge = self.edges.remove(&id)?;
        for node in [edge.from, edge.to] {
            if let Some(node) = self.nodes.get_mut(&node) {
                node.edges.retain(|other| *other != id);
            }
        }
        Some(edge)
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, id: NodeId) -> Option<RoadNode> {
        let incident = self.nodes.get(&id)?.edges.clone();
        for edge in incident {
            self.remove_edge(edge);
        }
        let node = self.nodes.remove(&id)?;
        self.unindex_node(id, node.position);
        Some(node)
    }

    /// Replace the geometry of an edge and recompute its length
    pub fn set_edge_waypoints(&mut self, id: EdgeId, waypoints: Polyline) -> RoadResult<()> {
        let (from, to) = self
            .edges
            .get(&id)
            .map(|edge| (edge.from, edge.to))
            .ok_or(RoadError::UnknownEdge { id: id.0 })?;
        let (waypoints, length) = self.measure(from, to, waypoints)?;
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.waypoints = waypoints;
            edge.length = length;
        }
        Ok(())
    }

    /// The node at the far end of `edge` from `node`
    pub fn get_other_node(&self, edge: EdgeId, node: NodeId) -> Option<NodeId> {
        let edge = self.edges.get(&edge)?;
        if edge.from == node {
            Some(edge.to)
        } else if edge.to == node {
            Some(edge.from)
        } else {
            None
        }
    }

    /// Neighbouring nodes with the connecting edge
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &RoadEdge)> + '_ {
        self.nodes
            .get(&node)
            .into_iter()
            .flat_map(|n| n.edges.iter())
            .filter_map(move |edge| {
                let other = self.get_other_node(*edge, node)?;
                Some((other, self.edges.get(edge)?))
            })
    }

    /// Shortest route by travel length
    pub fn find_path(&self, from: NodeId, to: NodeId) -> Option<GraphPath> {
        let goal = self.node(to)?.position;
        self.node(from)?;

        let (nodes, _) = astar(
            &from,
            |node| {
                self.neighbors(*node)
                    .map(|(other, edge)| (other, cost_cm(edge.length)))
                    .collect::<Vec<_>>()
            },
            |node| {
                self.node(*node)
                    .map(|n| (n.position.distance(goal) * 100.0).floor() as u64)
                    .unwrap_or(0)
            },
            |node| *node == to,
        )?;

        let mut edges = Vec::with_capacity(nodes.len().saturating_sub(1));
        let mut length = 0.0;
        for pair in nodes.windows(2) {
            let edge = self
                .neighbors(pair[0])
                .filter(|(other, _)| *other == pair[1])
                .map(|(_, edge)| edge)
                .min_by(|a, b| a.length.total_cmp(&b.length))?;
            edges.push(edge.id);
            length += edge.length;
        }

        Some(GraphPath { nodes, edges, length })
    }

    pub fn get_navigation_stats(&self) -> NavigationStats {
        let starts: Vec<NodeId> = self.nodes.keys().copied().collect();
        let components = connected_components(&starts, |node| {
            self.neighbors(*node).map(|(other, _)| other).collect::<Vec<_>>()
        });

        let total_length = self.edges.values().map(|edge| edge.length).sum();
        let bridges: Vec<&RoadEdge> = self.edges.values().filter(|edge| edge.is_bridge).collect();
        let isolated_nodes = self.nodes.values().filter(|node| node.edges.is_empty()).count();
        let average_degree = if self.nodes.is_empty() {
            0.0
        } else {
            let degree_sum: usize = self.nodes.values().map(RoadNode::degree).sum();
            degree_sum as f32 / self.nodes.len() as f32
        };

        let road_types = [RoadType::Highway, RoadType::Arterial, RoadType::Local, RoadType::Lane];
        let length_by_type = road_types
            .into_iter()
            .map(|road_type| {
                let length = self
                    .edges
                    .values()
                    .filter(|edge| edge.road_type == road_type)
                    .map(|edge| edge.length)
                    .sum::<f32>();
                (road_type, length)
            })
            .filter(|(_, length)| *length > 0.0)
            .collect();

        NavigationStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            total_length,
            bridge_count: bridges.len(),
            bridge_length: bridges.iter().map(|edge| edge.length).sum(),
            connected_components: components.len(),
            isolated_nodes,
            avg_node_degree: average_degree,
            length_by_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> EdgeSpec {
        EdgeSpec::new(RoadType::Local)
    }

    #[test]
    fn test_nodes_snap_within_tolerance() {
        let mut graph = RoadGraph::new(5.0);
        let a = graph.get_or_create_node(Vec3::new(100.0, 0.0, 100.0));
        let b = graph.get_or_create_node(Vec3::new(103.0, 2.0, 101.0));
        let c = graph.get_or_create_node(Vec3::new(110.0, 0.0, 100.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(graph.node_count(), 2);

        // Across a cell boundary
        let d = graph.get_or_create_node(Vec3::new(-1.0, 0.0, 0.0));
        let e = graph.get_or_create_node(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(d, e);
    }

    #[test]
    fn test_one_node_per_quantized_cell() {
        let mut graph = RoadGraph::new(5.0);
        let corner = Vec3::new(0.1, 0.0, 0.1);
        let far_corner = Vec3::new(3.4, 0.0, 3.4);
        assert_eq!(graph.quantized_cell(corner), graph.quantized_cell(far_corner));
        assert_eq!(graph.get_or_create_node(corner), graph.get_or_create_node(far_corner));

        // Too far apart to merge, so they must sit in different cells
        let outside = Vec3::new(4.9, 0.0, 4.9);
        let other = graph.get_or_create_node(outside);
        assert_eq!(graph.node_count(), 2);
        assert_ne!(graph.quantized_cell(corner), graph.quantized_cell(outside));
        assert_eq!(graph.node(other).map(|n| n.position), Some(outside));

        // Dense requests never leave two nodes in one cell
        for i in 0..40 {
            for j in 0..40 {
                graph.get_or_create_node(Vec3::new(i as f32 * 1.3, 0.0, j as f32 * 0.9));
            }
        }
        let mut cells = std::collections::HashSet::new();
        for node in graph.nodes() {
            assert!(cells.insert(graph.quantized_cell(node.position)), "{} shares a cell", node.id);
        }
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut graph = RoadGraph::new(5.0);
        let result = graph.add_edge_between(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), local());
        assert!(matches!(result, Err(RoadError::SelfLoopEdge { .. })));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_unknown_node_rejected() {
        let mut graph = RoadGraph::new(5.0);
        let a = graph.get_or_create_node(Vec3::ZERO);
        let result = graph.add_edge(a, NodeId(42), local());
        assert!(matches!(result, Err(RoadError::UnknownNode { id: 42 })));
    }

    #[test]
    fn test_edge_length_follows_waypoints() {
        let mut graph = RoadGraph::new(5.0);
        let waypoints = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(30.0, 0.0, 40.0),
            Vec3::new(60.0, 0.0, 0.0),
        ];
        let edge = graph
            .add_edge_between(
                Vec3::ZERO,
                Vec3::new(60.0, 0.0, 0.0),
                local().with_waypoints(waypoints),
            )
            .unwrap();
        assert!((graph.edge(edge).unwrap().length - 100.0).abs() < 1e-3);

        graph
            .set_edge_waypoints(edge, vec![Vec3::new(60.0, 0.0, 0.0), Vec3::ZERO])
            .unwrap();
        let edge = graph.edge(edge).unwrap();
        assert!((edge.length - 60.0).abs() < 1e-3);
        // Reoriented to run from the edge's first node
        assert_eq!(edge.waypoints[0], Vec3::ZERO);

        assert!(matches!(
            graph.set_edge_waypoints(EdgeId(99), Vec::new()),
            Err(RoadError::UnknownEdge { id: 99 })
        ));
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut graph = RoadGraph::new(5.0);
        let e1 = graph.add_edge_between(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), local()).unwrap();
        let e2 = graph
            .add_edge_between(Vec3::new(100.0, 0.0, 0.0), Vec3::new(200.0, 0.0, 0.0), local())
            .unwrap();
        let hub = graph.edge(e1).unwrap().to;
        assert_eq!(graph.get_other_node(e2, hub), Some(graph.edge(e2).unwrap().to));

        graph.remove_node(hub).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 2);
        assert!(graph.nodes().all(|node| node.edges.is_empty()));

        // The spatial index forgot the node too
        let replacement = graph.get_or_create_node(Vec3::new(100.0, 0.0, 0.0));
        assert_ne!(replacement, hub);
    }

    #[test]
    fn test_find_path_prefers_shorter_route() {
        let mut graph = RoadGraph::new(5.0);
        let a = Vec3::ZERO;
        let b = Vec3::new(100.0, 0.0, 0.0);
        let c = Vec3::new(200.0, 0.0, 0.0);
        let detour = Vec3::new(100.0, 0.0, 300.0);

        graph.add_edge_between(a, b, local()).unwrap();
        graph.add_edge_between(b, c, local()).unwrap();
        graph.add_edge_between(a, detour, local()).unwrap();
        graph.add_edge_between(detour, c, local()).unwrap();

        let start = graph.nearest_node(a, None).unwrap();
        let goal = graph.nearest_node(c, Some(1.0)).unwrap();
        let path = graph.find_path(start, goal).unwrap();

        assert_eq!(path.nodes.len(), 3);
        assert_eq!(path.edges.len(), 2);
        assert!((path.length - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_find_path_disconnected() {
        let mut graph = RoadGraph::new(5.0);
        graph.add_edge_between(Vec3::ZERO, Vec3::new(50.0, 0.0, 0.0), local()).unwrap();
        let far = graph.get_or_create_node(Vec3::new(500.0, 0.0, 0.0));
        let start = graph.nearest_node(Vec3::ZERO, None).unwrap();
        assert!(graph.find_path(start, far).is_none());
        assert!(graph.find_path(start, NodeId(77)).is_none());
    }

    #[test]
    fn test_navigation_stats() {
        let mut graph = RoadGraph::new(5.0);
        graph
            .add_edge_between(
                Vec3::ZERO,
                Vec3::new(100.0, 0.0, 0.0),
                EdgeSpec::new(RoadType::Highway),
            )
            .unwrap();
        graph
            .add_edge_between(
                Vec3::new(100.0, 0.0, 0.0),
                Vec3::new(100.0, 0.0, 50.0),
                local().bridge(true),
            )
            .unwrap();
        graph.get_or_create_node(Vec3::new(900.0, 0.0, 900.0));

        let stats = graph.get_navigation_stats();
        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.total_edges, 2);
        assert_eq!(stats.connected_components, 2);
        assert_eq!(stats.isolated_nodes, 1);
        assert_eq!(stats.bridge_count, 1);
        assert!((stats.total_length - 150.0).abs() < 1e-3);
        assert!((stats.bridge_length - 50.0).abs() < 1e-3);
        assert!((stats.avg_node_degree - 1.0).abs() < 1e-6);
        assert_eq!(
            stats.length_by_type,
            vec![(RoadType::Highway, 100.0), (RoadType::Local, 50.0)]
        );
    }

    #[test]
    fn test_serde_rebuilds_spatial_index() {
        let mut graph = RoadGraph::new(5.0);
        graph.add_edge_between(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), local()).unwrap();

        let bytes = bincode::serde::encode_to_vec(&graph, bincode::config::standard()).unwrap();
        let (mut restored, _): (RoadGraph, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(restored, graph);

        let snapped = restored.get_or_create_node(Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(snapped, NodeId(0));
        assert_eq!(restored.node_count(), 2);
    }
}
