use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Board shipped with the server, used when no board file is configured
pub const DEFAULT_BOARD_JSON: &str = include_str!("default_board.json");

const GENERIC_FORK_LABEL: &str = "Choose path";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardNodeType {
    Start,
    Finish,
    Easy,
    Medium,
    Hard,
    Special,
    Jail,
    Fork,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardNodeDef {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: BoardNodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardEdgeDef {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Serialized form of a board as it appears on disk and over the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDefinition {
    #[serde(default)]
    pub meta: serde_json::Value,
    #[serde(default)]
    pub nodes: Vec<BoardNodeDef>,
    #[serde(default)]
    pub edges: Vec<BoardEdgeDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkOption {
    pub to: String,
    pub label: String,
}

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Board definition is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Board file could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("Board has no nodes")]
    NoNodes,
    #[error("Board has no edges")]
    NoEdges,
    #[error("Board node with blank id")]
    BlankNodeId,
    #[error("Duplicate board node id: {0}")]
    DuplicateNode(String),
    #[error("Board must contain exactly one {node_type} node, found {count}")]
    NodeCount {
        node_type: BoardNodeType,
        count: usize,
    },
    #[error("Edge {from} -> {to} references unknown node {missing}")]
    UnknownEdgeEndpoint {
        from: String,
        to: String,
        missing: String,
    },
}

/// Immutable runtime board: node types plus adjacency, shared by every session
#[derive(Debug, Clone)]
pub struct BoardGraph {
    definition: BoardDefinition,
    node_types: HashMap<String, BoardNodeType>,
    outgoing: HashMap<String, Vec<String>>,
    labels: HashMap<(String, String), String>,
    start_node_id: String,
    finish_node_id: String,
    jail_node_id: Option<String>,
}

impl BoardGraph {
    pub fn from_json(json: &str) -> Result<Self, BoardError> {
        let definition: BoardDefinition = serde_json::from_str(json)?;
        Self::from_definition(definition)
    }

    pub fn from_file(path: &str) -> Result<Self, BoardError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn default_board() -> Result<Self, BoardError> {
        Self::from_json(DEFAULT_BOARD_JSON)
    }

    #[instrument(skip(definition), fields(nodes = definition.nodes.len(), edges = definition.edges.len()))]
    pub fn from_definition(definition: BoardDefinition) -> Result<Self, BoardError> {
        if definition.nodes.is_empty() {
            return Err(BoardError::NoNodes);
        }
        if definition.edges.is_empty() {
            return Err(BoardError::NoEdges);
        }

        let mut node_types = HashMap::new();
        for node in &definition.nodes {
            if node.id.trim().is_empty() {
                return Err(BoardError::BlankNodeId);
            }
            if node_types.insert(node.id.clone(), node.node_type).is_some() {
                return Err(BoardError::DuplicateNode(node.id.clone()));
            }
        }

        let start_node_id = single_node_of(&definition, BoardNodeType::Start)?;
        let finish_node_id = single_node_of(&definition, BoardNodeType::Finish)?;
        let jail_node_id = definition
            .nodes
            .iter()
            .find(|n| n.node_type == BoardNodeType::Jail)
            .map(|n| n.id.clone());

        let mut outgoing: HashMap<String, Vec<String>> = HashMap::new();
        let mut labels = HashMap::new();
        for edge in &definition.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !node_types.contains_key(endpoint) {
                    return Err(BoardError::UnknownEdgeEndpoint {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
            let targets = outgoing.entry(edge.from.clone()).or_default();
            if !targets.contains(&edge.to) {
                targets.push(edge.to.clone());
            }
            if let Some(label) = &edge.label {
                labels.insert((edge.from.clone(), edge.to.clone()), label.clone());
            }
        }

        info!(
            start = %start_node_id,
            finish = %finish_node_id,
            jail = ?jail_node_id,
            "Board graph loaded"
        );

        Ok(Self {
            definition,
            node_types,
            outgoing,
            labels,
            start_node_id,
            finish_node_id,
            jail_node_id,
        })
    }

    pub fn definition(&self) -> &BoardDefinition {
        &self.definition
    }

    pub fn start_node_id(&self) -> &str {
        &self.start_node_id
    }

    pub fn finish_node_id(&self) -> &str {
        &self.finish_node_id
    }

    pub fn jail_node_id(&self) -> Option<&str> {
        self.jail_node_id.as_deref()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.node_types.contains_key(node_id)
    }

    pub fn node_type(&self, node_id: &str) -> Option<BoardNodeType> {
        self.node_types.get(node_id).copied()
    }

    /// Outgoing neighbours in definition order; empty for dead ends and unknown ids
    pub fn outgoing(&self, node_id: &str) -> &[String] {
        self.outgoing
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.outgoing(from).iter().any(|n| n == to)
    }

    /// Options shown to a player standing on a fork. Labelled edges come first.
    pub fn fork_options(&self, fork_node_id: &str) -> Vec<ForkOption> {
        let mut options: Vec<(bool, ForkOption)> = self
            .outgoing(fork_node_id)
            .iter()
            .map(|to| {
                match self.labels.get(&(fork_node_id.to_string(), to.clone())) {
                    Some(label) => (
                        true,
                        ForkOption {
                            to: to.clone(),
                            label: label.clone(),
                        },
                    ),
                    None => (
                        false,
                        ForkOption {
                            to: to.clone(),
                            label: GENERIC_FORK_LABEL.to_string(),
                        },
                    ),
                }
            })
            .collect();

        options.sort_by(|(a_labelled, a), (b_labelled, b)| {
            b_labelled.cmp(a_labelled).then_with(|| a.to.cmp(&b.to))
        });
        debug!(fork = %fork_node_id, count = options.len(), "Fork options computed");
        options.into_iter().map(|(_, option)| option).collect()
    }
}

fn single_node_of(
    definition: &BoardDefinition,
    node_type: BoardNodeType,
) -> Result<String, BoardError> {
    let matching: Vec<&BoardNodeDef> = definition
        .nodes
        .iter()
        .filter(|n| n.node_type == node_type)
        .collect();
    match matching.as_slice() {
        [only] => Ok(only.id.clone()),
        _ => Err(BoardError::NodeCount {
            node_type,
            count: matching.len(),
        }),
    }
}

#[cfg(test)]
pub mod test_boards {
    use super::*;

    /// Builds a board from `(id, type)` nodes and `(from, to)` edges
    pub fn board(nodes: &[(&str, BoardNodeType)], edges: &[(&str, &str)]) -> BoardGraph {
        let definition = BoardDefinition {
            meta: serde_json::Value::Null,
            nodes: nodes
                .iter()
                .map(|(id, node_type)| BoardNodeDef {
                    id: id.to_string(),
                    node_type: *node_type,
                    x: None,
                    y: None,
                })
                .collect(),
            edges: edges
                .iter()
                .map(|(from, to)| BoardEdgeDef {
                    from: from.to_string(),
                    to: to.to_string(),
                    label: None,
                })
                .collect(),
        };
        BoardGraph::from_definition(definition).unwrap()
    }

    /// `n0(START) -> n1(EASY) -> n2(FORK) -> {n3, n4}`, both branches meeting at FINISH
    pub fn fork_board() -> BoardGraph {
        use BoardNodeType::*;
        board(
            &[
                ("n0", Start),
                ("n1", Easy),
                ("n2", Fork),
                ("n3", Medium),
                ("n4", Easy),
                ("n5", Finish),
            ],
            &[
                ("n0", "n1"),
                ("n1", "n2"),
                ("n2", "n3"),
                ("n2", "n4"),
                ("n3", "n5"),
                ("n4", "n5"),
            ],
        )
    }

    /// Straight track with a SPECIAL and a JAIL node
    pub fn line_board() -> BoardGraph {
        use BoardNodeType::*;
        board(
            &[
                ("s", Start),
                ("a", Easy),
                ("b", Medium),
                ("c", Hard),
                ("sp", Special),
                ("d", Easy),
                ("f", Finish),
                ("j", Jail),
            ],
            &[
                ("s", "a"),
                ("a", "b"),
                ("b", "c"),
                ("c", "sp"),
                ("sp", "d"),
                ("d", "f"),
                ("j", "d"),
            ],
        )
    }
}
