//! Board fixtures for integration tests
#![allow(dead_code)] // Test utilities may not all be used in every test

use codeconquer::board::{BoardDefinition, BoardEdgeDef, BoardGraph, BoardNodeDef, BoardNodeType};

pub struct BoardBuilder {
    nodes: Vec<BoardNodeDef>,
    edges: Vec<BoardEdgeDef>,
}

impl BoardBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![],
            edges: vec![],
        }
    }

    pub fn node(mut self, id: &str, node_type: BoardNodeType) -> Self {
        self.nodes.push(BoardNodeDef {
            id: id.to_string(),
            node_type,
            x: None,
            y: None,
        });
        self
    }

    pub fn edge(self, from: &str, to: &str) -> Self {
        self.push_edge(from, to, None)
    }

    pub fn labelled_edge(self, from: &str, to: &str, label: &str) -> Self {
        self.push_edge(from, to, Some(label))
    }

    fn push_edge(mut self, from: &str, to: &str, label: Option<&str>) -> Self {
        self.edges.push(BoardEdgeDef {
            from: from.to_string(),
            to: to.to_string(),
            label: label.map(str::to_string),
        });
        self
    }

    pub fn build(self) -> BoardGraph {
        BoardGraph::from_definition(BoardDefinition {
            meta: serde_json::Value::Null,
            nodes: self.nodes,
            edges: self.edges,
        })
        .unwrap()
    }
}

/// `n0(START) -> n1(EASY) -> n2(FORK)`, then `n3` or `n4` to the finish at `n5`
pub fn fork_board() -> BoardGraph {
    use BoardNodeType::*;
    BoardBuilder::new()
        .node("n0", Start)
        .node("n1", Easy)
        .node("n2", Fork)
        .node("n3", Medium)
        .node("n4", Easy)
        .node("n5", Finish)
        .edge("n0", "n1")
        .edge("n1", "n2")
        .labelled_edge("n2", "n3", "Go straight")
        .labelled_edge("n2", "n4", "Take shortcut")
        .edge("n3", "n5")
        .edge("n4", "n5")
        .build()
}

/// `s -> a(EASY) -> b(MEDIUM) -> c(HARD) -> sp(SPECIAL) -> d(EASY) -> f(FINISH)`, jail `j -> d`
pub fn track_board() -> BoardGraph {
    use BoardNodeType::*;
    BoardBuilder::new()
        .node("s", Start)
        .node("a", Easy)
        .node("b", Medium)
        .node("c", Hard)
        .node("sp", Special)
        .node("d", Easy)
        .node("f", Finish)
        .node("j", Jail)
        .edge("s", "a")
        .edge("a", "b")
        .edge("b", "c")
        .edge("c", "sp")
        .edge("sp", "d")
        .edge("d", "f")
        .edge("j", "d")
        .build()
}
