// Static board graph shared by every session

pub use graph::{
    BoardDefinition, BoardEdgeDef, BoardError, BoardGraph, BoardNodeDef, BoardNodeType,
    ForkOption,
};

pub mod graph;
pub mod handlers;
