//! Moves procedural material descriptions between two graph editors through a
//! line-oriented text interchange: the producer walks a source scene and
//! serializes per-material records, the consumer parses them back, resolves
//! each channel to a construction directive and applies the directives against
//! a target graph.

pub mod apply;
pub mod error;
pub mod gradient;
pub mod material;
pub mod naming;
pub mod parser;
pub mod record;
pub mod report;
pub mod resolver;
pub mod scene;
pub mod schema;
pub mod serializer;
