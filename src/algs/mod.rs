//! Mesh algorithms built on the topology layer.

pub mod quadrangulate;

pub use quadrangulate::{QuadOptions, QuadPairing, quadrangulate, quadrangulate_with};
