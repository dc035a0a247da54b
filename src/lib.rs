//! Traffic Grid - concurrent lane-grid traffic simulation

pub mod core;
pub mod grid;
pub mod render;
pub mod simulation;
pub mod traffic;
