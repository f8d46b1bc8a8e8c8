//! Coach Control - interactive client for the skill-progress inference
//! server.
//!
//! Conducts a spoken self-assessment session, forwards the rating over a
//! persistent TCP connection, and presents the returned prior/posterior
//! analysis.

pub mod analyzer;
pub mod client;
pub mod completion;
pub mod controller;
pub mod gate;
pub mod render;
pub mod speech;
