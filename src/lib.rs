//! Transit Simulation Library
//!
//! Shuttles actors from a shared hub to their destinations on a fixed cadence.

pub mod simulation;
