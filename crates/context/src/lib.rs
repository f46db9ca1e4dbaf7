//! Context packing for AutoContext.
//!
//! Turns a ranked candidate sequence into a budget-respecting
//! [`ContextResult`](autocontext_core::ContextResult), and renders that result
//! into a single attributed text payload.
//!
//! # Determinism
//!
//! Packing is a pure function of the ranking and the budget. No randomness or
//! clock reads happen here; access marking is left to the caller.

pub mod packer;
pub mod render;

pub use packer::{ContextPacker, PackOutcome, PackStats};
pub use render::ContextRenderer;
