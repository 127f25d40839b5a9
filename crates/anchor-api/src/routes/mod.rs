//! Route handlers, one module per surface.

pub mod anchoring;
pub mod audit;
pub mod health;
