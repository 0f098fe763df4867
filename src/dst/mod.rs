//! Deterministic Simulation Testing
//!
//! `TigerStyle`: Seeded randomness, controlled time, invariant checks after
//! every operation. Memory stores are pure in-memory state machines, so a
//! seed plus a manual [`crate::clock::Clock`] reproduces any failure exactly.

mod property;
mod rng;

pub use property::{
    run_property_tests, PropertyTest, PropertyTestFailure, PropertyTestResult, PropertyTestable,
    TimeAdvanceConfig,
};
pub use rng::DeterministicRng;
