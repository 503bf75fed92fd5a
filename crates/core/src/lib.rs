//! Functional core of the REAL social backend.
//!
//! Everything in this crate is pure: entity types, status enums, counters,
//! card specs, business rules, and the repository traits the imperative
//! shell implements. No I/O happens here.

pub mod model;
pub mod storage;
pub mod stream;
