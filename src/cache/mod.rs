//! Caching decorators.
//!
//! A decorator implements the same storage contract it consumes, adding
//! behavior around an inner store. [`TtlCache`] keeps recently read or
//! written objects in memory for a fixed time-to-live.

pub mod ttl;

pub use ttl::TtlCache;
