//! Per-Key Lock Module
//!
//! Serializes access to individual file keys. Each key gets its own
//! shared/exclusive lock, created on first use and dropped again once nobody
//! holds or waits for it.
//!
//! Operations only ever touch a single key, so there is no cross-key lock
//! ordering to respect.

pub mod registry;

#[cfg(test)]
mod tests;
