//! Shared fixtures and a deterministic, offline test harness for memoria's end-to-end suites.
//!
//! Every test in this crate runs against a real [`memoria_core::IndexManager`] and
//! [`memoria_core::IngestionPipeline`] backed by a temp directory on disk, but substitutes fake
//! in-process embedding and caption providers so the suite is deterministic and never makes a
//! network call.

pub mod fixtures;
pub mod harness;
