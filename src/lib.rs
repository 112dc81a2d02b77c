//! Merge mcabber chat history stores.
//!
//! A store is either one append-only history file or a flat directory of
//! such files. Merging two stores produces one chronologically ordered,
//! duplicate-free store; each run is a stateless one-shot batch over the
//! inputs.
//!
//! The interesting part lives in [`record`] (the fixed-offset history
//! codec) and [`merge`] (stable pre-sort plus a two-pointer,
//! duplicate-collapsing merge). [`store`] is the orchestration around
//! them: pairing files between directories, copying one-sided files
//! through, and running independent pairs in parallel.

pub mod error;
pub mod logger;
pub mod merge;
pub mod record;
pub mod store;

pub use error::HistoryError;
pub use record::Record;
