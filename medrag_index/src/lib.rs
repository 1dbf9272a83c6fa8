#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]

//! Flat on-disk similarity index over embedded corpus chunks.
//!
//! An index directory holds two parallel files:
//! - `index.vec`: a small header followed by fixed-dimension f32 vectors
//! - `index.json`: passage text and source metadata, one entry per vector
//!
//! Missing either file is a load error, never an empty index.

mod error;
mod gateway;
mod scoring;
mod store;

pub use error::IndexError;
pub use gateway::DiskIndex;
pub use scoring::cosine_similarity;
pub use store::{IndexEntry, METADATA_FILE, VECTORS_FILE, VectorStore};
