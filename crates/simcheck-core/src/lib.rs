//! # simcheck core
//!
//! Runtime-free document similarity and match detection: passage chunking,
//! cosine similarity, all-pairs best-match search between two passage sets,
//! score aggregation, batch ranking, and content hashing.
//!
//! The embedding model, the AI-text classifier, and the corpus storage are
//! capability traits ([`embedding::Embedder`], [`classify::Classifier`],
//! [`store::CorpusStore`]) injected by the application. This crate contains
//! no tokio, sqlx, filesystem I/O, or network code.
//!
//! ## Data Flow
//!
//! ```text
//! text ─▶ chunk ─▶ passages ─▶ Embedder ─▶ vectors
//!                                             │
//!                 ┌───────────────────────────┘
//!                 ▼
//!           matching (N×M best match) ─▶ aggregate ─▶ ComparisonResult
//!                                                          │
//!                                     rank (per batch) ◀───┘
//! ```

pub mod aggregate;
pub mod chunk;
pub mod classify;
pub mod compare;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod hash;
pub mod matching;
pub mod models;
pub mod rank;
pub mod store;

pub use engine::{EngineParams, SimilarityEngine};
pub use error::CoreError;
