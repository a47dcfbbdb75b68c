//! # simcheck
//!
//! A local-first document similarity and plagiarism detection engine.
//!
//! simcheck ingests documents into named batches, splits them into
//! overlapping passages, embeds each passage, and reports which passages of
//! one document have a close counterpart in another. The comparison logic
//! lives in [`simcheck_core`]; this crate supplies configuration, SQLite
//! persistence, concrete embedding and AI-detection providers, file
//! ingestion, and the `simcheck` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │   Ingest    │──▶│ Chunk+Embed │──▶│  SQLite  │
//! │ files/dirs  │   │  (engine)   │   │ passages │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │ compare  │       │   rank   │
//!                 │  a → b   │       │  batch   │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! simcheck init
//! simcheck ingest ./submissions --batch week-1
//! simcheck rank <document-id>
//! simcheck compare essay_a.txt essay_b.txt --files
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `CorpusStore` |
//! | [`embedding`] | Embedding providers and engine construction |
//! | [`detection`] | AI-text classifier providers |
//! | [`ingest`] | File and directory ingestion |
//! | [`embed_cmd`] | Backfill missing or stale passage embeddings |
//! | [`get`] | Batch and document inspection |
//! | [`compare_cmd`] | Pairwise comparison |
//! | [`rank_cmd`] | Batch ranking |
//! | [`file_cmd`] | Content hashing and AI detection of single files |

pub mod compare_cmd;
pub mod config;
pub mod db;
pub mod detection;
pub mod embed_cmd;
pub mod embedding;
pub mod file_cmd;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod rank_cmd;
pub mod sqlite_store;
