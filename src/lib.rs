//! # docrag
//!
//! The content ingestion and retrieval core behind a bilingual
//! institutional website's AI assistant.
//!
//! Admin-submitted documents (news, research project pages, team bios)
//! are normalized, split into overlapping word windows, embedded, and
//! stored in SQLite. Visitor questions are embedded with the same
//! provider and answered with the nearest published chunks as context.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────┐   ┌──────────┐
//! │  Admin     │──▶│    Ingestor      │──▶│  SQLite   │
//! │  submits   │   │ normalize+chunk  │   │ docs +    │
//! │  document  │   │ +embed (partial) │   │ chunks    │
//! └───────────┘   └──────────────────┘   └────┬─────┘
//!                                             │
//! ┌───────────┐   ┌──────────────────┐        │
//! │  Visitor   │──▶│    Retriever     │◀──────┘
//! │  question  │   │ embed + cosine   │
//! └───────────┘   └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docrag init                         # create database
//! docrag ingest article.txt --title "Clinical trial results"
//! docrag list
//! docrag ask "what trials are recruiting?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`normalize`] | Whitespace normalization |
//! | [`chunk`] | Word-window chunking with overlap |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`ingest`] | Ingestion orchestration |
//! | [`retrieve`] | Question retrieval path |
//! | [`store`] | Document store trait |
//! | [`store_sqlite`] | SQLite store |
//! | [`store_memory`] | In-memory store for tests |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod retrieve;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
