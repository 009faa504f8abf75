//! # docqa
//!
//! A retrieval-augmented question answering service for user documents.
//!
//! docqa ingests completed documents (text already extracted upstream),
//! splits them into overlapping chunks, embeds each chunk via an external
//! embedding service, and stores the vectors in SQLite keyed by
//! `(user, document, chunk index)`. Questions are answered by embedding
//! the query, ranking stored chunks by cosine similarity, assembling a
//! bounded context block, and asking a generative model for a structured
//! answer with citations.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌──────────┐
//! │ Documents │──▶│   Pipeline    │──▶│  SQLite   │
//! │ (text)    │   │ Chunk+Embed  │   │ vectors   │
//! └───────────┘   └──────────────┘   └────┬─────┘
//!                                        │
//!                     ┌──────────────────┤
//!                     ▼                  ▼
//!                ┌──────────┐      ┌──────────┐
//!                │   CLI    │      │   HTTP   │
//!                │ (docqa)  │      │  (axum)  │
//!                └──────────┘      └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docqa init                                   # create database
//! docqa docs add --user u1 --name "Notes" --file notes.txt
//! docqa ingest --user u1 <document-id>         # chunk + embed
//! docqa ask --user u1 "What are the key points?"
//! docqa serve                                  # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Sliding-window text chunking |
//! | [`embedding`] | Embedding client abstraction + vector codec |
//! | [`store`] | Owner-scoped document/chunk storage |
//! | [`rank`] | Cosine-similarity ranking |
//! | [`context`] | Prompt context assembly |
//! | [`generate`] | Generative model client |
//! | [`answer`] | Prompt building + tolerant response parsing |
//! | [`ingest`] | Ingestion pipeline |
//! | [`qa`] | Question answering pipeline |
//! | [`server`] | HTTP API server |
//! | [`error`] | Pipeline error taxonomy |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod context;
pub mod db;
pub mod docs_cmd;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod qa;
pub mod rank;
pub mod server;
pub mod store;
