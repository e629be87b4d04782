//! # Answer Harness
//!
//! A corpus-backed question-answering engine. Queries are vectorized with
//! TF-IDF, answered by k-nearest-neighbor vote over trained answers,
//! classified against named intents, and, when no intent matches, grouped
//! into clusters that are promoted to new intents once they are large
//! enough.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────────────┐   ┌──────────┐
//! │ corpus file  │──▶│            Engine            │◀─▶│  SQLite  │
//! └──────────────┘   │ VSM · KNN · intents · topics │   │  store   │
//!                    └──────────────┬───────────────┘   └──────────┘
//!                                   │
//!                      ┌────────────┴────────┐
//!                      ▼                     ▼
//!                 ┌──────────┐        ┌────────────┐
//!                 │   CLI    │        │ HTTP + WS  │
//!                 │  (ans)   │        │ + scheduler│
//!                 └──────────┘        └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ans init                                  # create database
//! ans train --query "what is a slice" --answer "A slice is a view into an array."
//! ans ask "what is a slice"
//! ans serve                                 # start HTTP/WebSocket server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`normalize`] | Stopwords, stemming, lemmatization |
//! | [`vsm`] | Corpus TF-IDF vector space model |
//! | [`similarity`] | Euclidean distance and cosine similarity |
//! | [`knn`] | Nearest-neighbor answer retrieval |
//! | [`classifier`] | Intent classification |
//! | [`discovery`] | Unmatched-query clustering and promotion |
//! | [`keywords`] | Per-document TF-IDF keyword ranking |
//! | [`topics`] | Topic index for related-topic annotations |
//! | [`engine`] | The owning aggregate and its operations |
//! | [`error`] | Typed engine errors |
//! | [`corpus`] | Corpus and keyword-entity loading |
//! | [`protocol`] | Inbound/outbound message envelope |
//! | [`store`] | Persistence trait, SQLite and in-memory stores |
//! | [`scheduler`] | Periodic promotion sweep and retrain |
//! | [`server`] | HTTP and WebSocket API |
//! | [`commands`] | CLI command implementations |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod classifier;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod db;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod keywords;
pub mod knn;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod protocol;
pub mod scheduler;
pub mod server;
pub mod similarity;
pub mod store;
pub mod topics;
pub mod vsm;
