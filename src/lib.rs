//! # OpsDesk
//!
//! A local-first knowledge assistant for air traffic control operations
//! teams.
//!
//! OpsDesk keeps a curated store of operational reference documents
//! (manuals, NOTAMs, charts), selects the documents relevant to a question
//! by keyword matching, and asks an external generation service for a
//! grounded, cited answer — attaching the original document binaries and
//! allowing live web search for anything the local documents do not cover.
//! Conversations persist across sessions as a JSON transcript.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌─────────────┐
//! │ ops kb ... │──▶│ Knowledge   │◀──│  Retrieval   │
//! │ (curation) │   │ store (JSON)│   │  (keyword)   │
//! └────────────┘   └────────────┘   └──────┬──────┘
//!                                          │ context + attachments
//!                                          ▼
//!                  ┌────────────┐   ┌─────────────┐
//!                  │ Transcript  │◀──│  Assistant   │──▶ Gemini API
//!                  │ store (JSON)│   │ orchestrator │    (+ web search)
//!                  └────────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ops init                        # create state files
//! ops kb import ./docs            # ingest local documents
//! ops ask "qual o limite de crosswind?"
//! ops chat                        # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | Knowledge store trait and backends |
//! | [`retrieval`] | Keyword retrieval and context rendering |
//! | [`generation`] | Generation service abstraction (Gemini) |
//! | [`assistant`] | Answer orchestration |
//! | [`transcript`] | Transcript persistence |
//! | [`extract`] | PDF text extraction for ingestion |
//! | [`admin`] | Knowledge-base administration commands |
//! | [`chat`] | Conversational CLI commands |

pub mod admin;
pub mod assistant;
pub mod chat;
pub mod config;
pub mod extract;
pub mod generation;
pub mod models;
pub mod retrieval;
pub mod store;
pub mod transcript;
