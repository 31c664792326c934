//! # docrank
//!
//! Persona-driven relevance ranking for document collections.
//!
//! Given a directory of PDFs, a persona ("Academic Researcher") and a
//! job-to-be-done ("Survey literature on LLMs"), docrank extracts candidate
//! sections from every page, embeds them together with the query in a shared
//! vector space, ranks them by cosine similarity, and refines the best
//! sections into sentence-level snippets. The result is a single JSON file.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌────────┐   ┌────────┐
//! │  Input   │──▶│ Extract  │──▶│  Embed   │──▶│  Rank  │──▶│ Refine │──▶ JSON
//! │ PDF/TXT  │   │ Sections │   │ + Score  │   │ top K  │   │ top M  │
//! └──────────┘   └──────────┘   └──────────┘   └────────┘   └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docrank run --input-dir ./input \
//!     --persona "Academic Researcher" \
//!     --job "Survey literature on LLMs"
//! docrank sections ./input/paper.pdf   # inspect candidate sections
//! docrank models                       # list local embedding models
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration, CLI overrides, validation |
//! | [`error`] | Error taxonomy and exit codes |
//! | [`models`] | Core data types |
//! | [`input`] | Input directory scanning |
//! | [`extract`] | Page text extraction (PDF, plain text) |
//! | [`sections`] | Page → candidate section splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`scoring`] | Cosine similarity |
//! | [`rank`] | Top-K section ranking |
//! | [`refine`] | Sentence-level snippet refinement |
//! | [`pipeline`] | Run orchestration |
//! | [`output`] | JSON result assembly and atomic writing |

pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod input;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod rank;
pub mod refine;
pub mod scoring;
pub mod sections;
