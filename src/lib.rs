//! # SPO Assistant
//!
//! Answers students' questions about study and examination regulations
//! (Studien- und Prüfungsordnung, SPO) in German, grounded in a directory of
//! PDF documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐
//! │  PDFs    │──▶│ Split+Embed │──▶│ VectorIndex  │  (built once per process)
//! │  data/   │   │  (OpenAI)   │   │  in memory   │
//! └──────────┘   └─────────────┘   └──────┬───────┘
//!                                         │ top-k
//!                  ┌──────────────┐   ┌───▼────────┐
//!   browser ◀─────▶│ axum chat UI │──▶│ RAG prompt │──▶ OpenAI chat
//!                  └──────────────┘   └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and the API credential |
//! | [`loader`] | Find and read documents |
//! | [`extract`] | Page text from PDF and plain-text documents |
//! | [`chunk`] | Overlapping text windows |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | In-memory vector index |
//! | [`indexer`] | Index pipeline and build-once cache |
//! | [`llm`] | Chat-completion model |
//! | [`prompt`] | The fixed German prompt |
//! | [`rag`] | Answer generation |
//! | [`citation`] | Source references |
//! | [`session`] | Chat history |
//! | [`ui`] | HTML rendering |
//! | [`server`] | HTTP server |

pub mod chunk;
pub mod citation;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod indexer;
pub mod llm;
pub mod loader;
pub mod logging;
pub mod models;
pub mod openai;
pub mod prompt;
pub mod rag;
pub mod server;
pub mod session;
pub mod store;
pub mod ui;
