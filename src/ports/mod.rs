//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `KnowledgeSource` - free-text knowledge page lookups
//! - `LanguageModel` - text completion for analysis, extraction and synthesis

mod knowledge;
mod language_model;

pub use knowledge::{KnowledgeSource, LookupError, Page};
pub use language_model::{CompletionError, LanguageModel};
