//! AI adapters - language model port implementations.

mod disabled;
mod mock;
mod openai;

pub use disabled::DisabledLanguageModel;
pub use mock::{MockLanguageModel, RecordedCall};
pub use openai::{OpenAiClient, OpenAiClientBuilder};
