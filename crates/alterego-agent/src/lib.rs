pub mod intent;
pub mod openai;
pub mod provider;
pub mod timeout;

pub use intent::{Intent, IntentClassifier, KeywordClassifier, ModelClassifier};
pub use openai::{OpenAiFlavor, OpenAiProvider};
pub use provider::{
    Completion, CompletionProvider, CompletionRequest, FunctionCall, FunctionSpec, Message,
    ProviderError, Role, SamplingParams,
};
pub use timeout::TimeoutProvider;
