//! Embedding generation under a remote rate budget.
//!
//! [`EmbeddingClient`] pairs an [`EmbeddingProvider`] with a shared
//! [`Throttle`]; the provider does the HTTP work and the throttle keeps a
//! minimum delay between consecutive calls.

mod client;
mod openai;
mod provider;
mod throttle;

pub use client::EmbeddingClient;
pub use openai::OpenAiEmbeddingProvider;
pub use provider::EmbeddingProvider;
pub use throttle::{Throttle, ThrottleTicket};
