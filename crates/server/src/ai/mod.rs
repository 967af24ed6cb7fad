//! Patient simulation powered by the Gemini API

pub mod client;
pub mod retry;
pub mod simulator;

pub use client::{CompletionClient, GeminiClient};
pub use retry::RetryPolicy;
pub use simulator::PatientSimulator;
