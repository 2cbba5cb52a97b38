// LexCompare Infrastructure - Gemini Adapter
// Implements: GenerationService (file upload, generateContent, file deletion)

mod client;
mod config;
mod wire;

pub use client::GeminiGenerationService;
pub use config::GeminiConfig;
