//! Generative model interface and the Gemini provider behind it.

pub mod model;
pub mod providers;

pub use {
    model::{Content, GenerativeModel, Part, chat_contents},
    providers::{RelayModels, gemini_models},
};
