//! Caption generators
//!
//! Implementations of [`CaptionGenerator`](captionhub_core::CaptionGenerator).
//! Callers use `describe`, which never fails and substitutes the fallback caption.

mod openai;

pub use openai::{OpenAiCaptionGenerator, ALT_TEXT_SYSTEM_PROMPT, ALT_TEXT_USER_PROMPT};
