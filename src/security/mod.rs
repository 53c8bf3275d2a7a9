//! Security features.
//!
//! Credential detection and scrubbing.

mod redactor;
mod secrets;

pub use redactor::{NoopScrubber, RedactionMode, RegexScrubber, SecretScrubber};
pub use secrets::{SecretDetector, SecretMatch};
