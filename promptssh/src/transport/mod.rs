//! Transport layer: configuration and client process spawning.
//!
//! promptssh does not implement SSH itself. It runs the system `ssh` and
//! `scp` clients (or any command configured in their place) under a
//! pseudo-terminal and talks to them the way a user at a keyboard would.

pub mod config;
pub mod process;

pub use config::{
    CommandTemplate, HostKeyVerification, PromptPatterns, RenderedCommand, SessionConfig,
    TemplateVars,
};
pub use process::{ProcessHandle, SpawnedClient};
