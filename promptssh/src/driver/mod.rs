//! High-level session API.
//!
//! The driver layer turns the channel's send/expect primitives into the
//! session operations: login, command execution, file copy and password
//! change.

mod builder;
mod response;
mod session;

pub use builder::SessionBuilder;
pub use response::{PasswordChange, Response, normalize_output, split_prompt_line};
pub use session::{RemoteSession, SessionGuard};
