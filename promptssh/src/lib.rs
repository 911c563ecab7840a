//! # promptssh
//!
//! Prompt-driven automation of `ssh`/`scp` sessions for embedded and network
//! devices.
//!
//! promptssh spawns the system SSH client under a pseudo-terminal and drives
//! it the way `expect` does: wait for the password prompt, answer it, then
//! cycle commands against the shell prompt. This works on devices where a
//! full SSH library is unavailable or where the remote shell is unpredictable.
//!
//! ## Features
//!
//! - Login, command execution and password change over one continuous shell
//! - File copy through a separate, short-lived `scp` process
//! - Configurable prompt regexes and client command templates
//! - Typed errors per operation, each carrying the timeout/EOF cause
//! - Scoped sessions that always release the client process
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use promptssh::RemoteSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), promptssh::Error> {
//!     let mut session = RemoteSession::builder("192.168.1.1")
//!         .username("root")
//!         .password("secret")
//!         .build()?;
//!
//!     let kernel = session
//!         .scoped(async |s| s.execute("uname -r").await)
//!         .await?;
//!     println!("{}", kernel.result);
//!
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod transport;

// Re-export main types for convenience
pub use driver::{PasswordChange, RemoteSession, Response, SessionBuilder, SessionGuard};
pub use error::{ChannelError, Error, TransportError};
pub use transport::{CommandTemplate, HostKeyVerification, PromptPatterns, SessionConfig};
