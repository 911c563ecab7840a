//! Session configuration: target, credentials, prompts and client commands.

use std::fmt;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::channel::PtyConfig;

/// Host key verification mode, passed to the client as `StrictHostKeyChecking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys (`yes`).
    Strict,

    /// Accept and remember unknown keys, reject changed keys (`accept-new`).
    AcceptNew,

    /// Accept any key without prompting (`no`). Convenient for lab devices
    /// that are re-imaged often, and the default.
    #[default]
    Disabled,
}

impl HostKeyVerification {
    /// The value OpenSSH expects for `-oStrictHostKeyChecking=`.
    pub fn as_option_value(&self) -> &'static str {
        match self {
            HostKeyVerification::Strict => "yes",
            HostKeyVerification::AcceptNew => "accept-new",
            HostKeyVerification::Disabled => "no",
        }
    }
}

/// Values substituted into a [`CommandTemplate`].
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub host: &'a str,
    pub port: u16,
    pub username: &'a str,
    pub host_key_checking: &'a str,
    pub local_file: Option<&'a str>,
    pub remote_dir: Option<&'a str>,
}

/// A client command line with `{placeholder}` substitution.
///
/// Supported placeholders: `{host}`, `{port}`, `{username}`,
/// `{host_key_checking}`, `{local_file}` and `{remote_dir}`. Each argument is
/// rendered on its own and handed to the PTY as-is, no shell is involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    /// Program to spawn.
    pub program: String,

    /// Argument templates.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    /// Create a template from a program and its argument templates.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `ssh -p {port} -oStrictHostKeyChecking={host_key_checking} {username}@{host}`
    pub fn ssh_login() -> Self {
        Self::new(
            "ssh",
            [
                "-p",
                "{port}",
                "-oStrictHostKeyChecking={host_key_checking}",
                "{username}@{host}",
            ],
        )
    }

    /// `scp -P {port} -oStrictHostKeyChecking={host_key_checking} {local_file} {username}@{host}:{remote_dir}`
    pub fn scp_copy() -> Self {
        Self::new(
            "scp",
            [
                "-P",
                "{port}",
                "-oStrictHostKeyChecking={host_key_checking}",
                "{local_file}",
                "{username}@{host}:{remote_dir}",
            ],
        )
    }

    /// Render the program and arguments with the given values.
    pub fn render(&self, vars: &TemplateVars<'_>) -> RenderedCommand {
        RenderedCommand {
            program: render_arg(&self.program, vars),
            args: self.args.iter().map(|arg| render_arg(arg, vars)).collect(),
        }
    }
}

fn render_arg(template: &str, vars: &TemplateVars<'_>) -> String {
    let mut out = template
        .replace("{host}", vars.host)
        .replace("{port}", &vars.port.to_string())
        .replace("{username}", vars.username)
        .replace("{host_key_checking}", vars.host_key_checking);

    if let Some(local_file) = vars.local_file {
        out = out.replace("{local_file}", local_file);
    }
    if let Some(remote_dir) = vars.remote_dir {
        out = out.replace("{remote_dir}", remote_dir);
    }
    out
}

/// A fully rendered command ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for RenderedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Regular expressions used to recognise the remote side's prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPatterns {
    /// Password prompt, matched anywhere in the output.
    pub password: String,

    /// Shell prompt, matched at the end of the output.
    pub shell: String,
}

impl Default for PromptPatterns {
    fn default() -> Self {
        Self {
            password: r"(?i)password:".to_string(),
            shell: r"[#$] $".to_string(),
        }
    }
}

/// Complete configuration for a [`RemoteSession`](crate::RemoteSession).
///
/// Built through [`SessionBuilder`](crate::SessionBuilder) and immutable
/// afterwards.
#[derive(Debug)]
pub struct SessionConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Login username (default: `root`).
    pub username: String,

    /// Password sent at the password prompt.
    pub password: SecretString,

    /// Per-expect timeout for interactive operations (default: 5s).
    pub timeout: Duration,

    /// Password and shell prompt patterns.
    pub prompts: PromptPatterns,

    /// Command spawned by `login()`.
    pub login_command: CommandTemplate,

    /// Command spawned by `copy_file()`.
    pub copy_command: CommandTemplate,

    /// Command line sent by `set_password()`.
    pub password_command: String,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// PTY settings for spawned clients.
    pub pty: PtyConfig,
}

impl SessionConfig {
    /// Template values for this configuration.
    pub fn template_vars(&self) -> TemplateVars<'_> {
        TemplateVars {
            host: &self.host,
            port: self.port,
            username: &self.username,
            host_key_checking: self.host_key_verification.as_option_value(),
            local_file: None,
            remote_dir: None,
        }
    }

    /// `username@host:port`, for log messages.
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars<'static> {
        TemplateVars {
            host: "10.0.0.1",
            port: 2222,
            username: "admin",
            host_key_checking: "no",
            local_file: None,
            remote_dir: None,
        }
    }

    #[test]
    fn test_ssh_login_template() {
        let cmd = CommandTemplate::ssh_login().render(&vars());
        assert_eq!(cmd.program, "ssh");
        assert_eq!(
            cmd.args,
            vec!["-p", "2222", "-oStrictHostKeyChecking=no", "admin@10.0.0.1"]
        );
        assert_eq!(
            cmd.to_string(),
            "ssh -p 2222 -oStrictHostKeyChecking=no admin@10.0.0.1"
        );
    }

    #[test]
    fn test_scp_copy_template() {
        let vars = TemplateVars {
            local_file: Some("/tmp/fw.bin"),
            remote_dir: Some("/data"),
            ..vars()
        };
        let cmd = CommandTemplate::scp_copy().render(&vars);
        assert_eq!(
            cmd.to_string(),
            "scp -P 2222 -oStrictHostKeyChecking=no /tmp/fw.bin admin@10.0.0.1:/data"
        );
    }

    #[test]
    fn test_file_with_spaces_stays_one_argument() {
        let vars = TemplateVars {
            local_file: Some("/tmp/my file.bin"),
            remote_dir: Some("/data"),
            ..vars()
        };
        let cmd = CommandTemplate::scp_copy().render(&vars);
        assert_eq!(cmd.args[3], "/tmp/my file.bin");
        assert_eq!(cmd.args.len(), 5);
    }

    #[test]
    fn test_host_key_verification_values() {
        assert_eq!(HostKeyVerification::default().as_option_value(), "no");
        assert_eq!(HostKeyVerification::Strict.as_option_value(), "yes");
        assert_eq!(HostKeyVerification::AcceptNew.as_option_value(), "accept-new");
    }

    #[test]
    fn test_template_from_json() {
        let json = r#"{"program": "sshpass", "args": ["-e", "ssh", "{username}@{host}"]}"#;
        let template: CommandTemplate = serde_json::from_str(json).unwrap();
        let cmd = template.render(&vars());
        assert_eq!(cmd.args, vec!["-e", "ssh", "admin@10.0.0.1"]);

        let json = r#"{"password": "(?i)passcode:", "shell": "> $"}"#;
        let prompts: PromptPatterns = serde_json::from_str(json).unwrap();
        assert_eq!(prompts.shell, "> $");
    }
}
