//! Result types for session operations.

use std::time::Duration;

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output (normalized - command echo and trailing line breaks removed).
    pub result: String,

    /// The raw output before normalization, up to but excluding the prompt.
    pub raw_result: String,

    /// The prompt text that was matched at the end.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl Response {
    /// Create a response, normalizing `raw_result` into `result`.
    pub fn new(
        command: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let command = command.into();
        let raw_result = raw_result.into();
        Self {
            result: normalize_output(&raw_result, &command),
            command,
            raw_result,
            prompt: prompt.into(),
            elapsed,
        }
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Outcome of [`RemoteSession::set_password`](crate::RemoteSession::set_password).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    /// How many password prompts were answered with the new password.
    pub prompts_answered: usize,

    /// Whether the shell prompt came back within the round limit.
    pub completed: bool,

    /// Text the remote printed around the prompts (normalized).
    pub output: String,
}

/// Clean up text captured before a shell prompt.
///
/// Carriage returns are dropped, the terminal's echo of `command` is removed
/// when it is the first line, and trailing line breaks are trimmed.
pub fn normalize_output(raw: &str, command: &str) -> String {
    let text = raw.replace('\r', "");
    let command = command.trim();

    let body = match text.split_once('\n') {
        Some((first, rest)) if first.trim_end() == command => rest,
        None if text.trim_end() == command => "",
        _ => text.as_str(),
    };

    body.trim_end_matches('\n').to_string()
}

/// Split text captured before a shell prompt into the command output and the
/// start of the prompt line.
///
/// The prompt pattern usually matches only the tail of the prompt (`# `), so
/// whatever follows the last line break (`root@dev:~`) belongs to the prompt.
pub fn split_prompt_line(before: &str) -> (&str, &str) {
    match before.rfind('\n') {
        Some(pos) => before.split_at(pos + 1),
        None => ("", before),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_echo() {
        assert_eq!(normalize_output("echo hi\r\nhi\r\n", "echo hi"), "hi");
        assert_eq!(normalize_output("echo hi\nhi\n", "echo hi"), "hi");
    }

    #[test]
    fn test_normalize_without_echo() {
        assert_eq!(normalize_output("hi\n", "echo hi"), "hi");
        assert_eq!(normalize_output("a\nb\n\n", "ls"), "a\nb");
    }

    #[test]
    fn test_normalize_echo_only() {
        assert_eq!(normalize_output("cd /tmp\r\n", "cd /tmp"), "");
        assert_eq!(normalize_output("cd /tmp", "cd /tmp"), "");
    }

    #[test]
    fn test_normalize_keeps_inner_blank_lines() {
        assert_eq!(
            normalize_output("cat f\nline1\n\nline3\n", "cat f"),
            "line1\n\nline3"
        );
    }

    #[test]
    fn test_split_prompt_line() {
        assert_eq!(
            split_prompt_line("echo hi\r\nhi\r\nroot@dev:~"),
            ("echo hi\r\nhi\r\n", "root@dev:~")
        );
        assert_eq!(split_prompt_line("hi\n"), ("hi\n", ""));
        assert_eq!(split_prompt_line("router"), ("", "router"));
    }

    #[test]
    fn test_response_new() {
        let response = Response::new("uname", "uname\r\nLinux\r\n", "# ", Duration::from_millis(5));
        assert_eq!(response.result, "Linux");
        assert_eq!(response.raw_result, "uname\r\nLinux\r\n");
        assert_eq!(response.to_string(), "Linux");
        assert!(response.contains("Lin"));
        assert_eq!(response.lines().count(), 1);
    }
}
