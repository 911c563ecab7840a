//! Compiled prompt patterns.

use regex::bytes::Regex;

use crate::transport::PromptPatterns;

/// Password and shell prompt regexes, compiled once per session.
#[derive(Debug, Clone)]
pub struct CompiledPrompts {
    /// Matches a password prompt anywhere in the output.
    pub password: Regex,

    /// Matches the shell prompt at the end of the output.
    pub shell: Regex,
}

impl CompiledPrompts {
    /// Compile the configured prompt patterns.
    pub fn compile(patterns: &PromptPatterns) -> Result<Self, regex::Error> {
        Ok(Self {
            password: Regex::new(&patterns.password)?,
            shell: Regex::new(&patterns.shell)?,
        })
    }
}

impl Default for CompiledPrompts {
    fn default() -> Self {
        // The built-in patterns are known to compile.
        Self::compile(&PromptPatterns::default()).expect("default prompt patterns are valid")
    }
}
