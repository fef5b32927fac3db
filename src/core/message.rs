//! Commit message tagging
//!
//! Pure functions that apply the branch prefix to a message, plus the
//! `MessageFile` view used to treat a commit message file as a single-line
//! buffer.

use crate::core::pattern::PrefixConfig;

/// Compute the tagged message for a branch
///
/// The message is returned unchanged when the branch is empty, does not match
/// the prefix pattern, or yields no issue id, and when it is already tagged
/// with `[<prefix>] `.
pub fn compute_message(branch: &str, current: &str, config: &PrefixConfig) -> String {
    let Some(prefix) = config.extract_prefix(branch) else {
        return current.to_string();
    };

    if is_tagged(current, prefix) {
        return current.to_string();
    }

    let original = extract_original_message(current, config);
    config.render(prefix, &original)
}

/// Recover the untagged message text under the given configuration
pub fn extract_original_message(current: &str, config: &PrefixConfig) -> String {
    config.strip_outdated(current).trim().to_string()
}

/// Whether the message already starts with the bracketed prefix
fn is_tagged(message: &str, prefix: &str) -> bool {
    message
        .strip_prefix('[')
        .and_then(|rest| rest.strip_prefix(prefix))
        .is_some_and(|rest| rest.starts_with("] "))
}

/// A commit message file split into its subject line and everything after it
///
/// Git's message files may carry a body and `#` comment lines. Only the
/// subject is tagged; the rest is kept byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFile {
    /// First line of the message, without its line ending
    pub subject: String,
    /// Everything after the subject, including the leading newline
    rest: String,
}

impl MessageFile {
    /// Split file contents into subject and remainder
    ///
    /// The first line is always the subject, even when it starts with `#`.
    pub fn parse(contents: &str) -> Self {
        let line = contents.split('\n').next().unwrap_or_default();
        let subject = line.trim_end_matches('\r');

        Self {
            subject: subject.to_string(),
            rest: contents[subject.len()..].to_string(),
        }
    }

    /// Split a file git is about to open in the editor
    ///
    /// Git strips `#` lines after editing, so a file that opens with one has
    /// no subject yet and a new first line is inserted on write.
    pub fn parse_for_editor(contents: &str) -> Self {
        if contents.starts_with('#') {
            return Self {
                subject: String::new(),
                rest: format!("\n{}", contents),
            };
        }

        Self::parse(contents)
    }

    /// Reassemble the file contents
    pub fn render(&self) -> String {
        format!("{}{}", self.subject, self.rest)
    }

    /// Replace the subject line, keeping everything else
    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }
}
