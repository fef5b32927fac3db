//! Prefix configuration resolution
//!
//! Turns the user-supplied branch pattern and message template into the
//! compiled matchers used when tagging messages:
//! - `prefix_pattern` pulls the issue id out of a branch name
//! - `outdated_prefix_pattern` recognizes a message that was already rendered
//!   with some earlier prefix, so it can be unwrapped before re-rendering

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{PrefixError, Result};

/// Placeholder replaced by the extracted issue id
pub const PREFIX_PLACEHOLDER: &str = "${prefix}";

/// Placeholder replaced by the user's message text
pub const MESSAGE_PLACEHOLDER: &str = "${message}";

/// Innermost parenthesized group in a pattern's source text
static GROUP_SOURCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(([^()]*)\)").expect("Invalid regex pattern for capture group detection")
});

/// Capture group name holding the message inside an outdated prefix match
const MESSAGE_GROUP: &str = "message";

/// Compiled prefix configuration
///
/// Immutable once built. A settings change produces a new value that replaces
/// the old one wholesale.
#[derive(Debug, Clone)]
pub struct PrefixConfig {
    prefix_pattern: Regex,
    message_format: String,
    outdated_prefix_pattern: Regex,
}

impl PrefixConfig {
    /// Compile a configuration from the raw branch pattern and message template
    pub fn resolve(raw_prefix_pattern: &str, raw_message_format: &str) -> Result<Self> {
        let prefix_pattern =
            Regex::new(raw_prefix_pattern).map_err(|source| PrefixError::InvalidPattern {
                field: "prefix-pattern",
                source,
            })?;

        let group = capture_group_source(raw_prefix_pattern);
        let outdated = outdated_pattern_source(group, raw_message_format);

        let outdated_prefix_pattern =
            Regex::new(&outdated).map_err(|source| PrefixError::InvalidPattern {
                field: "message-format",
                source,
            })?;

        Ok(Self {
            prefix_pattern,
            message_format: raw_message_format.to_string(),
            outdated_prefix_pattern,
        })
    }

    /// Pattern matched against branch names
    pub fn prefix_pattern(&self) -> &Regex {
        &self.prefix_pattern
    }

    /// Template for the final message
    pub fn message_format(&self) -> &str {
        &self.message_format
    }

    /// Derived pattern matching a message rendered with any earlier prefix
    pub fn outdated_prefix_pattern(&self) -> &Regex {
        &self.outdated_prefix_pattern
    }

    /// Extract the issue id from a branch name
    ///
    /// Returns `None` for an empty branch, a branch the pattern does not match,
    /// or a match whose first group is missing or empty.
    pub fn extract_prefix<'b>(&self, branch: &'b str) -> Option<&'b str> {
        if branch.is_empty() {
            return None;
        }

        self.prefix_pattern
            .captures(branch)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|prefix| !prefix.is_empty())
    }

    /// Remove an outdated prefix, returning the inner message as-is
    ///
    /// Messages the outdated pattern does not recognize are returned unchanged.
    pub fn strip_outdated<'m>(&self, message: &'m str) -> &'m str {
        self.outdated_prefix_pattern
            .captures(message)
            .and_then(|caps| caps.name(MESSAGE_GROUP))
            .map(|m| m.as_str())
            .unwrap_or(message)
    }

    /// Render the message template
    pub fn render(&self, prefix: &str, message: &str) -> String {
        self.message_format
            .replace(PREFIX_PLACEHOLDER, prefix)
            .replace(MESSAGE_PLACEHOLDER, message)
    }
}

/// Source text of the first capturing group, or the whole pattern if there is none
fn capture_group_source(pattern: &str) -> &str {
    GROUP_SOURCE
        .captures_iter(pattern)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find_map(strip_group_flags)
        .unwrap_or(pattern)
}

/// Drop group syntax prefixes; `None` for groups that don't capture
fn strip_group_flags(inner: &str) -> Option<&str> {
    let Some(rest) = inner.strip_prefix('?') else {
        return Some(inner);
    };

    // Named groups capture: (?P<id>...) and (?<id>...)
    let named = rest.strip_prefix("P<").or_else(|| rest.strip_prefix('<'))?;
    named.split_once('>').map(|(_, body)| body)
}

/// Build the outdated-prefix pattern source from a template
///
/// The literal parts of the template are escaped while the placeholders are
/// swapped for the group text and a message capture. The message may span
/// several lines, so `.` matches newlines too.
fn outdated_pattern_source(group: &str, message_format: &str) -> String {
    let escaped_prefix = regex::escape(PREFIX_PLACEHOLDER);
    let escaped_message = regex::escape(MESSAGE_PLACEHOLDER);

    let body = regex::escape(message_format)
        .replacen(
            &escaped_message,
            &format!("(?P<{}>.*)", MESSAGE_GROUP),
            1,
        )
        .replace(&escaped_message, ".*")
        .replace(&escaped_prefix, &format!("(?:{})", group));

    format!("(?s)^{}$", body)
}
