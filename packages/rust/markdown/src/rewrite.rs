//! Ordered text rewriting.
//!
//! Each component describes its edits as a list of [`Rule`]s applied in
//! sequence; every rule sees the output of the rules before it.

use std::borrow::Cow;

use regex::{NoExpand, Regex};

use sitesync_shared::{Result, SiteSyncError};

/// How many matches a rule replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Scope {
    /// Every non-overlapping match.
    #[default]
    All,
    /// Only the first match in the text.
    First,
}

/// A single `(pattern, replacement)` substitution.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    replacement: String,
    literal: bool,
    scope: Scope,
}

impl Rule {
    /// Compile `pattern`. The replacement may reference capture groups (`${1}`).
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            SiteSyncError::validation(format!("invalid rewrite pattern `{pattern}`: {e}"))
        })?;
        Ok(Self::from_regex(regex, replacement))
    }

    /// Build a rule from an already compiled regex.
    pub fn from_regex(pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
            literal: false,
            scope: Scope::All,
        }
    }

    /// Insert the replacement verbatim; `$` is not treated as a group reference.
    pub fn literal(mut self) -> Self {
        self.literal = true;
        self
    }

    /// Replace only the first match.
    pub fn first_only(mut self) -> Self {
        self.scope = Scope::First;
        self
    }

    /// Apply this rule to `text`.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let limit = match self.scope {
            Scope::All => 0,
            Scope::First => 1,
        };

        if self.literal {
            self.pattern
                .replacen(text, limit, NoExpand(&self.replacement))
        } else {
            self.pattern
                .replacen(text, limit, self.replacement.as_str())
        }
    }
}

/// Apply `rules` left to right over the full text.
pub fn rewrite(content: &str, rules: &[Rule]) -> String {
    let mut result = content.to_string();

    for rule in rules {
        if let Cow::Owned(changed) = rule.apply(&result) {
            result = changed;
        }
    }

    result
}

/// Prefix `content` with `header`.
pub fn prepend_header(content: &str, header: &str) -> String {
    let mut page = String::with_capacity(header.len() + content.len());
    page.push_str(header);
    page.push_str(content);
    page
}
