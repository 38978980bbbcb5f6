//! Skip rules for plugin and theme updates.
//!
//! A rule is either `name` (skip everywhere) or `path:name` (skip only in the
//! installation at exactly `path`). Anything with more separators is invalid.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "camelCase")]
pub enum SkipSpec {
    Global { name: String },
    Scoped { path: String, name: String },
}

/// A token with more than one separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSkipSpec {
    pub token: String,
    pub separators: usize,
}

impl fmt::Display for InvalidSkipSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" has {} '{}' separators (expected at most one)",
            self.token, self.separators, SEPARATOR
        )
    }
}

impl FromStr for SkipSpec {
    type Err = InvalidSkipSpec;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.matches(SEPARATOR).count() {
            0 => Ok(SkipSpec::Global {
                name: token.to_string(),
            }),
            1 => {
                let (path, name) = token.split_once(SEPARATOR).unwrap_or_default();
                Ok(SkipSpec::Scoped {
                    path: path.to_string(),
                    name: name.to_string(),
                })
            }
            separators => Err(InvalidSkipSpec {
                token: token.to_string(),
                separators,
            }),
        }
    }
}

impl SkipSpec {
    pub fn matches(&self, name: &str, path: &str) -> bool {
        match self {
            SkipSpec::Global { name: n } => n == name,
            SkipSpec::Scoped { path: p, name: n } => p == path && n == name,
        }
    }
}

/// Parse raw tokens, splitting them into valid rules and rejected tokens.
pub fn parse_specs<S: AsRef<str>>(tokens: &[S]) -> (Vec<SkipSpec>, Vec<InvalidSkipSpec>) {
    let mut specs = Vec::new();
    let mut rejected = Vec::new();

    for token in tokens {
        match token.as_ref().parse::<SkipSpec>() {
            Ok(spec) => specs.push(spec),
            Err(invalid) => rejected.push(invalid),
        }
    }

    (specs, rejected)
}

pub fn should_skip(specs: &[SkipSpec], name: &str, path: &str) -> bool {
    specs.iter().any(|spec| spec.matches(name, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(tokens: &[&str]) -> Vec<SkipSpec> {
        let (specs, rejected) = parse_specs(tokens);
        assert!(rejected.is_empty());
        specs
    }

    #[test]
    fn classifies_by_separator_count() {
        assert_eq!(
            "akismet".parse::<SkipSpec>().unwrap(),
            SkipSpec::Global {
                name: "akismet".to_string()
            }
        );
        assert_eq!(
            "/var/www/blog:akismet".parse::<SkipSpec>().unwrap(),
            SkipSpec::Scoped {
                path: "/var/www/blog".to_string(),
                name: "akismet".to_string()
            }
        );
        assert_eq!(
            "a:b:c".parse::<SkipSpec>().unwrap_err().separators,
            2
        );
    }

    #[test]
    fn global_rule_matches_any_path() {
        let specs = specs(&["akismet"]);
        assert!(should_skip(&specs, "akismet", "/var/www/a"));
        assert!(should_skip(&specs, "akismet", "/srv/b"));
        assert!(!should_skip(&specs, "jetpack", "/var/www/a"));
    }

    #[test]
    fn scoped_rule_does_not_leak_to_other_paths() {
        let specs = specs(&["/var/www/a:akismet"]);
        assert!(should_skip(&specs, "akismet", "/var/www/a"));
        assert!(!should_skip(&specs, "akismet", "/var/www/b"));
        assert!(!should_skip(&specs, "akismet", "/var/www/a/"));
        assert!(!should_skip(&specs, "jetpack", "/var/www/a"));
    }

    #[test]
    fn invalid_tokens_are_dropped_not_fatal() {
        let (specs, rejected) = parse_specs(&["ok", "c:/x:y", "/p:name"]);
        assert_eq!(specs.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].token, "c:/x:y");
    }

    #[test]
    fn empty_list_never_skips() {
        assert!(!should_skip(&[], "akismet", "/var/www/a"));
    }
}
