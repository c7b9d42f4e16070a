// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Static prefix routing table.
//!
//! A rule matches a path when the path equals the prefix or continues it at
//! a `/` boundary, so `/todo` serves `/todo` and `/todo/items` but never
//! `/todos`. When several rules match, the longest prefix wins. Matching is
//! case-sensitive on the raw path; the only normalization is trimming one
//! trailing slash.
//!
//! Paths containing `.` or `..` segments, literal or percent-encoded, match
//! nothing. The backend URL builder resolves such segments, so the path
//! forwarded would differ from the path the rule was chosen for.

use url::Url;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    prefix: String,
    target: Url,
    requires_auth: bool,
}

impl RouteRule {
    /// Build a rule. The prefix must be absolute; the target must be an
    /// `http`/`https` base URL without query or fragment.
    pub fn new(prefix: &str, target: &str, requires_auth: bool) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Route {
            prefix: prefix.to_string(),
            reason,
        };

        if !prefix.starts_with('/') {
            return Err(invalid("prefix must start with '/'".to_string()));
        }
        if prefix.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
            return Err(invalid("prefix must be a plain path".to_string()));
        }

        let target = Url::parse(target).map_err(|e| invalid(format!("invalid target URL: {e}")))?;
        if !matches!(target.scheme(), "http" | "https") || target.host_str().is_none() {
            return Err(invalid("target must be an http(s) URL with a host".to_string()));
        }
        if target.query().is_some() || target.fragment().is_some() {
            return Err(invalid("target must not carry a query or fragment".to_string()));
        }

        Ok(Self {
            // "/" becomes the empty prefix, which matches every path.
            prefix: prefix.trim_end_matches('/').to_string(),
            target,
            requires_auth,
        })
    }

    pub fn prefix(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Backend URL for an inbound path: the target's base path followed by
    /// the full original path and query.
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.target.clone();
        let joined = format!("{}{}", self.target.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url.set_query(query);
        url
    }
}

/// Ordered, immutable set of route rules.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            return Err(ConfigError::Invalid {
                name: "routes",
                reason: "at least one route is required".to_string(),
            });
        }
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|earlier| earlier.prefix == rule.prefix) {
                return Err(ConfigError::Route {
                    prefix: rule.prefix().to_string(),
                    reason: "duplicate prefix".to_string(),
                });
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Resolve the rule serving `path`, if any.
    pub fn match_path(&self, path: &str) -> Option<&RouteRule> {
        if has_dot_segment(path) {
            return None;
        }
        let path = trim_trailing_slash(path);
        let mut best: Option<&RouteRule> = None;
        for rule in self.rules.iter().filter(|rule| rule.matches(path)) {
            if best.map_or(true, |current| rule.prefix.len() > current.prefix.len()) {
                best = Some(rule);
            }
        }
        best
    }
}

/// True when any segment is `.` or `..`, including `%2e` forms in any case.
/// Backslashes count as separators, as they do for http URLs.
pub fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}
