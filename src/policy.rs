//! Per-request policy built from the configured template.
//!
//! Tokens may embed `{nonce}`, replaced by the request nonce when the policy
//! is rendered. Tokens under `development` are appended to the directive of
//! the same wire name only when the server runs in development mode.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::csp::{self, CspError, DirectiveValue, Directives, names};
use crate::nonce::Nonce;

pub const NONCE_PLACEHOLDER: &str = "{nonce}";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PolicyTemplate {
    pub directives: IndexMap<String, DirectiveValue>,
    pub development: IndexMap<String, Vec<String>>,
}

impl Default for PolicyTemplate {
    fn default() -> Self {
        let nonce = Nonce::from_token(NONCE_PLACEHOLDER).source();
        let directives = [
            ("baseUri", vec![names::SELF.to_string()]),
            ("objectSrc", vec![names::NONE.to_string()]),
            ("connectSrc", vec![names::SELF.to_string()]),
            ("scriptSrc", vec![names::SELF.to_string(), nonce.clone()]),
            ("workerSrc", vec![names::SELF.to_string()]),
            ("scriptSrcAttr", vec![nonce]),
            (
                "imgSrc",
                ["'self'", "data:", "blob:", "https:"].map(String::from).to_vec(),
            ),
            (
                "fontSrc",
                vec![names::SELF.to_string(), "https://fonts.gstatic.com".to_string()],
            ),
            ("frameSrc", vec![names::SELF.to_string()]),
            ("formAction", vec![names::SELF.to_string()]),
        ]
        .into_iter()
        .map(|(name, tokens)| (name.to_string(), DirectiveValue::from(tokens)))
        .collect();

        let development = [
            ("connectSrc", vec!["ws:".to_string()]),
            ("workerSrc", vec!["blob:".to_string()]),
        ]
        .into_iter()
        .map(|(name, tokens)| (name.to_string(), tokens))
        .collect();

        Self {
            directives,
            development,
        }
    }
}

fn fill(token: &str, nonce: &Nonce) -> String {
    token.replace(NONCE_PLACEHOLDER, nonce.as_str())
}

fn fill_value(value: &DirectiveValue, nonce: &Nonce) -> DirectiveValue {
    match value {
        DirectiveValue::Single(v) => DirectiveValue::Single(fill(v, nonce)),
        DirectiveValue::List(tokens) => DirectiveValue::List(
            tokens
                .iter()
                .map(|t| t.as_deref().map(|t| fill(t, nonce)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn append_tokens(value: DirectiveValue, extra: Vec<Option<String>>) -> DirectiveValue {
    match value {
        DirectiveValue::Flag => DirectiveValue::Flag,
        DirectiveValue::Absent => DirectiveValue::List(extra),
        DirectiveValue::Single(v) => {
            let mut tokens = vec![Some(v)];
            tokens.extend(extra);
            DirectiveValue::List(tokens)
        }
        DirectiveValue::List(mut tokens) => {
            tokens.extend(extra);
            DirectiveValue::List(tokens)
        }
    }
}

impl PolicyTemplate {
    /// Development tokens keyed by wire name, in file order.
    ///
    /// Two entries with the same wire name, or tokens for a flag directive,
    /// are configuration errors whether or not development mode is on.
    fn development_tokens(&self, nonce: &Nonce) -> Result<IndexMap<String, Vec<Option<String>>>, CspError> {
        let mut extras = IndexMap::with_capacity(self.development.len());
        for (name, tokens) in &self.development {
            let wire = csp::wire_name(name);
            let is_flag = self
                .directives
                .iter()
                .any(|(base, value)| *value == DirectiveValue::Flag && csp::wire_name(base) == wire);
            if is_flag {
                return Err(CspError::TokensOnFlag { name: name.clone() });
            }
            let tokens = tokens.iter().map(|t| Some(fill(t, nonce))).collect();
            if extras.insert(wire, tokens).is_some() {
                return Err(CspError::DuplicateDirective { name: name.clone() });
            }
        }
        Ok(extras)
    }

    /// Directives for one response.
    ///
    /// Development tokens whose directive is missing from the template are
    /// added as new directives after the configured ones.
    pub fn render(&self, nonce: &Nonce, development: bool) -> Result<Directives, CspError> {
        let mut extras = self.development_tokens(nonce)?;
        if !development {
            extras.clear();
        }

        let mut directives: Directives = self
            .directives
            .iter()
            .map(|(name, value)| {
                let value = fill_value(value, nonce);
                let value = match extras.shift_remove(&csp::wire_name(name)) {
                    Some(extra) => append_tokens(value, extra),
                    None => value,
                };
                (name.clone(), value)
            })
            .collect();

        directives.extend(extras.into_iter().map(|(name, tokens)| (name, DirectiveValue::List(tokens))));
        Ok(directives)
    }

    pub fn header_value(&self, nonce: &Nonce, development: bool) -> Result<String, CspError> {
        self.render(nonce, development)?.build()
    }

    /// Builds the template once with a placeholder nonce, so configuration errors
    /// surface at startup rather than on every response.
    pub fn validate(&self, development: bool) -> Result<String, CspError> {
        for name in self.directives.keys().chain(self.development.keys()) {
            let wire = csp::wire_name(name);
            if !names::is_known(&wire) {
                tracing::warn!(directive = %name, wire_name = %wire, "unknown CSP directive");
            }
        }
        let header = self.header_value(&Nonce::from_token("0".repeat(32)), development)?;
        tracing::debug!(policy = %header, development, "CSP template validated");
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_matches_production_policy() {
        let header = PolicyTemplate::default()
            .header_value(&Nonce::from_token("abc123"), false)
            .unwrap();
        assert_eq!(
            header,
            "base-uri 'self'; object-src 'none'; connect-src 'self'; \
             script-src 'self' 'nonce-abc123'; worker-src 'self'; \
             script-src-attr 'nonce-abc123'; img-src 'self' data: blob: https:; \
             font-src 'self' https://fonts.gstatic.com; frame-src 'self'; form-action 'self'"
        );
    }

    #[test]
    fn development_tokens_are_appended_in_place() {
        let header = PolicyTemplate::default()
            .header_value(&Nonce::from_token("abc123"), true)
            .unwrap();
        assert!(header.contains("connect-src 'self' ws:; script-src"));
        assert!(header.contains("worker-src 'self' blob:; script-src-attr"));
    }

    #[test]
    fn unmatched_development_tokens_become_new_directives() {
        let mut template = PolicyTemplate {
            directives: IndexMap::new(),
            development: IndexMap::new(),
        };
        template
            .directives
            .insert("defaultSrc".to_string(), DirectiveValue::from(["'self'"]));
        template
            .development
            .insert("connect-src".to_string(), vec!["ws:".to_string()]);

        let nonce = Nonce::from_token("n");
        assert_eq!(template.header_value(&nonce, false).unwrap(), "default-src 'self'");
        assert_eq!(
            template.header_value(&nonce, true).unwrap(),
            "default-src 'self'; connect-src ws:"
        );
    }

    #[test]
    fn placeholder_is_filled_in_single_values() {
        let mut template = PolicyTemplate::default();
        template.directives.clear();
        template
            .directives
            .insert("styleSrc".to_string(), DirectiveValue::from("'nonce-{nonce}'"));
        let header = template.header_value(&Nonce::from_token("ff00"), false).unwrap();
        assert_eq!(header, "style-src 'nonce-ff00'");
    }

    #[test]
    fn validate_reports_duplicates() {
        let mut template = PolicyTemplate::default();
        template
            .directives
            .insert("script-src".to_string(), DirectiveValue::from("'none'"));
        assert!(matches!(
            template.validate(false),
            Err(CspError::DuplicateDirective { .. })
        ));
    }

    fn template_with_development(entries: &[(&str, &str)]) -> PolicyTemplate {
        let mut template = PolicyTemplate {
            directives: IndexMap::new(),
            development: IndexMap::new(),
        };
        template
            .directives
            .insert("connectSrc".to_string(), DirectiveValue::from(["'self'"]));
        for (name, token) in entries {
            template
                .development
                .insert(name.to_string(), vec![token.to_string()]);
        }
        template
    }

    #[test]
    fn development_entries_colliding_on_wire_name_are_rejected() {
        let template = template_with_development(&[("connectSrc", "ws:"), ("connect-src", "blob:")]);
        let expected = Err(CspError::DuplicateDirective {
            name: "connect-src".to_string(),
        });
        assert_eq!(template.validate(true), expected);
        // rejected even when the tokens would not be used
        assert_eq!(template.validate(false), expected);
    }

    #[test]
    fn development_tokens_on_a_flag_are_rejected() {
        let mut template = template_with_development(&[("upgradeInsecureRequests", "ws:")]);
        template
            .directives
            .insert("upgradeInsecureRequests".to_string(), DirectiveValue::Flag);
        assert_eq!(
            template.header_value(&Nonce::from_token("n"), true),
            Err(CspError::TokensOnFlag {
                name: "upgradeInsecureRequests".to_string()
            })
        );
    }
}
