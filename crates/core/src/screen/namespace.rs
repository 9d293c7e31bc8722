//! Module namespaces and screen-name helpers.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigurationError;

static NAMESPACE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("valid namespace regex"));

static SCREEN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_][-a-zA-Z0-9_.]+$").expect("valid screen name regex"));

/// Namespaces registered per Rust module path.
#[derive(Debug, Default, Clone)]
pub(crate) struct Namespaces {
    by_module: HashMap<String, String>,
}

impl Namespaces {
    /// Register `name` for `module`. A leading `.` makes it relative to the
    /// namespace of the nearest registered ancestor module.
    pub(crate) fn register(&mut self, module: &str, name: &str) -> Result<String, ConfigurationError> {
        if module.is_empty() {
            return Err(ConfigurationError::Namespace(
                "module path must not be empty".to_string(),
            ));
        }

        let resolved = match name.strip_prefix('.') {
            Some(relative) => {
                let parent = parent_module(module).and_then(|parent| self.lookup(parent));
                match parent {
                    Some(parent) => format!("{parent}.{relative}"),
                    None => {
                        return Err(ConfigurationError::Namespace(format!(
                            "relative namespace '{name}' in {module} has no registered ancestor"
                        )))
                    }
                }
            }
            None => name.to_string(),
        };

        if !is_valid_namespace(&resolved) {
            return Err(ConfigurationError::Namespace(format!(
                "invalid namespace name '{resolved}'"
            )));
        }

        match self.by_module.get(module) {
            Some(existing) if *existing != resolved => Err(ConfigurationError::Namespace(format!(
                "module {module} already uses namespace '{existing}'"
            ))),
            Some(_) => Ok(resolved),
            None => {
                self.by_module.insert(module.to_string(), resolved.clone());
                Ok(resolved)
            }
        }
    }

    /// Namespace of `module` or of its nearest registered ancestor.
    pub(crate) fn lookup(&self, module: &str) -> Option<&str> {
        let mut current = Some(module);
        while let Some(path) = current {
            if let Some(name) = self.by_module.get(path) {
                return Some(name);
            }
            current = parent_module(path);
        }
        None
    }
}

fn parent_module(module: &str) -> Option<&str> {
    module.rsplit_once("::").map(|(parent, _)| parent)
}

/// Dot separated identifiers.
pub fn is_valid_namespace(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(|part| NAMESPACE_SEGMENT.is_match(part))
}

/// Check a fully expanded screen name.
pub fn validate_screen_name(name: &str) -> Result<(), ConfigurationError> {
    if SCREEN_NAME.is_match(name) && !name.ends_with('.') && !name.contains("..") {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidScreenName {
            name: name.to_string(),
            reason: "expected letters, digits, '_', '-' or '.'".to_string(),
        })
    }
}

/// Expand a `.`-relative name against `namespace`.
pub fn expand_name(name: &str, namespace: Option<&str>) -> Option<String> {
    match name.strip_prefix('.') {
        Some(relative) => namespace.map(|ns| format!("{ns}.{relative}")),
        None => Some(name.to_string()),
    }
}

/// Namespace part of a fully qualified screen name.
pub fn namespace_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(namespace, _)| namespace)
}

/// `SendMoneyScreen` -> `send_money_screen`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(prev) if prev.is_lowercase() || prev.is_ascii_digit() => true,
                Some(prev) if prev.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(*ch);
        }
    }
    out
}

/// `send_money` -> `Send Money`.
pub fn start_case(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Last path segment of a type name, without generics.
pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_namespaces_use_nearest_ancestor() {
        let mut namespaces = Namespaces::default();
        assert_eq!(namespaces.register("bank", "bank").unwrap(), "bank");
        assert_eq!(
            namespaces.register("bank::loans::screens", ".loans").unwrap(),
            "bank.loans"
        );
        assert_eq!(namespaces.lookup("bank::loans::screens::apply"), Some("bank.loans"));
        assert_eq!(namespaces.lookup("bank::cards"), Some("bank"));
        assert_eq!(namespaces.lookup("other"), None);

        assert!(namespaces.register("orphan::child", ".x").is_err());
        assert!(namespaces.register("bank", "bank").is_ok());
        assert!(namespaces.register("bank", "other").is_err());
        assert!(namespaces.register("bad", "1bad").is_err());
    }

    #[test]
    fn screen_names_are_validated() {
        for ok in ["home", "bank.a", "bank.send-money", "a1", "_x.y"] {
            assert!(validate_screen_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "h", ".", ".home", "a b", "home.", "a..b", "-x"] {
            assert!(validate_screen_name(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn names_expand_and_split() {
        assert_eq!(expand_name(".home", Some("bank")), Some("bank.home".into()));
        assert_eq!(expand_name(".home", None), None);
        assert_eq!(expand_name("other.home", Some("bank")), Some("other.home".into()));
        assert_eq!(namespace_of("bank.loans.apply"), Some("bank.loans"));
        assert_eq!(namespace_of("home"), None);
    }

    #[test]
    fn case_conversions() {
        assert_eq!(snake_case("SendMoneyScreen"), "send_money_screen");
        assert_eq!(snake_case("PINEntry"), "pin_entry");
        assert_eq!(snake_case("Home"), "home");
        assert_eq!(start_case("send_money"), "Send Money");
        assert_eq!(short_type_name("my_app::screens::Home"), "Home");
        assert_eq!(short_type_name("my_app::Wrap<my_app::Inner>"), "Wrap");
    }
}
