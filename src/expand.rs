use crate::vars::VarStore;
use anyhow::{Context, Result};
use regex::{Captures, Regex, RegexBuilder};
use std::borrow::Cow;

const VARIABLE_PATTERN: &str = r"\$([A-Za-z0-9_]+)";

/// Substitutes `$NAME` references with values from a [`VarStore`].
///
/// A name is the longest run of ASCII letters, digits and underscores after
/// the `$`. Unset variables expand to the empty string; a `$` that is not
/// followed by a name character is kept as is.
#[derive(Debug, Clone)]
pub struct Expander {
    re: Regex,
}

impl Expander {
    pub fn new() -> Result<Self> {
        let re = RegexBuilder::new(VARIABLE_PATTERN)
            .build()
            .with_context(|| format!("Invalid variable pattern: {}", VARIABLE_PATTERN))?;
        Ok(Self { re })
    }

    /// Expand every variable reference in `token`.
    pub fn expand<'a>(&self, token: &'a str, vars: &VarStore) -> Cow<'a, str> {
        self.re.replace_all(token, |caps: &Captures| {
            vars.get(&caps[1]).unwrap_or_default().to_string()
        })
    }

    /// Expand every token of a command, in place.
    pub fn expand_all(&self, tokens: &mut [String], vars: &VarStore) {
        for token in tokens.iter_mut() {
            if let Cow::Owned(expanded) = self.expand(token, vars) {
                *token = expanded;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> VarStore {
        let mut vars = VarStore::new();
        for (k, v) in pairs {
            vars.set(*k, *v);
        }
        vars
    }

    #[test]
    fn test_bound_variable() {
        let ex = Expander::new().unwrap();
        let vars = vars(&[("NAME", "value")]);
        assert_eq!(ex.expand("$NAME", &vars), "value");
        assert_eq!(ex.expand("pre-$NAME-post", &vars), "pre-value-post");
    }

    #[test]
    fn test_unbound_variable_is_empty() {
        let ex = Expander::new().unwrap();
        assert_eq!(ex.expand("$NOPE", &VarStore::new()), "");
        assert_eq!(ex.expand("a$NOPE.b", &VarStore::new()), "a.b");
    }

    #[test]
    fn test_adjacent_references() {
        let ex = Expander::new().unwrap();
        let vars = vars(&[("A", "1"), ("B", "2")]);
        assert_eq!(ex.expand("$A$B", &vars), "12");
    }

    #[test]
    fn test_name_is_maximal_run() {
        let ex = Expander::new().unwrap();
        let vars = vars(&[("A", "1"), ("A_B", "long")]);
        assert_eq!(ex.expand("$A_B", &vars), "long");
        assert_eq!(ex.expand("$A/x", &vars), "1/x");
    }

    #[test]
    fn test_bare_dollar_is_literal() {
        let ex = Expander::new().unwrap();
        let vars = vars(&[("A", "1")]);
        assert_eq!(ex.expand("$", &vars), "$");
        assert_eq!(ex.expand("cost: $ 5", &vars), "cost: $ 5");
        assert_eq!(ex.expand("$$A", &vars), "$1");
    }

    #[test]
    fn test_value_is_not_reexpanded() {
        let ex = Expander::new().unwrap();
        let vars = vars(&[("A", "$B"), ("B", "no")]);
        assert_eq!(ex.expand("$A", &vars), "$B");
    }

    #[test]
    fn test_expand_all() {
        let ex = Expander::new().unwrap();
        let vars = vars(&[("X", "x")]);
        let mut tokens = vec!["echo".to_string(), "$X".to_string(), "plain".to_string()];
        ex.expand_all(&mut tokens, &vars);
        assert_eq!(tokens, vec!["echo", "x", "plain"]);
    }
}
