/// Splits text into lowercase alphanumeric tokens.
///
/// Mirrors the `simple` text-search configuration closely enough that a term
/// produced here can be bound straight into `to_tsquery('simple', ..)` without
/// escaping: operators and punctuation never survive tokenization.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A typeahead-style text query where every term must match a token prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixQuery {
    terms: Vec<String>,
}

impl PrefixQuery {
    /// Builds a query from raw user input.
    ///
    /// Returns `None` when the input holds no searchable terms, which callers
    /// treat exactly like an empty query.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut terms: Vec<String> = Vec::new();
        for token in tokenize(raw) {
            if !terms.contains(&token) {
                terms.push(token);
            }
        }

        if terms.is_empty() {
            None
        } else {
            Some(Self { terms })
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Renders the `tsquery` expression: `term:*` joined with `&`
    pub fn to_tsquery(&self) -> String {
        self.terms
            .iter()
            .map(|term| format!("{}:*", term))
            .collect::<Vec<_>>()
            .join(" & ")
    }

    /// True when every term prefixes at least one token of `text`
    pub fn matches(&self, text: &str) -> bool {
        let tokens = tokenize(text);
        self.terms
            .iter()
            .all(|term| tokens.iter().any(|token| token.starts_with(term.as_str())))
    }
}
