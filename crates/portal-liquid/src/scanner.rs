//! Reference extraction from a token stream.

use std::sync::Arc;

use crate::tokenizer::{LiquidTokenizer, Token, Tokenizer};

/// One directive parameter found in text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Tag name (e.g. `"snippet"`, `"entityform"`).
    pub directive: &'a str,
    /// Parameter name for `name: value` pairs, `None` for positional values.
    pub parameter: Option<&'a str>,
    /// Value with one layer of surrounding quotes removed.
    pub value: &'a str,
}

/// Scans text for directive references.
///
/// Generic over the tokenizer so callers can swap in another dialect.
#[derive(Clone, Debug, Default)]
pub struct ReferenceScanner<T: Tokenizer = LiquidTokenizer> {
    tokenizer: T,
}

impl ReferenceScanner {
    /// Create a scanner using [`LiquidTokenizer`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Tokenizer> ReferenceScanner<T> {
    /// Create a scanner with a custom tokenizer.
    #[must_use]
    pub fn with_tokenizer(tokenizer: T) -> Self {
        Self { tokenizer }
    }

    /// Scan `text` and return its references.
    ///
    /// Tokenizing happens once; the returned iterator groups tokens lazily
    /// and can be cloned to restart from the beginning.
    #[must_use]
    pub fn scan<'a>(&self, text: &'a str) -> References<'a> {
        References::new(self.tokenizer.tokenize(text).into())
    }
}

/// Lazy iterator over the references of one text.
///
/// Each tag occurrence yields one [`Reference`] per parameter value. Tags
/// without parameters yield nothing.
#[derive(Clone, Debug)]
pub struct References<'a> {
    tokens: Arc<[Token<'a>]>,
    pos: usize,
    directive: Option<&'a str>,
    parameter: Option<&'a str>,
}

impl<'a> References<'a> {
    fn new(tokens: Arc<[Token<'a>]>) -> Self {
        Self {
            tokens,
            pos: 0,
            directive: None,
            parameter: None,
        }
    }

    /// Iterator positioned back at the first token.
    #[must_use]
    pub fn restart(&self) -> Self {
        Self::new(Arc::clone(&self.tokens))
    }
}

impl<'a> Iterator for References<'a> {
    type Item = Reference<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&token) = self.tokens.get(self.pos) {
            self.pos += 1;
            match token {
                Token::TagOpen | Token::TagClose => {
                    self.directive = None;
                    self.parameter = None;
                }
                Token::TagName(name) => self.directive = Some(name),
                Token::ParamName(name) => self.parameter = Some(name),
                Token::ParamValue(value) => {
                    let Some(directive) = self.directive else {
                        continue;
                    };
                    return Some(Reference {
                        directive,
                        parameter: self.parameter.take(),
                        value: unquote(value),
                    });
                }
                Token::Text(_) => {}
            }
        }
        None
    }
}

/// Strip one layer of matching single or double quotes.
///
/// Used on both sides of a lookup so `'x'` and `"x"` compare equal.
#[must_use]
pub fn unquote(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = s
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scan(text: &str) -> Vec<Reference<'_>> {
        ReferenceScanner::new().scan(text).collect()
    }

    fn reference<'a>(
        directive: &'a str,
        parameter: Option<&'a str>,
        value: &'a str,
    ) -> Reference<'a> {
        Reference {
            directive,
            parameter,
            value,
        }
    }

    #[test]
    fn test_positional_literal() {
        assert_eq!(
            scan("<p>{% snippet 'greeting' %}</p>"),
            vec![reference("snippet", None, "greeting")]
        );
    }

    #[test]
    fn test_named_parameters_each_yield() {
        assert_eq!(
            scan(r#"{% entitylist id: "1f0c", key: 'Orders' %}"#),
            vec![
                reference("entitylist", Some("id"), "1f0c"),
                reference("entitylist", Some("key"), "Orders"),
            ]
        );
    }

    #[test]
    fn test_tags_without_parameters_are_skipped() {
        assert!(scan("{% endif %}{{ page }}{% else %}").is_empty());
    }

    #[test]
    fn test_output_subscript() {
        assert_eq!(
            scan(r#"{{ snippets["Footer"] }}"#),
            vec![reference("snippets", None, "Footer")]
        );
    }

    #[test]
    fn test_tags_are_independent() {
        assert_eq!(
            scan("{% webform name: 'Apply' %} text {% include 'header' %}"),
            vec![
                reference("webform", Some("name"), "Apply"),
                reference("include", None, "header"),
            ]
        );
    }

    #[test]
    fn test_dangling_parameter_name_does_not_leak() {
        assert_eq!(
            scan("{% entityform name: %}{% snippet 'x' %}"),
            vec![reference("snippet", None, "x")]
        );
    }

    #[test]
    fn test_iterator_is_restartable() {
        let refs = ReferenceScanner::new().scan("{% snippet 'a' %}{% snippet 'b' %}");

        let mut first = refs.clone();
        assert_eq!(first.next().map(|r| r.value), Some("a"));

        assert_eq!(refs.clone().count(), 2);
        assert_eq!(first.restart().count(), 2);
    }

    #[test]
    fn test_custom_tokenizer() {
        struct Fixed;

        impl Tokenizer for Fixed {
            fn tokenize<'a>(&self, _text: &'a str) -> Vec<Token<'a>> {
                vec![
                    Token::TagOpen,
                    Token::TagName("snippet"),
                    Token::ParamValue("\"fixed\""),
                    Token::TagClose,
                ]
            }
        }

        let refs: Vec<_> = ReferenceScanner::with_tokenizer(Fixed).scan("").collect();

        assert_eq!(refs, vec![reference("snippet", None, "fixed")]);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'a'"), "a");
        assert_eq!(unquote("\"a b\""), "a b");
        assert_eq!(unquote("'a\""), "'a\"");
        assert_eq!(unquote("''"), "");
        assert_eq!(unquote("'"), "'");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("\"'nested'\""), "'nested'");
    }
}
