//! Liquid tokenizer.
//!
//! Splits text into literal runs and directive tokens. Only the parts needed
//! to find references are recognised: delimiters, the tag name, `name:`
//! parameter prefixes and parameter values. Operators and filters are
//! skipped.

/// A token produced by a [`Tokenizer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal text outside any directive.
    Text(&'a str),
    /// Start of a tag (`{%`) or output (`{{`).
    TagOpen,
    /// Tag name, or the object name of an output expression.
    TagName(&'a str),
    /// Parameter name from a `name:` prefix.
    ParamName(&'a str),
    /// Parameter value exactly as written (quotes included).
    ParamValue(&'a str),
    /// End of the tag or output.
    TagClose,
}

/// Turns text into a token stream.
pub trait Tokenizer: Send + Sync {
    /// Tokenize `text`. Never fails: malformed directives become text or are
    /// dropped.
    fn tokenize<'a>(&self, text: &'a str) -> Vec<Token<'a>>;
}

/// Default tokenizer for Liquid markup.
///
/// Content between `{% raw %}`/`{% endraw %}` and
/// `{% comment %}`/`{% endcomment %}` produces no tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct LiquidTokenizer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delimiter {
    /// `{% ... %}`
    Tag,
    /// `{{ ... }}`
    Output,
}

impl Delimiter {
    fn close(self) -> &'static str {
        match self {
            Self::Tag => "%}",
            Self::Output => "}}",
        }
    }
}

impl Tokenizer for LiquidTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        let mut rest = text;
        let mut skip_until: Option<&'static str> = None;

        while let Some((start, delimiter)) = find_open(rest) {
            let literal = &rest[..start];
            let after_open = &rest[start + 2..];
            let Some(end) = find_close(after_open, delimiter.close()) else {
                break;
            };
            let body = trim_body(&after_open[..end]);
            rest = &after_open[end + 2..];

            if let Some(end_name) = skip_until {
                if delimiter == Delimiter::Tag && Cursor::new(body).word() == end_name {
                    skip_until = None;
                }
                continue;
            }

            if !literal.is_empty() {
                tokens.push(Token::Text(literal));
            }

            let name = lex_body(delimiter, body, &mut tokens);
            if delimiter == Delimiter::Tag {
                skip_until = match name {
                    "raw" => Some("endraw"),
                    "comment" => Some("endcomment"),
                    _ => None,
                };
            }
        }

        if skip_until.is_none() && !rest.is_empty() {
            tokens.push(Token::Text(rest));
        }

        tokens
    }
}

/// Find the next `{%` or `{{`.
fn find_open(s: &str) -> Option<(usize, Delimiter)> {
    let bytes = s.as_bytes();
    let mut from = 0;
    while let Some(offset) = s[from..].find('{') {
        let at = from + offset;
        match bytes.get(at + 1) {
            Some(b'%') => return Some((at, Delimiter::Tag)),
            Some(b'{') => return Some((at, Delimiter::Output)),
            _ => from = at + 1,
        }
    }
    None
}

/// Find the closing delimiter, ignoring delimiters inside quoted literals.
///
/// Falls back to the first occurrence when a quote is left unbalanced.
fn find_close(s: &str, close: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if s[i..].starts_with(close) => return Some(i),
            None => {}
        }
    }
    s.find(close)
}

/// Strip whitespace-control dashes (`{%-`, `-%}`) and surrounding blanks.
fn trim_body(body: &str) -> &str {
    let body = body.strip_prefix('-').unwrap_or(body);
    let body = body.strip_suffix('-').unwrap_or(body);
    body.trim()
}

/// Emit the tokens for one tag body. Returns the tag name (empty if none).
fn lex_body<'a>(delimiter: Delimiter, body: &'a str, tokens: &mut Vec<Token<'a>>) -> &'a str {
    tokens.push(Token::TagOpen);

    let mut cursor = Cursor::new(body);
    let name = cursor.word();
    if name.is_empty() {
        tokens.push(Token::TagClose);
        return name;
    }
    tokens.push(Token::TagName(name));

    match delimiter {
        // Only a subscript directly on the object is a reference:
        // `{{ snippets['name'] }}`
        Delimiter::Output => {
            if cursor.eat('[') {
                cursor.skip_blanks();
                if let Some(literal) = cursor.quoted() {
                    tokens.push(Token::ParamValue(literal));
                }
            }
        }
        Delimiter::Tag => lex_params(&mut cursor, tokens),
    }

    tokens.push(Token::TagClose);
    name
}

fn lex_params<'a>(cursor: &mut Cursor<'a>, tokens: &mut Vec<Token<'a>>) {
    loop {
        cursor.skip_separators();
        let Some(c) = cursor.peek() else { break };

        if c == '\'' || c == '"' {
            match cursor.quoted() {
                Some(literal) => tokens.push(Token::ParamValue(literal)),
                None => break,
            }
        } else if is_word_char(c) {
            let word = cursor.value();
            cursor.skip_blanks();
            if cursor.eat(':') {
                tokens.push(Token::ParamName(word));
                cursor.skip_blanks();
                if let Some(value) = cursor.quoted().or_else(|| cursor.value_opt()) {
                    tokens.push(Token::ParamValue(value));
                }
            } else {
                tokens.push(Token::ParamValue(word));
            }
        } else {
            // Operators, filters and other punctuation
            cursor.bump();
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_value_char(c: char) -> bool {
    is_word_char(c) || c == '.'
}

/// Byte cursor over a tag body.
struct Cursor<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        let mut cursor = Self { s, pos: 0 };
        cursor.skip_blanks();
        cursor
    }

    fn rest(&self) -> &'a str {
        &self.s[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_blanks(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn skip_separators(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace() || c == ',') {
            self.bump();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.s[start..self.pos]
    }

    /// A tag or object name.
    fn word(&mut self) -> &'a str {
        self.take_while(is_word_char)
    }

    /// A bare value such as `page.id` or `42`.
    fn value(&mut self) -> &'a str {
        self.take_while(is_value_char)
    }

    fn value_opt(&mut self) -> Option<&'a str> {
        Some(self.value()).filter(|v| !v.is_empty())
    }

    /// A quoted literal including its quotes. `None` if the cursor is not on
    /// a quote or the literal is unterminated (the cursor does not move).
    fn quoted(&mut self) -> Option<&'a str> {
        let quote = self.peek().filter(|&c| c == '\'' || c == '"')?;
        let rest = self.rest();
        let end = rest[1..].find(quote)? + 2;
        self.pos += end;
        Some(&rest[..end])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn tokenize(text: &str) -> Vec<Token<'_>> {
        LiquidTokenizer.tokenize(text)
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(tokenize("<p>Hello</p>"), vec![Token::Text("<p>Hello</p>")]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_tag_with_positional_literal() {
        assert_eq!(
            tokenize("a{% snippet 'greeting' %}b"),
            vec![
                Token::Text("a"),
                Token::TagOpen,
                Token::TagName("snippet"),
                Token::ParamValue("'greeting'"),
                Token::TagClose,
                Token::Text("b"),
            ]
        );
    }

    #[test]
    fn test_tag_with_named_params() {
        assert_eq!(
            tokenize(r#"{% entitylist id: "1f0c", key: 'Orders' %}"#),
            vec![
                Token::TagOpen,
                Token::TagName("entitylist"),
                Token::ParamName("id"),
                Token::ParamValue(r#""1f0c""#),
                Token::ParamName("key"),
                Token::ParamValue("'Orders'"),
                Token::TagClose,
            ]
        );
    }

    #[test]
    fn test_whitespace_control() {
        assert_eq!(
            tokenize("{%- webform name:'Apply' -%}"),
            vec![
                Token::TagOpen,
                Token::TagName("webform"),
                Token::ParamName("name"),
                Token::ParamValue("'Apply'"),
                Token::TagClose,
            ]
        );
    }

    #[test]
    fn test_output_subscript() {
        assert_eq!(
            tokenize(r#"{{ snippets["Footer"] | escape }}"#),
            vec![
                Token::TagOpen,
                Token::TagName("snippets"),
                Token::ParamValue(r#""Footer""#),
                Token::TagClose,
            ]
        );
    }

    #[test]
    fn test_output_without_subscript() {
        assert_eq!(
            tokenize("{{ page.title }}"),
            vec![Token::TagOpen, Token::TagName("page"), Token::TagClose]
        );
    }

    #[test]
    fn test_bare_values_and_operators() {
        assert_eq!(
            tokenize("{% if user.id == 5 %}"),
            vec![
                Token::TagOpen,
                Token::TagName("if"),
                Token::ParamValue("user.id"),
                Token::ParamValue("5"),
                Token::TagClose,
            ]
        );
    }

    #[test]
    fn test_close_delimiter_inside_quotes() {
        assert_eq!(
            tokenize("{% include 'a %} b' %}"),
            vec![
                Token::TagOpen,
                Token::TagName("include"),
                Token::ParamValue("'a %} b'"),
                Token::TagClose,
            ]
        );
    }

    #[test]
    fn test_raw_and_comment_are_skipped() {
        let tokens = tokenize(
            "{% raw %}{% snippet 'x' %}{% endraw %}{% comment %}{{ snippets['y'] }}{% endcomment %}z",
        );

        assert_eq!(
            tokens,
            vec![
                Token::TagOpen,
                Token::TagName("raw"),
                Token::TagClose,
                Token::TagOpen,
                Token::TagName("comment"),
                Token::TagClose,
                Token::Text("z"),
            ]
        );
    }

    #[test]
    fn test_unterminated_tag_stops() {
        assert_eq!(tokenize("before {% snippet 'x'"), Vec::<Token<'_>>::new());
    }

    #[test]
    fn test_single_brace_is_text() {
        assert_eq!(
            tokenize("function() { return 1; }"),
            vec![Token::Text("function() { return 1; }")]
        );
    }

    #[test]
    fn test_find_close_unbalanced_quote_falls_back() {
        assert_eq!(find_close(" it's %} x", "%}"), Some(6));
    }
}
