//! Liquid directive scanning for portal content.
//!
//! Portal markup and scripts embed Liquid directives such as
//! `{% snippet 'greeting' %}`, `{% entityform name: 'Contact' %}` or
//! `{{ snippets['footer'] }}`. This crate finds them without rendering
//! anything:
//!
//! 1. A [`Tokenizer`] turns text into a flat [`Token`] stream. The default
//!    [`LiquidTokenizer`] recognises tag and output delimiters, tag names,
//!    `name:` parameter prefixes and parameter values.
//! 2. The [`ReferenceScanner`] groups the tokens of each tag occurrence into
//!    [`Reference`] triples of (directive, parameter, value).
//!
//! # Example
//!
//! ```
//! use portal_liquid::ReferenceScanner;
//!
//! let scanner = ReferenceScanner::new();
//! let refs: Vec<_> = scanner
//!     .scan("<div>{% entityform name: 'Contact Us' %}</div>")
//!     .collect();
//!
//! assert_eq!(refs.len(), 1);
//! assert_eq!(refs[0].directive, "entityform");
//! assert_eq!(refs[0].parameter, Some("name"));
//! assert_eq!(refs[0].value, "Contact Us");
//! ```

mod scanner;
mod tokenizer;

pub use scanner::{Reference, ReferenceScanner, References, unquote};
pub use tokenizer::{LiquidTokenizer, Token, Tokenizer};
