//! Local parameter syntax.
//!
//! A clause may start with a local parameter block that configures how its
//! body is interpreted:
//!
//! ```text
//! {!knn f=vector topK=10 preFilter='category:books' v=$vec}
//! {!tag=price,stock}inStock:true
//! ```
//!
//! Supported value forms are bare words, `'single quoted'`, `"double quoted"`
//! (backslash escapes the next character) and `$name`, which dereferences a
//! request parameter and contributes every value it holds. A key given more
//! than once accumulates its values.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{Result, VecQueryError};
use crate::query::params::RequestParams;

/// Name of the parameter that selects the clause type.
pub const TYPE_PARAM: &str = "type";

/// Parsed local parameters of one clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalParams {
    kind: Option<String>,
    params: RequestParams,
}

impl LocalParams {
    /// Create an empty parameter block of the given type.
    pub fn new<S: Into<String>>(kind: S) -> Self {
        LocalParams {
            kind: Some(kind.into()),
            params: RequestParams::new(),
        }
    }

    /// Builder-style addition of a value.
    pub fn with<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.params.add(name, value);
        self
    }

    /// Parse an optional local parameter block at the start of `text`.
    ///
    /// Returns the parameters, if any, and the clause body that follows them.
    /// Text that does not start with `{!` has no parameters and is entirely
    /// body.
    pub fn parse<'a>(text: &'a str, request: &RequestParams) -> Result<(Option<Self>, &'a str)> {
        let trimmed = text.trim_start();
        if !trimmed.starts_with("{!") {
            return Ok((None, text));
        }

        let mut parser = LocalParamsParser {
            text: trimmed,
            chars: trimmed.char_indices().peekable(),
            request,
        };
        let (params, end) = parser.parse()?;
        Ok((Some(params), &trimmed[end..]))
    }

    /// The clause type, e.g. `knn` or `frange`.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Every value of `name`.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.params.get_all(name)
    }

    /// Whether `name` was given, even with an empty value.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains(name)
    }
}

struct LocalParamsParser<'a, 'r> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
    request: &'r RequestParams,
}

impl LocalParamsParser<'_, '_> {
    fn parse(&mut self) -> Result<(LocalParams, usize)> {
        // Skip "{!".
        self.chars.next();
        self.chars.next();

        let mut local = LocalParams::default();
        let mut first = true;

        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                None => return Err(self.unterminated()),
                Some(&(index, '}')) => {
                    self.chars.next();
                    return Ok((local, index + 1));
                }
                Some(_) => {}
            }

            let key = self.consume_key()?;
            if self.chars.peek().map(|&(_, c)| c) != Some('=') {
                if first && local.kind.is_none() {
                    local.kind = Some(key);
                    first = false;
                    continue;
                }
                return Err(VecQueryError::query(format!(
                    "expected '=' after local param key '{key}' in '{}'",
                    self.text
                )));
            }
            self.chars.next();
            first = false;

            let values = self.consume_value()?;
            if key == TYPE_PARAM {
                local.kind = values.into_iter().next();
            } else {
                for value in values {
                    local.params.add(key.clone(), value);
                }
            }
        }
    }

    fn consume_key(&mut self) -> Result<String> {
        let mut key = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() || c == '=' || c == '}' {
                break;
            }
            key.push(c);
            self.chars.next();
        }

        if key.is_empty() {
            return Err(VecQueryError::query(format!(
                "expected local param key in '{}'",
                self.text
            )));
        }
        Ok(key)
    }

    fn consume_value(&mut self) -> Result<Vec<String>> {
        match self.chars.peek().map(|&(_, c)| c) {
            Some(quote @ ('\'' | '"')) => {
                self.chars.next();
                Ok(vec![self.consume_quoted(quote)?])
            }
            Some('$') => {
                self.chars.next();
                let name = self.consume_bare();
                Ok(self.request.get_all(&name).to_vec())
            }
            _ => Ok(vec![self.consume_bare()]),
        }
    }

    fn consume_quoted(&mut self, quote: char) -> Result<String> {
        let mut value = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(value),
                c => value.push(c),
            }
        }
        Err(self.unterminated())
    }

    fn consume_bare(&mut self) -> String {
        let mut value = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() || c == '}' {
                break;
            }
            value.push(c);
            self.chars.next();
        }
        value
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn unterminated(&self) -> VecQueryError {
        VecQueryError::query(format!("missing end to local params: '{}'", self.text))
    }
}
