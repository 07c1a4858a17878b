//! Parsing filter text into [`Filter`]s.
//!
//! The standard parser understands:
//!
//! - `*:*` (every document)
//! - `field:value` and `field:(v1 v2 ...)` (any of the values)
//! - a leading `-` negating either of the above
//! - `{!frange l=<lower> u=<upper> incl=<bool> incu=<bool>}` over the main
//!   query score
//!
//! Any filter may carry a `{!tag=a,b}` block; tags are read by
//! [`FilterParser::parse_directive`].

use std::sync::Arc;

use regex::Regex;

use crate::error::{Result, VecQueryError};
use crate::query::filter::{
    Filter, FilterDirective, MatchAllFilter, NotFilter, ScoreRangeFilter, TermsFilter,
};
use crate::query::local_params::LocalParams;
use crate::query::params::RequestParams;

/// Local parameter carrying the tags of a filter directive.
pub const TAG_PARAM: &str = "tag";

/// Clause type of score range filters.
pub const FRANGE_TYPE: &str = "frange";

/// Turns filter text into filters.
pub trait FilterParser: Send + Sync {
    /// Parse one filter.
    fn parse(&self, text: &str, request: &RequestParams) -> Result<Arc<dyn Filter>>;

    /// Parse a request-level filter directive, reading its tags.
    fn parse_directive(&self, text: &str, request: &RequestParams) -> Result<FilterDirective> {
        let (local, _) = LocalParams::parse(text, request)?;
        let tags = local
            .as_ref()
            .map(|local| split_list(local.get_all(TAG_PARAM)))
            .unwrap_or_default();
        Ok(FilterDirective::tagged(self.parse(text, request)?, tags))
    }
}

/// Split comma separated values, trimming names and dropping empty ones.
pub fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Regex based parser for the standard filter syntax.
#[derive(Debug, Clone)]
pub struct StandardFilterParser {
    term_pattern: Regex,
}

impl StandardFilterParser {
    /// Create a new parser.
    pub fn new() -> Result<Self> {
        let term_pattern = Regex::new(
            r"^(?P<neg>-)?(?P<field>[A-Za-z_][\w.]*):(?:\((?P<list>[^()]*)\)|(?P<term>[^\s()]+))$",
        )
        .map_err(|e| VecQueryError::query(format!("invalid filter pattern: {e}")))?;
        Ok(StandardFilterParser { term_pattern })
    }

    fn parse_body(&self, body: &str, original: &str) -> Result<Arc<dyn Filter>> {
        let body = body.trim();
        match body {
            "*:*" => return Ok(Arc::new(MatchAllFilter)),
            "-*:*" => return Ok(Arc::new(NotFilter::new(Arc::new(MatchAllFilter)))),
            _ => {}
        }

        let captures = self
            .term_pattern
            .captures(body)
            .ok_or_else(|| VecQueryError::query(format!("cannot parse filter: '{original}'")))?;

        let field = &captures["field"];
        let terms: Vec<String> = match (captures.name("list"), captures.name("term")) {
            (Some(list), _) => list.as_str().split_whitespace().map(str::to_string).collect(),
            (None, Some(term)) => vec![term.as_str().to_string()],
            (None, None) => Vec::new(),
        };
        if terms.is_empty() {
            return Err(VecQueryError::query(format!(
                "filter has no terms: '{original}'"
            )));
        }

        let filter: Arc<dyn Filter> = Arc::new(TermsFilter::new(field, terms));
        if captures.name("neg").is_some() {
            Ok(Arc::new(NotFilter::new(filter)))
        } else {
            Ok(filter)
        }
    }

    fn parse_frange(&self, local: &LocalParams, body: &str) -> Result<Arc<dyn Filter>> {
        let body = body.trim();
        if !body.is_empty() && body != "$q" {
            return Err(VecQueryError::query(format!(
                "frange filters apply to the main query score only, got '{body}'"
            )));
        }

        let lower = parse_bound(local, "l")?;
        let upper = parse_bound(local, "u")?;
        let include_lower = parse_flag(local, "incl")?;
        let include_upper = parse_flag(local, "incu")?;

        Ok(Arc::new(
            ScoreRangeFilter::new(lower, upper).with_inclusive(include_lower, include_upper),
        ))
    }
}

impl FilterParser for StandardFilterParser {
    fn parse(&self, text: &str, request: &RequestParams) -> Result<Arc<dyn Filter>> {
        let (local, body) = LocalParams::parse(text, request)?;
        match local.as_ref().and_then(LocalParams::kind) {
            None | Some("lucene") => self.parse_body(body, text),
            Some(FRANGE_TYPE) => {
                let local = local.as_ref().ok_or_else(|| {
                    VecQueryError::query(format!("cannot parse filter: '{text}'"))
                })?;
                self.parse_frange(local, body)
            }
            Some(other) => Err(VecQueryError::query(format!(
                "unsupported filter type '{other}' in '{text}'"
            ))),
        }
    }
}

fn parse_bound(local: &LocalParams, name: &str) -> Result<Option<f32>> {
    match local.get(name) {
        None | Some("") | Some("*") => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f32>()
            .map(Some)
            .map_err(|_| {
                VecQueryError::invalid_parameter(format!("invalid frange bound {name}='{raw}'"))
            }),
    }
}

fn parse_flag(local: &LocalParams, name: &str) -> Result<bool> {
    match local.get(name) {
        None => Ok(true),
        Some(raw) => raw
            .trim()
            .parse::<bool>()
            .map_err(|_| {
                VecQueryError::invalid_parameter(format!("invalid frange flag {name}='{raw}'"))
            }),
    }
}
