//! Function queries over vector similarity.
//!
//! A function query scores every document with a numeric expression:
//!
//! ```text
//! vectorSimilarity(EUCLIDEAN, vector, [1,5,4,3])
//! sum(vectorSimilarity(DOT_PRODUCT, vector, vector2), floatField)
//! sub(1.5, vectorSimilarityScore(COSINE, [1,2,3], [4,5,6]))
//! ```
//!
//! `vectorSimilarity` yields the raw value of the similarity function and
//! `vectorSimilarityScore` its bounded score. Vector operands are literals or
//! dense vector fields; a document without a value in a vector field
//! contributes the all-zero vector, and a document without a numeric value
//! contributes 0.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use tracing::trace;

use crate::error::{Result, VecQueryError};
use crate::index::doc_set::DocSet;
use crate::index::reader::SegmentReader;
use crate::index::searcher::ScoredDoc;
use crate::query::local_params::LocalParams;
use crate::query::params::RequestParams;
use crate::schema::{FieldType, Schema};
use crate::vector::core::parser::parse_vector;
use crate::vector::core::vector::VectorEncoding;
use crate::vector::similarity::{ScoreMode, SimilarityFunction};
use crate::vector::source::{VectorValueSource, VectorValues};

/// Function returning the raw similarity.
pub const VECTOR_SIMILARITY: &str = "vectorSimilarity";

/// Function returning the bounded similarity score.
pub const VECTOR_SIMILARITY_SCORE: &str = "vectorSimilarityScore";

/// Similarity between two vector operands.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSimilarityFunction {
    similarity: SimilarityFunction,
    mode: ScoreMode,
    first: VectorValueSource,
    second: VectorValueSource,
}

impl VectorSimilarityFunction {
    /// Create a similarity over two sources of equal dimension.
    pub fn new(
        similarity: SimilarityFunction,
        mode: ScoreMode,
        first: VectorValueSource,
        second: VectorValueSource,
    ) -> Result<Self> {
        if first.dimension() != second.dimension() {
            return Err(VecQueryError::vector_dimensions_differ(
                first.dimension(),
                second.dimension(),
            ));
        }

        Ok(VectorSimilarityFunction {
            similarity,
            mode,
            first,
            second,
        })
    }

    /// The similarity function.
    pub fn similarity(&self) -> SimilarityFunction {
        self.similarity
    }

    /// Raw or bounded output.
    pub fn mode(&self) -> ScoreMode {
        self.mode
    }
}

impl fmt::Display for VectorSimilarityFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.mode {
            ScoreMode::Raw => VECTOR_SIMILARITY,
            ScoreMode::Score => VECTOR_SIMILARITY_SCORE,
        };
        write!(f, "{name}({}, {}, {})", self.similarity, self.first, self.second)
    }
}

/// A numeric expression evaluated per document.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionExpr {
    /// A constant.
    Constant(f32),
    /// The value of a numeric field, 0 when absent.
    NumericField(String),
    /// Similarity of two vectors.
    VectorSimilarity(VectorSimilarityFunction),
    /// Sum of the operands.
    Sum(Vec<FunctionExpr>),
    /// Product of the operands.
    Product(Vec<FunctionExpr>),
    /// First operand minus the second.
    Sub(Box<FunctionExpr>, Box<FunctionExpr>),
}

impl FunctionExpr {
    /// Bind the expression to one segment.
    pub fn evaluator<'a>(&'a self, reader: &'a dyn SegmentReader) -> Result<FunctionEvaluator<'a>> {
        Ok(match self {
            FunctionExpr::Constant(value) => FunctionEvaluator::Constant(*value),
            FunctionExpr::NumericField(field) => FunctionEvaluator::NumericField { field, reader },
            FunctionExpr::VectorSimilarity(function) => FunctionEvaluator::Similarity {
                similarity: function.similarity,
                mode: function.mode,
                first: function.first.values(reader)?,
                second: function.second.values(reader)?,
            },
            FunctionExpr::Sum(operands) => FunctionEvaluator::Sum(evaluators(operands, reader)?),
            FunctionExpr::Product(operands) => {
                FunctionEvaluator::Product(evaluators(operands, reader)?)
            }
            FunctionExpr::Sub(left, right) => FunctionEvaluator::Sub(
                Box::new(left.evaluator(reader)?),
                Box::new(right.evaluator(reader)?),
            ),
        })
    }
}

fn evaluators<'a>(
    operands: &'a [FunctionExpr],
    reader: &'a dyn SegmentReader,
) -> Result<Vec<FunctionEvaluator<'a>>> {
    operands.iter().map(|expr| expr.evaluator(reader)).collect()
}

impl fmt::Display for FunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |operands: &[FunctionExpr]| {
            operands
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            FunctionExpr::Constant(value) => write!(f, "{value}"),
            FunctionExpr::NumericField(field) => write!(f, "{field}"),
            FunctionExpr::VectorSimilarity(function) => write!(f, "{function}"),
            FunctionExpr::Sum(operands) => write!(f, "sum({})", join(operands)),
            FunctionExpr::Product(operands) => write!(f, "product({})", join(operands)),
            FunctionExpr::Sub(left, right) => write!(f, "sub({left}, {right})"),
        }
    }
}

/// A function expression bound to one segment.
///
/// Documents must be evaluated in non-decreasing order.
pub enum FunctionEvaluator<'a> {
    /// A constant.
    Constant(f32),
    /// Numeric doc values.
    NumericField {
        /// Field name.
        field: &'a str,
        /// Segment the values are read from.
        reader: &'a dyn SegmentReader,
    },
    /// Similarity of two vectors.
    Similarity {
        /// Function applied.
        similarity: SimilarityFunction,
        /// Raw or bounded output.
        mode: ScoreMode,
        /// First operand.
        first: VectorValues<'a>,
        /// Second operand.
        second: VectorValues<'a>,
    },
    /// Sum of the operands.
    Sum(Vec<FunctionEvaluator<'a>>),
    /// Product of the operands.
    Product(Vec<FunctionEvaluator<'a>>),
    /// First operand minus the second.
    Sub(Box<FunctionEvaluator<'a>>, Box<FunctionEvaluator<'a>>),
}

impl FunctionEvaluator<'_> {
    /// Value of the expression for `doc`.
    pub fn float_val(&mut self, doc: u32) -> Result<f32> {
        match self {
            FunctionEvaluator::Constant(value) => Ok(*value),
            FunctionEvaluator::NumericField { field, reader } => {
                Ok(reader.numeric_value(field, doc)?.unwrap_or(0.0) as f32)
            }
            FunctionEvaluator::Similarity {
                similarity,
                mode,
                first,
                second,
            } => {
                let a = first.vector_val(doc)?;
                let b = second.vector_val(doc)?;
                similarity.evaluate(*mode, a, b)
            }
            FunctionEvaluator::Sum(operands) => {
                let mut total = 0.0;
                for operand in operands {
                    total += operand.float_val(doc)?;
                }
                Ok(total)
            }
            FunctionEvaluator::Product(operands) => {
                let mut total = 1.0;
                for operand in operands {
                    total *= operand.float_val(doc)?;
                }
                Ok(total)
            }
            FunctionEvaluator::Sub(left, right) => Ok(left.float_val(doc)? - right.float_val(doc)?),
        }
    }
}

/// A query matching every live document, scored by a function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionQuery {
    expr: FunctionExpr,
}

impl FunctionQuery {
    /// Wrap an expression.
    pub fn new(expr: FunctionExpr) -> Self {
        FunctionQuery { expr }
    }

    /// The scoring expression.
    pub fn expr(&self) -> &FunctionExpr {
        &self.expr
    }

    /// Score the members of `docs`, in ascending document order.
    pub fn score_docs(&self, reader: &dyn SegmentReader, docs: &DocSet) -> Result<Vec<ScoredDoc>> {
        let mut evaluator = self.expr.evaluator(reader)?;
        let mut hits = Vec::with_capacity(docs.len());
        for doc in docs.iter() {
            hits.push(ScoredDoc::new(doc, evaluator.float_val(doc)?));
        }
        trace!(expr = %self.expr, docs = hits.len(), "scored function query");
        Ok(hits)
    }

    /// Score every live document.
    pub fn score_all(&self, reader: &dyn SegmentReader) -> Result<Vec<ScoredDoc>> {
        self.score_docs(reader, &reader.live_docs())
    }
}

impl fmt::Display for FunctionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

/// Syntax tree of a function expression before field resolution.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(f32),
    Ident(String),
    Vector(String),
    Call(String, Vec<Node>),
}

/// Parses function expressions, resolving fields against a schema.
#[derive(Debug, Clone, Copy)]
pub struct FunctionParser<'a> {
    schema: &'a Schema,
}

impl<'a> FunctionParser<'a> {
    /// Create a parser.
    pub fn new(schema: &'a Schema) -> Self {
        FunctionParser { schema }
    }

    /// Parse a function query, with or without a leading `{!func}` block.
    pub fn parse(&self, text: &str, request: &RequestParams) -> Result<FunctionQuery> {
        let (local, body) = LocalParams::parse(text, request)?;
        if let Some(kind) = local.as_ref().and_then(LocalParams::kind) {
            if kind != "func" {
                return Err(VecQueryError::query(format!(
                    "expected a function query, got type '{kind}'"
                )));
            }
        }

        let node = NodeParser::parse(body, request)?;
        Ok(FunctionQuery::new(self.numeric(&node)?))
    }

    fn numeric(&self, node: &Node) -> Result<FunctionExpr> {
        match node {
            Node::Number(value) => Ok(FunctionExpr::Constant(*value)),
            Node::Ident(name) => {
                let definition = self.schema.field(name)?;
                match definition.field_type {
                    FieldType::Numeric => Ok(FunctionExpr::NumericField(name.clone())),
                    _ => Err(VecQueryError::query(format!(
                        "field '{name}' of type {} is not a numeric value",
                        definition.field_type.type_name()
                    ))),
                }
            }
            Node::Vector(raw) => Err(VecQueryError::query(format!(
                "vector {raw} cannot be used as a numeric value"
            ))),
            Node::Call(name, args) => self.call(name, args),
        }
    }

    fn call(&self, name: &str, args: &[Node]) -> Result<FunctionExpr> {
        match name {
            VECTOR_SIMILARITY => self.similarity(args, ScoreMode::Raw),
            VECTOR_SIMILARITY_SCORE => self.similarity(args, ScoreMode::Score),
            "sum" => Ok(FunctionExpr::Sum(self.operands(name, args, 1)?)),
            "product" => Ok(FunctionExpr::Product(self.operands(name, args, 1)?)),
            "sub" => {
                expect_arity(name, args, 2)?;
                Ok(FunctionExpr::Sub(
                    Box::new(self.numeric(&args[0])?),
                    Box::new(self.numeric(&args[1])?),
                ))
            }
            _ => Err(VecQueryError::query(format!("unknown function: {name}"))),
        }
    }

    fn operands(&self, name: &str, args: &[Node], min: usize) -> Result<Vec<FunctionExpr>> {
        if args.len() < min {
            return Err(VecQueryError::query(format!(
                "function '{name}' expects at least {min} argument(s), got {}",
                args.len()
            )));
        }
        args.iter().map(|arg| self.numeric(arg)).collect()
    }

    fn similarity(&self, args: &[Node], mode: ScoreMode) -> Result<FunctionExpr> {
        let name = match mode {
            ScoreMode::Raw => VECTOR_SIMILARITY,
            ScoreMode::Score => VECTOR_SIMILARITY_SCORE,
        };
        expect_arity(name, args, 3)?;

        let similarity = match &args[0] {
            Node::Ident(function) => SimilarityFunction::parse_str(function)?,
            other => {
                return Err(VecQueryError::query(format!(
                    "wrong similarity function: {other:?}"
                )));
            }
        };

        let encoding = self
            .field_encoding(&args[1])
            .or_else(|| self.field_encoding(&args[2]))
            .unwrap_or_default();
        let first = self.vector(&args[1], encoding)?;
        let second = self.vector(&args[2], encoding)?;

        Ok(FunctionExpr::VectorSimilarity(VectorSimilarityFunction::new(
            similarity, mode, first, second,
        )?))
    }

    fn field_encoding(&self, node: &Node) -> Option<VectorEncoding> {
        match node {
            Node::Ident(name) => self
                .schema
                .get_field(name)
                .and_then(|definition| definition.vector_params())
                .map(|(_, encoding, _)| encoding),
            _ => None,
        }
    }

    fn vector(&self, node: &Node, encoding: VectorEncoding) -> Result<VectorValueSource> {
        match node {
            Node::Vector(raw) => Ok(VectorValueSource::constant(parse_vector(raw, encoding)?)),
            Node::Ident(name) => {
                let definition = self.schema.field(name)?;
                match definition.vector_params() {
                    Some((dimension, _, _)) => Ok(VectorValueSource::field(name, dimension)),
                    None => Err(VecQueryError::wrong_operand_type()),
                }
            }
            Node::Number(_) | Node::Call(..) => Err(VecQueryError::wrong_operand_type()),
        }
    }
}

fn expect_arity(name: &str, args: &[Node], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(VecQueryError::query(format!(
            "function '{name}' expects {expected} arguments, got {}",
            args.len()
        )));
    }
    Ok(())
}

/// Character level parser producing [`Node`]s.
struct NodeParser<'a, 'r> {
    text: &'a str,
    chars: Peekable<Chars<'a>>,
    request: &'r RequestParams,
    depth: usize,
    nesting: usize,
}

/// Maximum nesting of `$param` references.
const MAX_REFERENCE_DEPTH: usize = 8;

/// Maximum nesting of function calls, counted across references.
const MAX_CALL_NESTING: usize = 32;

impl<'a, 'r> NodeParser<'a, 'r> {
    fn parse(text: &'a str, request: &'r RequestParams) -> Result<Node> {
        Self::parse_at_depth(text, request, 0, 0)
    }

    fn parse_at_depth(
        text: &'a str,
        request: &'r RequestParams,
        depth: usize,
        nesting: usize,
    ) -> Result<Node> {
        let mut parser = NodeParser {
            text,
            chars: text.chars().peekable(),
            request,
            depth,
            nesting,
        };
        let node = parser.parse_node()?;
        parser.skip_whitespace();
        if parser.chars.peek().is_some() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(node)
    }

    fn parse_node(&mut self) -> Result<Node> {
        self.skip_whitespace();
        match self.chars.peek().copied() {
            None => Err(self.error("expected an expression")),
            Some('[') => self.parse_vector(),
            Some('$') => self.parse_reference(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                self.parse_number()
            }
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_identifier_or_call(),
            Some(c) => Err(self.error(&format!("unexpected character '{c}'"))),
        }
    }

    fn parse_vector(&mut self) -> Result<Node> {
        let mut raw = String::new();
        for c in self.chars.by_ref() {
            raw.push(c);
            if c == ']' {
                return Ok(Node::Vector(raw));
            }
        }
        Err(self.error("unterminated vector"))
    }

    fn parse_number(&mut self) -> Result<Node> {
        let raw = self.consume_token();
        raw.parse::<f32>()
            .map(Node::Number)
            .map_err(|_| self.error(&format!("invalid number '{raw}'")))
    }

    fn parse_reference(&mut self) -> Result<Node> {
        self.chars.next();
        let name = self.consume_token();
        if self.depth >= MAX_REFERENCE_DEPTH {
            return Err(self.error(&format!("parameter '${name}' nests too deeply")));
        }
        let value = self
            .request
            .get(&name)
            .ok_or_else(|| self.error(&format!("missing parameter '${name}'")))?;
        NodeParser::parse_at_depth(value, self.request, self.depth + 1, self.nesting)
    }

    fn parse_identifier_or_call(&mut self) -> Result<Node> {
        let name = self.consume_token();
        self.skip_whitespace();
        if self.chars.peek() != Some(&'(') {
            return Ok(Node::Ident(name));
        }
        self.chars.next();

        if self.nesting >= MAX_CALL_NESTING {
            return Err(self.error(&format!("call to '{name}' nests too deeply")));
        }
        self.nesting += 1;
        let args = self.parse_arguments(&name);
        self.nesting -= 1;
        Ok(Node::Call(name, args?))
    }

    fn parse_arguments(&mut self, name: &str) -> Result<Vec<Node>> {
        let mut args = Vec::new();
        self.skip_whitespace();
        if self.chars.peek() == Some(&')') {
            self.chars.next();
            return Ok(args);
        }

        loop {
            args.push(self.parse_node()?);
            self.skip_whitespace();
            match self.chars.next() {
                Some(',') => continue,
                Some(')') => return Ok(args),
                _ => return Err(self.error(&format!("unterminated call to '{name}'"))),
            }
        }
    }

    fn consume_token(&mut self) -> String {
        let mut token = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || matches!(c, ',' | '(' | ')' | '[' | ']') {
                break;
            }
            token.push(c);
            self.chars.next();
        }
        token
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn error(&self, message: &str) -> VecQueryError {
        VecQueryError::query(format!("{message} in function '{}'", self.text.trim()))
    }
}
