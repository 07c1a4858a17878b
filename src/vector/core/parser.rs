//! Parser for textual vector literals such as `[1.0, 2.0, 3.0]`.

use crate::error::{Result, VecQueryError};
use crate::vector::core::vector::{VectorEncoding, VectorLiteral};

/// Parse a vector literal into the given element kind.
///
/// The text must be enclosed in `[` and `]` after trimming. Elements are
/// separated by `,`; trailing empty elements are dropped, so `[1,2,,]` has
/// two elements. An element that does not parse is reported verbatim,
/// whitespace included.
///
/// No dimension check happens here: a free-standing literal has no expected
/// size until it is bound to a field or compared with another vector.
pub fn parse_vector(text: &str, encoding: VectorEncoding) -> Result<VectorLiteral> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) || trimmed.len() < 2 {
        return Err(VecQueryError::malformed_vector_format(encoding));
    }

    let interior = &trimmed[1..trimmed.len() - 1];
    let tokens = split_elements(interior);

    match encoding {
        VectorEncoding::Float32 => tokens
            .iter()
            .map(|token| parse_float(token))
            .collect::<Result<Vec<_>>>()
            .map(VectorLiteral::Float32),
        VectorEncoding::Byte => tokens
            .iter()
            .map(|token| parse_byte(token))
            .collect::<Result<Vec<_>>>()
            .map(VectorLiteral::Byte),
    }
}

/// Parse a vector literal that will be searched against a field.
///
/// Fails when the parsed length differs from the field's declared dimension.
pub fn parse_vector_for_field(
    text: &str,
    encoding: VectorEncoding,
    dimension: usize,
) -> Result<VectorLiteral> {
    let vector = parse_vector(text, encoding)?;
    vector.validate_dimension(dimension)?;
    Ok(vector)
}

fn split_elements(interior: &str) -> Vec<&str> {
    if !interior.contains(',') {
        return vec![interior];
    }

    let mut tokens: Vec<&str> = interior.split(',').collect();
    while tokens.last().is_some_and(|token| token.is_empty()) {
        tokens.pop();
    }
    tokens
}

fn parse_float(token: &str) -> Result<f32> {
    match token.trim().parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(VecQueryError::malformed_vector_element(
            token,
            VectorEncoding::Float32,
        )),
    }
}

fn parse_byte(token: &str) -> Result<i8> {
    token
        .trim()
        .parse::<i32>()
        .ok()
        .and_then(|value| i8::try_from(value).ok())
        .ok_or_else(|| VecQueryError::malformed_vector_element(token, VectorEncoding::Byte))
}
