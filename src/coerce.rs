//! Text to typed value conversion.
//!
//! Every conversion is all-or-nothing: a value either coerces completely or
//! the caller gets `None` and the offending text is reported by the matcher.

use std::sync::Arc;

use tracing::trace;

use crate::datatype::{EnumDescriptor, ParsedValue, TypeTag};

/// Separates the members of an enum bit combination, `Read|Write`.
pub const ENUM_SEPARATOR: char = '|';
pub const ARRAY_BEGIN: char = '[';
pub const ARRAY_END: char = ']';
pub const ARRAY_SEPARATOR: char = ',';

/// Converts one text token into a value of the requested type.
pub fn coerce(text: &str, target: &TypeTag) -> Option<ParsedValue> {
    let parsed = match target {
        TypeTag::Int => text.trim().parse::<i64>().ok().map(ParsedValue::Int),
        TypeTag::Float => text.trim().parse::<f64>().ok().map(ParsedValue::Float),
        TypeTag::Bool => parse_bool(text).map(ParsedValue::Bool),
        TypeTag::String => Some(ParsedValue::Str(text.to_owned())),
        TypeTag::Enum(descriptor) => coerce_enum(text, descriptor),
        TypeTag::Array(element) => coerce_array(text, element),
    };
    trace!(text, target = %target, ok = parsed.is_some(), "coerce");
    parsed
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

// A piece is either a declared member name or the integer value of one.
fn enum_piece(piece: &str, descriptor: &EnumDescriptor) -> Option<i64> {
    descriptor.value_of(piece).or_else(|| {
        piece
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|v| descriptor.is_defined(*v))
    })
}

fn coerce_enum(text: &str, descriptor: &Arc<EnumDescriptor>) -> Option<ParsedValue> {
    let value = match text.find(ENUM_SEPARATOR) {
        Some(at) if at > 0 => {
            let mut combined: Option<i64> = None;
            for piece in text.split(ENUM_SEPARATOR) {
                match enum_piece(piece, descriptor) {
                    Some(v) => combined = Some(combined.unwrap_or(0) | v),
                    None => trace!(piece, enumeration = descriptor.name(), "skipping unresolved enum piece"),
                }
            }
            combined?
        }
        _ => enum_piece(text, descriptor)?,
    };
    Some(ParsedValue::Enum { ty: Arc::clone(descriptor), value })
}

fn coerce_array(text: &str, element: &TypeTag) -> Option<ParsedValue> {
    if !element.is_scalar() {
        return None;
    }
    let interior = text
        .strip_prefix(ARRAY_BEGIN)?
        .strip_suffix(ARRAY_END)
        .filter(|interior| !interior.is_empty())?;
    let values = interior
        .split(ARRAY_SEPARATOR)
        .map(|piece| coerce(piece, element))
        .collect::<Option<Vec<_>>>()?;
    Some(ParsedValue::Array { element: element.clone(), values })
}
