//! Parsing of the `[scope:]Namespace.Type.Member` target of a call.

use pest::Parser;
use pest::error::InputLocation;
use pest_derive::Parser;

use crate::error::{InvokeError, Result};

#[derive(Parser)]
#[grammar = "target.pest"]
struct TargetParser;

/// The callable named by the first token of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scope: Option<String>,
    pub type_name: String,
    pub member: String,
}

impl Target {
    /// The final segment names the member, everything before it the type.
    pub fn parse(text: &str) -> Result<Target> {
        let parsed = TargetParser::parse(Rule::target, text)
            .map_err(|e| InvokeError::Parse {
                message: format!("invalid target {text:?}: {}", e.variant.message()),
                col: match e.location {
                    InputLocation::Pos(p) => Some(p + 1),
                    InputLocation::Span((s, _)) => Some(s + 1),
                },
            })?
            .next()
            .ok_or_else(|| InvokeError::Parse { message: format!("empty target {text:?}"), col: None })?;

        let mut scope = None;
        let mut segments: Vec<&str> = Vec::new();
        for pair in parsed.into_inner() {
            match pair.as_rule() {
                Rule::scope => scope = Some(pair.as_str().to_owned()),
                Rule::path => segments.extend(pair.into_inner().map(|s| s.as_str())),
                _ => (),
            }
        }
        match segments.split_last() {
            Some((member, namespace)) if !namespace.is_empty() => Ok(Target {
                scope,
                type_name: namespace.join("."),
                member: (*member).to_owned(),
            }),
            _ => Err(InvokeError::MemberNotFound { type_name: text.to_owned(), member: String::new() }),
        }
    }
}
