//! Overload resolution.
//!
//! Candidates are tried in tiers and, within a tier, in declaration order.
//! The first candidate whose parameters all receive a coerced argument or a
//! declared default wins; there is no scoring and no backtracking.
//!
//! 1. the only method of that name, when the argument count fits it;
//!    failing that, a property accessor when there is no such method and
//!    at most one argument (getter for none, setter for one);
//! 2. methods taking exactly as many parameters as there are arguments;
//! 3. methods whose first unsupplied parameter is optional.

use std::sync::Arc;

use tracing::debug;

use crate::catalog::{MemberDescriptor, TypeDescriptor};
use crate::coerce::coerce;
use crate::datatype::{ParsedValue, TypeTag};
use crate::error::{InvokeError, Result};
use crate::fields;
use crate::trace::{Stage, StepTrace};

/// A selected member together with its ready-to-pass arguments.
#[derive(Debug, Clone)]
pub struct Matched {
    pub member: Arc<MemberDescriptor>,
    pub args: Vec<ParsedValue>,
}

/// Coerces `args` against the parameters of `candidate`, filling unsupplied
/// optional parameters with their defaults.
pub fn bind(candidate: &MemberDescriptor, args: &[String], trace: &mut StepTrace) -> Result<Vec<ParsedValue>> {
    let parameters = candidate.parameters();
    if args.len() > parameters.len() {
        return Err(InvokeError::ArgumentCoercionFailed {
            index: parameters.len(),
            text: args[parameters.len()].clone(),
            target: parameters.last().map_or(TypeTag::String, |p| p.tag().clone()),
        });
    }
    let mut bound = Vec::with_capacity(parameters.len());
    for (index, parameter) in parameters.iter().enumerate() {
        match (args.get(index), parameter.default_value()) {
            (Some(text), _) => {
                let coerced = coerce(text, parameter.tag());
                trace.record_with(
                    Stage::Coerce,
                    format!("Match Parameter:  {text}  =>  {} / {},    {}", parameter.name(), parameter.tag(), coerced.is_some()),
                    fields! { "index" => index, "text" => text, "parameter" => parameter.name(), "tag" => parameter.tag(), "matched" => coerced.is_some() },
                );
                match coerced {
                    Some(value) => bound.push(value),
                    None => {
                        return Err(InvokeError::ArgumentCoercionFailed {
                            index,
                            text: text.clone(),
                            target: parameter.tag().clone(),
                        });
                    }
                }
            }
            (None, Some(default)) => {
                trace.record_with(
                    Stage::Coerce,
                    format!("Optional Parameter:  {default}  =>  {} / {}", parameter.name(), parameter.tag()),
                    fields! { "index" => index, "parameter" => parameter.name(), "default" => default },
                );
                bound.push(default.clone());
            }
            (None, None) => {
                return Err(InvokeError::ArgumentCoercionFailed {
                    index,
                    text: String::new(),
                    target: parameter.tag().clone(),
                });
            }
        }
    }
    Ok(bound)
}

// Keeps track of the candidates tried so far and the last reason one was rejected.
struct Attempts<'a> {
    tried: Vec<&'a Arc<MemberDescriptor>>,
    last_failure: Option<InvokeError>,
}

impl<'a> Attempts<'a> {
    fn try_bind(&mut self, candidate: &'a Arc<MemberDescriptor>, args: &[String], trace: &mut StepTrace) -> Option<Matched> {
        if self.tried.iter().any(|t| Arc::ptr_eq(t, candidate)) {
            return None;
        }
        self.tried.push(candidate);
        trace.record_with(
            Stage::Match,
            format!("Candidate:  {candidate}"),
            fields! { "candidate" => candidate.to_string(), "arguments" => args.len() },
        );
        match bind(candidate, args, trace) {
            Ok(bound) => Some(Matched { member: Arc::clone(candidate), args: bound }),
            Err(e) => {
                debug!(candidate = %candidate, error = %e, "candidate rejected");
                self.last_failure = Some(e);
                None
            }
        }
    }
}

/// Finds the member of `ty` called `name` that accepts `args`.
pub fn match_member(ty: &TypeDescriptor, name: &str, args: &[String], trace: &mut StepTrace) -> Result<Matched> {
    let methods: Vec<&Arc<MemberDescriptor>> = ty.methods_named(name).collect();
    let mut attempts = Attempts { tried: Vec::new(), last_failure: None };

    // tier 1
    match methods.as_slice() {
        [only] => {
            if only.accepts_count(args.len()) {
                if let Some(found) = attempts.try_bind(only, args, trace) {
                    return Ok(found);
                }
            }
        }
        [] if args.len() <= 1 => {
            if let Some(property) = ty.property(name) {
                trace.record(Stage::Match, "No method found, try match as property name");
                let accessor = if args.is_empty() { property.get_accessor() } else { property.set_accessor() };
                if let Some(accessor) = accessor {
                    if let Some(found) = attempts.try_bind(accessor, args, trace) {
                        return Ok(found);
                    }
                }
            }
        }
        [] => (),
        _ => trace.record_with(
            Stage::Match,
            format!("{} overloads named {name}, matching by argument count", methods.len()),
            fields! { "overloads" => methods.len() },
        ),
    }

    // tier 2
    for candidate in methods.iter().filter(|m| m.parameters().len() == args.len()) {
        if let Some(found) = attempts.try_bind(candidate, args, trace) {
            return Ok(found);
        }
    }

    // tier 3
    for candidate in methods
        .iter()
        .filter(|m| m.parameters().len() > args.len() && m.parameters()[args.len()].is_optional())
    {
        if let Some(found) = attempts.try_bind(candidate, args, trace) {
            return Ok(found);
        }
    }

    let error = match (attempts.tried.len(), attempts.last_failure) {
        (1, Some(failure)) => failure,
        (0, _) | (_, None) => InvokeError::MemberNotFound {
            type_name: ty.name().to_owned(),
            member: name.to_owned(),
        },
        (tried, Some(_)) => InvokeError::AmbiguousOverloadUnresolved {
            member: format!("{}.{name}", ty.name()),
            candidates: tried,
        },
    };
    trace.record_with(
        Stage::Failure,
        format!("Method Not Found:  {error}"),
        fields! { "kind" => error.kind(), "tried" => attempts.tried.len() },
    );
    Err(error)
}
