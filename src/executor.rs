use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::{Catalog, SearchOrder, TypeDescriptor};
use crate::datatype::ParsedValue;
use crate::error::{InvokeError, Result};
use crate::fields;
use crate::matcher::{self, Matched};
use crate::target::Target;
use crate::trace::{Stage, StepTrace};

/// One call of a chain: where to go and the raw text to take along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub target: Target,
    pub args: Vec<String>,
}

impl InvocationRequest {
    /// Builds a request from a call's tokens, the first being the target.
    pub fn from_tokens(tokens: &[String]) -> Result<Self> {
        let (first, rest) = tokens
            .split_first()
            .ok_or_else(|| InvokeError::InvalidCommandLine("insufficient arguments".into()))?;
        Ok(Self { target: Target::parse(first)?, args: rest.to_vec() })
    }
}

pub type InvocationResult = Result<Option<ParsedValue>>;

/// Resolves, matches and invokes members of a catalog.
pub struct Invoker<'c> {
    catalog: &'c Catalog,
    order: SearchOrder,
}

impl<'c> Invoker<'c> {
    pub fn new(catalog: &'c Catalog, order: SearchOrder) -> Self {
        Self { catalog, order }
    }
    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }
    pub fn search_order(&self) -> &SearchOrder {
        &self.order
    }

    pub fn resolve(&self, scope_hint: Option<&str>, type_name: &str, trace: &mut StepTrace) -> Result<Arc<TypeDescriptor>> {
        let resolved = self.catalog.resolve(&self.order, scope_hint, type_name, |scope| {
            trace.record_with(
                Stage::Resolve,
                format!("Lookup:  {type_name}, {scope}"),
                fields! { "type" => type_name, "scope" => scope },
            );
        });
        match &resolved {
            Ok(found) => trace.record_with(
                Stage::Resolve,
                format!("Type Resolved:  {}, {}", found.name(), found.scope()),
                fields! { "type" => found.name(), "scope" => found.scope() },
            ),
            Err(e) => trace.record_with(
                Stage::Failure,
                "Type Not Found",
                fields! { "kind" => e.kind(), "type" => type_name, "scope" => scope_hint },
            ),
        }
        resolved
    }

    pub fn match_member(&self, ty: &TypeDescriptor, member: &str, args: &[String], trace: &mut StepTrace) -> Result<Matched> {
        let matched = matcher::match_member(ty, member, args, trace)?;
        trace.record_with(
            Stage::Match,
            format!("Method Matched:  {}", matched.member.name()),
            fields! { "member" => matched.member.to_string(), "args" => &matched.args },
        );
        Ok(matched)
    }

    /// Calls the matched member. Errors and panics raised by the callee come
    /// back as `CalleeFault` carrying the callee's own message.
    pub fn invoke(&self, matched: &Matched, trace: &mut StepTrace) -> InvocationResult {
        let member = &matched.member;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| member.call(&matched.args)));
        let result = match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(InvokeError::CalleeFault { member: member.name().to_owned(), message: format!("{e:#}") }),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "callee panicked".into());
                Err(InvokeError::CalleeFault { member: member.name().to_owned(), message })
            }
        };
        match &result {
            Ok(value) => {
                let shown = value.as_ref().map_or_else(|| "(none)".to_owned(), ParsedValue::to_string);
                debug!(member = member.name(), result = %shown, "invoked");
                trace.record_with(
                    Stage::Invoke,
                    format!("Invoke Result:  {shown}"),
                    fields! { "member" => member.name(), "value" => value },
                );
            }
            Err(e) => {
                warn!(member = member.name(), error = %e, "callee fault");
                trace.record_with(
                    Stage::Failure,
                    format!("Invoke Fault:  {e}"),
                    fields! { "kind" => e.kind(), "member" => member.name() },
                );
            }
        }
        result
    }

    /// Runs one request through resolution, matching and invocation.
    pub fn execute(&self, request: &InvocationRequest, trace: &mut StepTrace) -> InvocationResult {
        let target = &request.target;
        trace.record_with(
            Stage::Request,
            format!(
                "Invoke:  {}{}.{}",
                target.scope.as_deref().map(|s| format!("{s}:")).unwrap_or_default(),
                target.type_name,
                target.member
            ),
            fields! {
                "scope" => &target.scope,
                "type" => &target.type_name,
                "member" => &target.member,
                "args" => &request.args,
            },
        );
        for (i, arg) in request.args.iter().enumerate() {
            trace.record(Stage::Request, format!("[{i}]  =>  {arg}"));
        }
        let ty = self.resolve(target.scope.as_deref(), &target.type_name, trace)?;
        let matched = self.match_member(&ty, &target.member, &request.args, trace)?;
        self.invoke(&matched, trace)
    }

    /// Invokes a call given as explicit tokens, target first, and hands back
    /// the callee's return value.
    pub fn invoke_with_args(&self, tokens: &[String], trace: &mut StepTrace) -> InvocationResult {
        let request = match InvocationRequest::from_tokens(tokens) {
            Ok(request) => request,
            Err(e) => {
                trace.record_with(Stage::Failure, format!("{e}"), fields! { "kind" => e.kind(), "tokens" => tokens });
                return Err(e);
            }
        };
        self.execute(&request, trace)
    }
}
