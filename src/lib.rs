//! Invoker – call registered members by name from a batch command line.
//!
//! A command line such as
//!
//! ```text
//! invoker -invokeLog trace.jsonl -invoke Normal.Test_Int 123 -next Normal.Test_Array [1,2,3]
//! ```
//!
//! names a member (`Type.Member`, optionally `Scope:Type.Member`) and hands it
//! text arguments. The invoker finds the type in a [`catalog::Catalog`], picks
//! the overload whose parameters the text can be coerced into, calls it and
//! reports the outcome through a structured trace and the exit code.
//!
//! ## Modules
//! * [`catalog`] – Scopes, type and member descriptors, and type resolution
//!   along a configurable search order.
//! * [`datatype`] – The closed [`datatype::TypeTag`] union, coerced
//!   [`datatype::ParsedValue`]s and enum descriptors with explicit values.
//! * [`coerce`] – Text to value conversion (primitives, enum bit combinations
//!   written `A|B`, one-level arrays written `[a,b,c]`).
//! * [`matcher`] – Tiered overload selection, first match in declaration order.
//! * [`executor`] – The [`executor::Invoker`] tying resolution, matching and
//!   invocation together; callee errors and panics become `CalleeFault`.
//! * [`trace`] – Per-step trace records, flushed when the step ends.
//! * [`chain`] – `-next` separated calls run in order; the first failure
//!   aborts the rest of the chain.
//! * [`settings`] – Search order and entry marker, read with `config`.
//! * [`samples`] – A demonstration catalog used by the binary and the tests.
//!
//! ## Registering members
//! Members are plain closures over the coerced arguments. Parameters are
//! declared with their [`datatype::TypeTag`]; optional parameters carry their
//! default value and must come last.
//!
//! ## Quick Start
//! ```
//! use invoker::catalog::{Catalog, MemberDescriptor, Scope, SearchOrder, TypeDescriptor};
//! use invoker::datatype::{ParsedValue, TypeTag, arg};
//! use invoker::executor::Invoker;
//! use invoker::trace::TraceSink;
//!
//! let mut main = Scope::new("Main");
//! main.keep(TypeDescriptor::new("Math").with_method(
//!     MemberDescriptor::method("Negate")
//!         .param("val", TypeTag::Int)
//!         .returns(TypeTag::Int)
//!         .call(|args| Ok(Some(ParsedValue::Int(-arg::<i64>(args, 0)?)))),
//! )).unwrap();
//! let mut catalog = Catalog::new();
//! catalog.keep(main).unwrap();
//!
//! let invoker = Invoker::new(&catalog, SearchOrder::default());
//! let mut sink = TraceSink::buffered();
//! let tokens: Vec<String> = ["Math.Negate", "10"].iter().map(|s| s.to_string()).collect();
//! let value = invoker.invoke_with_args(&tokens, &mut sink.begin_step()).unwrap();
//! assert_eq!(value, Some(ParsedValue::Int(-10)));
//! ```

pub mod catalog;
pub mod chain;
pub mod coerce;
pub mod datatype;
pub mod error;
pub mod executor;
pub mod matcher;
pub mod samples;
pub mod settings;
pub mod target;
pub mod trace;
