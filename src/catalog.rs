use std::sync::Arc;

// the catalog keepers use HashMaps with a fast hasher
use core::hash::BuildHasherDefault;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use seahash::SeaHasher;

// used to print out readable forms of a descriptor
use std::fmt;

// the search order is part of the settings
use serde::Deserialize;

// our own stuff that we need
use crate::datatype::{ParsedValue, TypeTag};
use crate::error::{InvokeError, Result};

pub type NameHasher = BuildHasherDefault<SeaHasher>;

/// The handle through which a registered member is actually called.
pub type Callable =
    Arc<dyn Fn(&[ParsedValue]) -> anyhow::Result<Option<ParsedValue>> + Send + Sync>;

// type and scope names are looked up without regard to ASCII case
fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

// ------------- Parameter -------------
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    tag: TypeTag,
    default: Option<ParsedValue>,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
    pub fn default_value(&self) -> Option<&ParsedValue> {
        self.default.as_ref()
    }
}

// ------------- Member -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Getter,
    Setter,
}

pub struct MemberDescriptor {
    name: String,
    kind: MemberKind,
    parameters: Vec<Parameter>,
    returns: Option<TypeTag>,
    is_static: bool,
    callable: Callable,
}

impl MemberDescriptor {
    pub fn method(name: impl Into<String>) -> MemberBuilder {
        MemberBuilder::new(name.into(), MemberKind::Method)
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> MemberKind {
        self.kind
    }
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
    pub fn returns(&self) -> Option<&TypeTag> {
        self.returns.as_ref()
    }
    pub fn is_static(&self) -> bool {
        self.is_static
    }
    /// True when `supplied` arguments leave no mandatory parameter unfilled
    /// and do not exceed the parameter list.
    pub fn accepts_count(&self, supplied: usize) -> bool {
        supplied <= self.parameters.len()
            && self.parameters[supplied..].iter().all(Parameter::is_optional)
    }
    pub fn call(&self, args: &[ParsedValue]) -> anyhow::Result<Option<ParsedValue>> {
        (self.callable)(args)
    }
    fn validate(&self, owner: &str) -> Result<()> {
        let fail = |why: String| -> Result<()> {
            Err(InvokeError::Registration(format!("{owner}.{}: {why}", self.name)))
        };
        let mut seen_optional = false;
        for p in &self.parameters {
            if let TypeTag::Array(element) = &p.tag {
                if !element.is_scalar() {
                    return fail(format!("parameter {} nests arrays", p.name));
                }
            }
            match &p.default {
                Some(default) if default.tag() != p.tag => {
                    return fail(format!("default of {} is {} not {}", p.name, default.tag(), p.tag));
                }
                Some(_) => seen_optional = true,
                None if seen_optional => {
                    return fail(format!("mandatory parameter {} follows an optional one", p.name));
                }
                None => (),
            }
        }
        Ok(())
    }
}
impl fmt::Display for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| match &p.default {
                Some(d) => format!("{}: {} = {}", p.name, p.tag, d),
                None => format!("{}: {}", p.name, p.tag),
            })
            .collect();
        write!(f, "{}({})", self.name, params.join(", "))?;
        if let Some(r) = &self.returns {
            write!(f, " -> {r}")?;
        }
        Ok(())
    }
}
impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .field("returns", &self.returns)
            .field("is_static", &self.is_static)
            .finish_non_exhaustive()
    }
}

pub struct MemberBuilder {
    name: String,
    kind: MemberKind,
    parameters: Vec<Parameter>,
    returns: Option<TypeTag>,
    is_static: bool,
}

impl MemberBuilder {
    fn new(name: String, kind: MemberKind) -> Self {
        Self { name, kind, parameters: Vec::new(), returns: None, is_static: true }
    }
    pub fn param(mut self, name: impl Into<String>, tag: TypeTag) -> Self {
        self.parameters.push(Parameter { name: name.into(), tag, default: None });
        self
    }
    pub fn optional(mut self, name: impl Into<String>, tag: TypeTag, default: ParsedValue) -> Self {
        self.parameters.push(Parameter { name: name.into(), tag, default: Some(default) });
        self
    }
    pub fn returns(mut self, tag: TypeTag) -> Self {
        self.returns = Some(tag);
        self
    }
    /// Instance members are kept in the catalog but never matched.
    pub fn instance(mut self) -> Self {
        self.is_static = false;
        self
    }
    pub fn call<F>(self, callable: F) -> MemberDescriptor
    where
        F: Fn(&[ParsedValue]) -> anyhow::Result<Option<ParsedValue>> + Send + Sync + 'static,
    {
        MemberDescriptor {
            name: self.name,
            kind: self.kind,
            parameters: self.parameters,
            returns: self.returns,
            is_static: self.is_static,
            callable: Arc::new(callable),
        }
    }
}

// ------------- Property -------------
/// A named value exposed through a getter, a setter, or both.
#[derive(Debug)]
pub struct PropertyDescriptor {
    name: String,
    tag: TypeTag,
    getter: Option<Arc<MemberDescriptor>>,
    setter: Option<Arc<MemberDescriptor>>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, tag: TypeTag) -> Self {
        Self { name: name.into(), tag, getter: None, setter: None }
    }
    pub fn getter<F>(mut self, get: F) -> Self
    where
        F: Fn() -> anyhow::Result<ParsedValue> + Send + Sync + 'static,
    {
        let accessor = MemberBuilder::new(format!("get_{}", self.name), MemberKind::Getter)
            .returns(self.tag.clone())
            .call(move |_| get().map(Some));
        self.getter = Some(Arc::new(accessor));
        self
    }
    pub fn setter<F>(mut self, set: F) -> Self
    where
        F: Fn(&ParsedValue) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let accessor = MemberBuilder::new(format!("set_{}", self.name), MemberKind::Setter)
            .param("value", self.tag.clone())
            .call(move |args| {
                let value = args
                    .first()
                    .ok_or_else(|| anyhow::anyhow!("setter called without a value"))?;
                set(value).map(|_| None)
            });
        self.setter = Some(Arc::new(accessor));
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }
    pub fn get_accessor(&self) -> Option<&Arc<MemberDescriptor>> {
        self.getter.as_ref()
    }
    pub fn set_accessor(&self) -> Option<&Arc<MemberDescriptor>> {
        self.setter.as_ref()
    }
}

// ------------- Type -------------
#[derive(Debug)]
pub struct TypeDescriptor {
    name: String,
    scope: String,
    methods: Vec<Arc<MemberDescriptor>>,
    properties: Vec<PropertyDescriptor>,
}

impl TypeDescriptor {
    /// `name` is the qualified name, namespaces separated by `.` and nested
    /// types by `+`, e.g. `TopNS.SubNS.Outter+Nest`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), scope: String::new(), methods: Vec::new(), properties: Vec::new() }
    }
    pub fn with_method(mut self, method: MemberDescriptor) -> Self {
        self.methods.push(Arc::new(method));
        self
    }
    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn scope(&self) -> &str {
        &self.scope
    }
    /// Static methods called `name`, in declaration order.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<MemberDescriptor>> + 'a {
        self.methods.iter().filter(move |m| m.is_static() && m.name() == name)
    }
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
    fn validate(&self) -> Result<()> {
        for m in &self.methods {
            m.validate(&self.name)?;
        }
        for p in &self.properties {
            if let TypeTag::Array(element) = &p.tag {
                if !element.is_scalar() {
                    return Err(InvokeError::Registration(format!("{}.{} nests arrays", self.name, p.name)));
                }
            }
        }
        Ok(())
    }
}

// ------------- Scope -------------
/// A named module of types, the unit a scope hint (`Scope:Type.Member`) selects.
#[derive(Debug)]
pub struct Scope {
    name: String,
    kept: HashMap<String, Arc<TypeDescriptor>, NameHasher>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), kept: HashMap::default() }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn keep(&mut self, mut descriptor: TypeDescriptor) -> Result<Arc<TypeDescriptor>> {
        descriptor.validate()?;
        descriptor.scope = self.name.clone();
        match self.kept.entry(fold(&descriptor.name)) {
            Entry::Occupied(_) => Err(InvokeError::Registration(format!(
                "type {} is already kept in scope {}",
                descriptor.name, self.name
            ))),
            Entry::Vacant(e) => Ok(Arc::clone(e.insert(Arc::new(descriptor)))),
        }
    }
    pub fn get(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.kept.get(&fold(type_name)).cloned()
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

// ------------- Search Order -------------
/// Where to look for a type when the caller does not name a scope.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchOrder {
    pub global_scope: String,
    pub primary_scope: String,
    pub secondary_scopes: Vec<String>,
    /// Type names starting with one of these are only searched for in scopes
    /// whose name starts with the prefix root, e.g. `Engine.` → `Engine*`.
    pub reserved_prefixes: Vec<String>,
}

impl Default for SearchOrder {
    fn default() -> Self {
        Self {
            global_scope: "Host".into(),
            primary_scope: "Main".into(),
            secondary_scopes: vec!["Plugins-Editor".into(), "Plugins".into()],
            reserved_prefixes: vec!["Engine.".into(), "Editor.".into()],
        }
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

// ------------- Catalog -------------
/// Every discoverable scope, in registration order.
#[derive(Debug, Default)]
pub struct Catalog {
    scopes: Vec<Arc<Scope>>,
    lookup: HashMap<String, usize, NameHasher>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn keep(&mut self, scope: Scope) -> Result<Arc<Scope>> {
        match self.lookup.entry(fold(&scope.name)) {
            Entry::Occupied(_) => Err(InvokeError::Registration(format!("scope {} is already kept", scope.name))),
            Entry::Vacant(e) => {
                e.insert(self.scopes.len());
                let scope = Arc::new(scope);
                self.scopes.push(Arc::clone(&scope));
                Ok(scope)
            }
        }
    }
    pub fn scope(&self, name: &str) -> Option<&Arc<Scope>> {
        self.lookup.get(&fold(name)).map(|i| &self.scopes[*i])
    }
    pub fn scopes(&self) -> impl Iterator<Item = &Arc<Scope>> {
        self.scopes.iter()
    }
    pub fn find(&self, scope: &str, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.scope(scope)?.get(type_name)
    }
    /// Finds a type, either in the hinted scope only or along the search
    /// order. `attempt` is told about every scope that gets searched.
    pub fn resolve(
        &self,
        order: &SearchOrder,
        scope_hint: Option<&str>,
        type_name: &str,
        mut attempt: impl FnMut(&str),
    ) -> Result<Arc<TypeDescriptor>> {
        if let Some(hint) = scope_hint {
            attempt(hint);
            return self
                .find(hint, type_name)
                .ok_or_else(|| InvokeError::TypeNotFound(format!("{hint}:{type_name}")));
        }
        if let Some(prefix) = order
            .reserved_prefixes
            .iter()
            .find(|p| starts_with_ignore_case(type_name, p))
        {
            let root = prefix.split('.').next().unwrap_or(prefix);
            for scope in self.scopes.iter().filter(|s| starts_with_ignore_case(&s.name, root)) {
                attempt(&scope.name);
                if let Some(found) = scope.get(type_name) {
                    return Ok(found);
                }
            }
            return Err(InvokeError::TypeNotFound(type_name.to_owned()));
        }
        let mut order_of_search: Vec<&str> = vec![order.global_scope.as_str(), order.primary_scope.as_str()];
        if let Some((first, _)) = type_name.split_once('.') {
            order_of_search.push(first);
        }
        order_of_search.extend(order.secondary_scopes.iter().map(String::as_str));
        for scope in order_of_search {
            attempt(scope);
            if let Some(found) = self.find(scope, type_name) {
                return Ok(found);
            }
        }
        Err(InvokeError::TypeNotFound(type_name.to_owned()))
    }
}
