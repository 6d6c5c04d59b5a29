use invoker::catalog::{Catalog, MemberDescriptor, Scope, SearchOrder, TypeDescriptor};
use invoker::error::InvokeError;
use invoker::executor::Invoker;
use invoker::samples::sample_catalog;
use invoker::settings::Settings;
use invoker::target::Target;
use invoker::trace::{Stage, TraceSink};

fn scope_of(catalog: &Catalog, hint: Option<&str>, type_name: &str) -> Result<String, InvokeError> {
    let invoker = Invoker::new(catalog, SearchOrder::default());
    let mut sink = TraceSink::buffered();
    let found = invoker.resolve(hint, type_name, &mut sink.begin_step())?;
    Ok(found.scope().to_owned())
}

#[test]
fn search_order_is_global_primary_namespace_then_secondary() {
    let catalog = sample_catalog().unwrap();
    assert_eq!(scope_of(&catalog, None, "InvokeTestEditor").unwrap(), "Host");
    assert_eq!(scope_of(&catalog, None, "Normal").unwrap(), "Main");
    assert_eq!(scope_of(&catalog, None, "System.Environment").unwrap(), "System");
    assert_eq!(scope_of(&catalog, None, "InvokeTestPluginsEditor").unwrap(), "Plugins-Editor");
    assert_eq!(scope_of(&catalog, None, "InvokeTestPlugins").unwrap(), "Plugins");
    assert_eq!(scope_of(&catalog, None, "Outer+Nest").unwrap(), "Main");
    assert_eq!(scope_of(&catalog, None, "TopNS.SubNS.Outter+Nest").unwrap(), "Main");
}

#[test]
fn type_names_ignore_case() {
    let catalog = sample_catalog().unwrap();
    assert_eq!(scope_of(&catalog, None, "normal").unwrap(), "Main");
    assert_eq!(scope_of(&catalog, Some("main"), "NORMAL").unwrap(), "Main");
}

#[test]
fn scope_hint_restricts_the_lookup() {
    let catalog = sample_catalog().unwrap();
    assert_eq!(scope_of(&catalog, Some("Main"), "Normal").unwrap(), "Main");
    assert!(matches!(scope_of(&catalog, Some("Plugins"), "Normal"), Err(InvokeError::TypeNotFound(_))));
    assert!(matches!(scope_of(&catalog, Some("Nowhere"), "Normal"), Err(InvokeError::TypeNotFound(_))));
}

#[test]
fn unknown_type_is_not_found() {
    let catalog = sample_catalog().unwrap();
    assert!(matches!(scope_of(&catalog, None, "Unknown"), Err(InvokeError::TypeNotFound(_))));
}

#[test]
fn reserved_prefix_searches_matching_scopes_only() {
    let mut main = Scope::new("Main");
    main.keep(TypeDescriptor::new("Engine.Hidden").with_method(MemberDescriptor::method("f").call(|_| Ok(None))))
        .unwrap();
    let mut first = Scope::new("Engine.Core");
    first.keep(TypeDescriptor::new("Engine.Time")).unwrap();
    let mut second = Scope::new("EngineExtras");
    second.keep(TypeDescriptor::new("Engine.Time")).unwrap();
    second.keep(TypeDescriptor::new("Engine.Audio")).unwrap();
    let mut catalog = Catalog::new();
    for scope in [main, first, second] {
        catalog.keep(scope).unwrap();
    }
    // first match in registration order
    assert_eq!(scope_of(&catalog, None, "Engine.Time").unwrap(), "Engine.Core");
    assert_eq!(scope_of(&catalog, None, "Engine.Audio").unwrap(), "EngineExtras");
    // the primary scope is not searched for reserved names
    assert!(matches!(scope_of(&catalog, None, "Engine.Hidden"), Err(InvokeError::TypeNotFound(_))));
}

#[test]
fn every_searched_scope_is_traced() {
    let catalog = sample_catalog().unwrap();
    let invoker = Invoker::new(&catalog, SearchOrder::default());
    let mut sink = TraceSink::buffered();
    invoker.resolve(None, "InvokeTestPlugins", &mut sink.begin_step()).unwrap();
    let searched: Vec<String> = sink
        .records()
        .iter()
        .filter(|r| r.stage == Stage::Resolve && r.message.starts_with("Lookup"))
        .map(|r| r.fields["scope"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(searched, vec!["Host", "Main", "Plugins-Editor", "Plugins"]);
}

#[test]
fn duplicate_scopes_are_refused() {
    let mut catalog = Catalog::new();
    catalog.keep(Scope::new("Main")).unwrap();
    assert!(matches!(catalog.keep(Scope::new("MAIN")), Err(InvokeError::Registration(_))));
}

#[test]
fn targets_split_into_scope_type_and_member() {
    let target = Target::parse("Main:TopNS.SubNS.Outter+Nest.Test_NameSpace").unwrap();
    assert_eq!(target.scope.as_deref(), Some("Main"));
    assert_eq!(target.type_name, "TopNS.SubNS.Outter+Nest");
    assert_eq!(target.member, "Test_NameSpace");

    let target = Target::parse("Normal.Test_Int").unwrap();
    assert_eq!(target, Target { scope: None, type_name: "Normal".into(), member: "Test_Int".into() });

    let target = Target::parse("Plugins-Editor:InvokeTestPluginsEditor.Test_PluginsEditor").unwrap();
    assert_eq!(target.scope.as_deref(), Some("Plugins-Editor"));
}

#[test]
fn malformed_targets_are_refused() {
    assert!(matches!(Target::parse("Hello"), Err(InvokeError::MemberNotFound { .. })));
    assert!(matches!(Target::parse("Normal..Test_Int"), Err(InvokeError::Parse { .. })));
    assert!(matches!(Target::parse(":Normal.Test_Int"), Err(InvokeError::Parse { .. })));
    assert!(matches!(Target::parse("Normal.Test Int"), Err(InvokeError::Parse { .. })));
}

#[test]
fn settings_file_overrides_defaults() {
    let path = std::env::temp_dir().join(format!("invoker_settings_{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "entry_marker = \"--call\"\n[search]\nprimary_scope = \"Game\"\nsecondary_scopes = [\"A\", \"B\"]\n",
    )
    .unwrap();
    let settings = Settings::from_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(settings.entry_marker, "--call");
    assert_eq!(settings.search.primary_scope, "Game");
    assert_eq!(settings.search.secondary_scopes, vec!["A", "B"]);
    // untouched keys keep their defaults
    assert_eq!(settings.search.global_scope, SearchOrder::default().global_scope);
    assert_eq!(settings.log_level, "info");
}
