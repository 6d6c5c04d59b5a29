//! A bundled catalog of demonstration types.
//!
//! It is what the `invoker` binary dispatches into and doubles as a fixture
//! for the integration tests. Every callable logs what it received.
//!
//! | scope            | types                                                       |
//! |------------------|-------------------------------------------------------------|
//! | `Host`           | `InvokeTestEditor`                                          |
//! | `Main`           | `Normal`, `Outer+Nest`, `TopNS.SubNS.Outter+Nest`, `InvokeTest` |
//! | `Plugins-Editor` | `InvokeTestPluginsEditor`                                   |
//! | `Plugins`        | `InvokeTestPlugins`                                         |
//! | `System`         | `System.Environment`                                        |
//! | `Engine.Core`    | `Engine.Application`                                        |
//! | `Editor`         | `Editor.EditorUtility`, `Editor.EditorUserBuildSettings`    |

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tracing::info;

use crate::catalog::{Catalog, MemberDescriptor, PropertyDescriptor, Scope, TypeDescriptor};
use crate::datatype::{DataType, EnumDescriptor, ParsedValue, TypeTag, arg};
use crate::error::Result;

fn done() -> anyhow::Result<Option<ParsedValue>> {
    Ok(None)
}

// enum arguments have no Rust type of their own, they arrive as their value
fn enum_arg(args: &[ParsedValue], index: usize, descriptor: &EnumDescriptor) -> anyhow::Result<i64> {
    args.get(index)
        .and_then(ParsedValue::as_enum)
        .ok_or_else(|| anyhow!("argument {index} is not a {}", descriptor.name()))
}

fn normal() -> Result<TypeDescriptor> {
    let custom = EnumDescriptor::new("CustomEnumType", [("Type0", 0), ("Type1", 1)])?;
    let flags = EnumDescriptor::new(
        "FlagsEnumType",
        [("None", 0), ("Read", 1), ("Write", 2), ("Execute", 4)],
    )?;
    let enum_name = Arc::clone(&custom);
    let flags_name = Arc::clone(&flags);
    let property = Arc::new(Mutex::new(String::from("Test_Property")));
    let stored = Arc::clone(&property);

    Ok(TypeDescriptor::new("Normal")
        .with_method(MemberDescriptor::method("Test_Void").call(|_| {
            info!("[InvokeExamples] Normal.Test_Void");
            done()
        }))
        .with_method(MemberDescriptor::method("Test_Int").param("val", TypeTag::Int).call(|args| {
            info!("[InvokeExamples] Normal.Test_Int(int val) val = {}", arg::<i64>(args, 0)?);
            done()
        }))
        .with_method(MemberDescriptor::method("Test_String").param("val", TypeTag::String).call(|args| {
            info!("[InvokeExamples] Normal.Test_String(string val) val = {}", arg::<String>(args, 0)?);
            done()
        }))
        .with_method(
            MemberDescriptor::method("Test_Enum")
                .param("val", TypeTag::enumeration(&custom))
                .call(move |args| {
                    let value = enum_arg(args, 0, &enum_name)?;
                    info!("[InvokeExamples] Normal.Test_Enum(CustomEnumType val) val = {}", enum_name.render(value));
                    done()
                }),
        )
        .with_method(
            MemberDescriptor::method("Test_Flags")
                .param("val", TypeTag::enumeration(&flags))
                .returns(TypeTag::Int)
                .call(move |args| {
                    let value = enum_arg(args, 0, &flags_name)?;
                    info!("[InvokeExamples] Normal.Test_Flags(FlagsEnumType val) val = {}", flags_name.render(value));
                    Ok(Some(ParsedValue::Int(value)))
                }),
        )
        .with_method(
            MemberDescriptor::method("Test_Optional")
                .param("val", TypeTag::Float)
                .optional("opt", TypeTag::Int, ParsedValue::Int(100))
                .returns(TypeTag::Int)
                .call(|args| {
                    let (val, opt) = (arg::<f64>(args, 0)?, arg::<i64>(args, 1)?);
                    info!("[InvokeExamples] Normal.Test_Optional(float val, int opt = 100) val = {val}, opt = {opt}");
                    Ok(Some(ParsedValue::Int(opt)))
                }),
        )
        .with_method(
            MemberDescriptor::method("Test_Array")
                .param("val", Vec::<i64>::tag())
                .returns(TypeTag::Int)
                .call(|args| {
                    let values = arg::<Vec<i64>>(args, 0)?;
                    info!("[InvokeExamples] Normal.Test_Array(int[] val) val = {values:?}");
                    Ok(Some(ParsedValue::Int(values.len() as i64)))
                }),
        )
        .with_method(
            MemberDescriptor::method("Test_ReturnValue")
                .param("val", TypeTag::Int)
                .returns(TypeTag::Int)
                .call(|args| {
                    let val = arg::<i64>(args, 0)?;
                    info!("[InvokeExamples] Normal.Test_ReturnValue(int val) val = {val}, return value is: {}", -val);
                    Ok(Some((-val).into_value()))
                }),
        )
        .with_method(MemberDescriptor::method("Test_Exception").call(|_| {
            info!("[InvokeExamples] Normal.Test_Exception");
            Err(anyhow!("test exception intentionally made in method Normal.Test_Exception"))
        }))
        .with_property(
            PropertyDescriptor::new("Test_Property", TypeTag::String)
                .getter(move || {
                    info!("[InvokeExamples] Normal.Test_Property get property method");
                    let value = property.lock().map_err(|e| anyhow!("{e}"))?;
                    Ok(ParsedValue::Str(value.clone()))
                })
                .setter(move |value| {
                    info!("[InvokeExamples] Normal.Test_Property set property method value = {value}");
                    *stored.lock().map_err(|e| anyhow!("{e}"))? = value.to_string();
                    Ok(())
                }),
        )
        .with_method(MemberDescriptor::method("Test_Overload").call(|_| {
            info!("[InvokeExamples] Normal.Test_Overload(void)");
            done()
        }))
        .with_method(MemberDescriptor::method("Test_Overload").param("val", TypeTag::Bool).returns(TypeTag::String).call(|args| {
            info!("[InvokeExamples] Normal.Test_Overload(bool val), val = {}", arg::<bool>(args, 0)?);
            Ok(Some(ParsedValue::Str("bool".into())))
        }))
        .with_method(MemberDescriptor::method("Test_Overload").param("val", TypeTag::Int).returns(TypeTag::String).call(|args| {
            info!("[InvokeExamples] Normal.Test_Overload(int val), val = {}", arg::<i64>(args, 0)?);
            Ok(Some(ParsedValue::Str("int".into())))
        }))
        .with_method(MemberDescriptor::method("Test_Overload").param("val", TypeTag::String).returns(TypeTag::String).call(|args| {
            info!("[InvokeExamples] Normal.Test_Overload(string val), val = {}", arg::<String>(args, 0)?);
            Ok(Some(ParsedValue::Str("string".into())))
        })))
}

fn echo_int(label: &'static str) -> MemberDescriptor {
    MemberDescriptor::method(label.rsplit('.').next().unwrap_or(label))
        .param("val", TypeTag::Int)
        .returns(TypeTag::Int)
        .call(move |args| {
            let val = arg::<i64>(args, 0)?;
            info!("[InvokeExamples] {label}(int val) val = {val}");
            Ok(Some(ParsedValue::Int(val)))
        })
}

fn announce(type_name: &str, method: &'static str) -> TypeDescriptor {
    let label = format!("[InvokeExamples] {type_name}.{method}(void) is called");
    TypeDescriptor::new(type_name).with_method(MemberDescriptor::method(method).call(move |_| {
        info!("{label}");
        done()
    }))
}

fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes.abs() < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size.abs() >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

fn editor_scope() -> Result<Scope> {
    let build_target = EnumDescriptor::new(
        "BuildTarget",
        [("StandaloneOSX", 2), ("StandaloneWindows", 5), ("iOS", 9), ("Android", 13), ("StandaloneLinux64", 24)],
    )?;
    let active = Arc::new(Mutex::new(5_i64));
    let (read, write) = (Arc::clone(&active), Arc::clone(&active));
    let ty = Arc::clone(&build_target);

    let mut editor = Scope::new("Editor");
    editor.keep(TypeDescriptor::new("Editor.EditorUtility").with_method(
        MemberDescriptor::method("FormatBytes")
            .param("bytes", TypeTag::Int)
            .returns(TypeTag::String)
            .call(|args| Ok(Some(ParsedValue::Str(format_bytes(arg::<i64>(args, 0)?))))),
    ))?;
    editor.keep(
        TypeDescriptor::new("Editor.EditorUserBuildSettings").with_property(
            PropertyDescriptor::new("activeBuildTarget", TypeTag::enumeration(&build_target))
                .getter(move || {
                    let value = *read.lock().map_err(|e| anyhow!("{e}"))?;
                    Ok(ParsedValue::Enum { ty: Arc::clone(&ty), value })
                })
                .setter(move |value| {
                    let value = value.as_enum().ok_or_else(|| anyhow!("expected a BuildTarget"))?;
                    *write.lock().map_err(|e| anyhow!("{e}"))? = value;
                    Ok(())
                }),
        ),
    )?;
    Ok(editor)
}

/// Builds the demonstration catalog.
pub fn sample_catalog() -> Result<Catalog> {
    let mut host = Scope::new("Host");
    host.keep(announce("InvokeTestEditor", "Test_RuntimeEditor"))?;

    let mut main = Scope::new("Main");
    main.keep(normal()?)?;
    main.keep(TypeDescriptor::new("Outer+Nest").with_method(echo_int("Outer.Nest.Test_Nest")))?;
    main.keep(
        TypeDescriptor::new("TopNS.SubNS.Outter+Nest").with_method(echo_int("TopNS.SubNS.Outter+Nest.Test_NameSpace")),
    )?;
    main.keep(announce("InvokeTest", "Test_Runtime"))?;

    let mut plugins_editor = Scope::new("Plugins-Editor");
    plugins_editor.keep(announce("InvokeTestPluginsEditor", "Test_PluginsEditor"))?;

    let mut plugins = Scope::new("Plugins");
    plugins.keep(announce("InvokeTestPlugins", "Test_Plugins"))?;

    let mut system = Scope::new("System");
    system.keep(
        TypeDescriptor::new("System.Environment")
            .with_property(PropertyDescriptor::new("CurrentDirectory", TypeTag::String).getter(|| {
                let dir = std::env::current_dir()?;
                Ok(ParsedValue::Str(dir.display().to_string()))
            }))
            .with_method(
                MemberDescriptor::method("GetEnvironmentVariable")
                    .param("variable", TypeTag::String)
                    .returns(TypeTag::String)
                    .call(|args| {
                        let name = arg::<String>(args, 0)?;
                        Ok(std::env::var(name).ok().map(ParsedValue::Str))
                    }),
            ),
    )?;

    let mut engine = Scope::new("Engine.Core");
    engine.keep(TypeDescriptor::new("Engine.Application").with_property(
        PropertyDescriptor::new("dataPath", TypeTag::String).getter(|| {
            let dir = std::env::current_dir()?.join("Assets");
            Ok(ParsedValue::Str(dir.display().to_string()))
        }),
    ))?;

    let mut catalog = Catalog::new();
    for scope in [host, main, plugins_editor, plugins, system, engine, editor_scope()?] {
        catalog.keep(scope)?;
    }
    Ok(catalog)
}
