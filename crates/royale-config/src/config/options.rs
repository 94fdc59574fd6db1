use std::path::PathBuf;

use crate::error::ConfigError;
use crate::schema::{ArgContract, ArgType, Deprecation, OptionCall, OptionDescriptor, Schema};

use super::{
    Configuration, DefaultSize, Define, FrameInfo, IncludeFile, LanguageRange, NamespaceMapping, PlayerVersion,
    RslPath, ScriptLimits,
};

/// Token naming the directory relative output files are written to.
pub const DEFAULT_OUTPUT_DIRECTORY_TOKEN: &str = "royale.default.output.directory";

type Descriptor = OptionDescriptor<Configuration>;

fn opt(name: &str, contract: ArgContract) -> Descriptor {
    OptionDescriptor::new(name, contract)
}

fn member(name: &str, contract: ArgContract) -> Descriptor {
    OptionDescriptor::member(name, contract)
}

fn flag(name: &str, apply: fn(&mut Configuration, bool)) -> Descriptor {
    let arg = name.rsplit('.').next().unwrap_or(name).to_string();
    opt(name, ArgContract::boolean(&arg)).on_set(move |c, call| {
        apply(c, call.boolean(0)?);
        Ok(())
    })
}

fn int(name: &str, arg: &str, apply: fn(&mut Configuration, i32)) -> Descriptor {
    opt(name, ArgContract::int(arg)).on_set(move |c, call| {
        apply(c, call.int(0)?);
        Ok(())
    })
}

fn text(name: &str, arg: &str, apply: fn(&mut Configuration, String)) -> Descriptor {
    opt(name, ArgContract::string(arg)).on_set(move |c, call| {
        apply(c, call.string(0)?.to_string());
        Ok(())
    })
}

fn strings(name: &str, arg: &str, apply: fn(&mut Configuration, Vec<String>)) -> Descriptor {
    opt(name, ArgContract::list(arg)).multiple().on_set(move |c, call| {
        apply(c, call.list());
        Ok(())
    })
}

/// Search path entries, expanded and resolved best effort.
fn search_path(name: &str, apply: fn(&mut Configuration, Vec<PathBuf>)) -> Descriptor {
    opt(name, ArgContract::list("path-element"))
        .path()
        .multiple()
        .on_set(move |c, call| {
            let paths = c.expand_paths(call, false);
            apply(c, paths);
            Ok(())
        })
}

fn library_path(name: &str, apply: fn(&mut Configuration, Vec<PathBuf>)) -> Descriptor {
    opt(name, ArgContract::list("path-element"))
        .path()
        .multiple()
        .after(&["locale", "target-player", "exclude-native-js-libraries"])
        .on_set(move |c, call| {
            let tolerate = !c.settings.report_missing_libraries;
            let mut paths = c.expand_paths(call, tolerate);
            if c.exclude_native_js_libraries {
                paths.retain(|p| p.file_name().map_or(true, |n| n != "js.swc"));
            }
            apply(c, paths);
            Ok(())
        })
}

fn missing_argument(call: &OptionCall<'_>, argument: &str) -> ConfigError {
    ConfigError::MissingArgument {
        var: call.var().to_string(),
        argument: argument.to_string(),
        origin: call.origin(),
    }
}

fn removed(name: &str, contract: ArgContract) -> Descriptor {
    opt(name, contract).removed()
}

/// Every option [`Configuration`] accepts, in commit order.
pub fn schema() -> Schema<Configuration> {
    Schema::new()
        // meta options
        .option(flag("royale", |c, v| c.royale = v).hidden().default_value(&["true"]))
        .option(
            opt("load-config", ArgContract::string("filename"))
                .multiple()
                .default_value(&["${royalelib}/${configname}-config.toml"])
                .on_set(|c, call| {
                    let path = c.resolve_lenient(call, call.string(0)?);
                    c.load_config.push(path);
                    Ok(())
                }),
        )
        .option(flag("version", |c, v| c.version = v))
        .option(
            opt("help", ArgContract::list("keyword"))
                .greedy()
                .not_displayed()
                .on_set(|c, call| {
                    c.help.extend(call.list());
                    Ok(())
                }),
        )
        .option(
            opt("dump-config", ArgContract::string("filename"))
                .advanced()
                .on_set(|c, call| {
                    c.dump_config = Some(c.output_path(call, call.string(0)?));
                    Ok(())
                }),
        )
        .option(flag("verbose", |c, v| c.verbose = v).hidden())
        .option(int("diagnostics", "level", |c, v| c.diagnostics = v).hidden())
        .option(flag("warnings", |c, v| c.warnings = v).default_value(&["true"]))
        .option(removed("benchmark", ArgContract::boolean("benchmark")))
        .option(removed("framework", ArgContract::string("name")))
        // player
        .option(
            opt("target-player", ArgContract::string("version"))
                .default_value(&["11.1"])
                .on_set(|c, call| {
                    let text = call.string(0)?;
                    match PlayerVersion::parse(text) {
                        Some(version) if version >= PlayerVersion::MINIMUM => {
                            c.target_player = version;
                            Ok(())
                        }
                        _ => Err(ConfigError::BadVersion {
                            var: call.var().to_string(),
                            version: text.to_string(),
                            origin: call.origin(),
                        }
                        .into()),
                    }
                }),
        )
        .option(int("swf-version", "version", |c, v| c.swf_version = v).advanced().default_value(&["14"]))
        // compiler
        .option(
            strings("compiler.locale", "locale-element", |c, v| c.locales.extend(v))
                .ecosystem_only()
                .default_value(&["en_US"]),
        )
        .option(
            flag("exclude-native-js-libraries", |c, v| c.exclude_native_js_libraries = v)
                .advanced()
                .ecosystem_only(),
        )
        .option(library_path("compiler.library-path", |c, v| c.library_path.extend(v)))
        .option(library_path("compiler.external-library-path", |c, v| {
            c.external_library_path.extend(v)
        }))
        .option(
            opt("compiler.source-path", ArgContract::list("path-element"))
                .path()
                .multiple()
                .after(&["locale"])
                .on_set(|c, call| {
                    let paths = c.expand_paths(call, false);
                    if let Some(file) = paths.iter().find(|p| !c.resolver.is_dir(p)) {
                        return Err(ConfigError::NotDirectory {
                            var: Some(call.var().to_string()),
                            path: file.display().to_string(),
                            origin: call.origin(),
                        }
                        .into());
                    }
                    c.source_path.extend(paths);
                    Ok(())
                }),
        )
        .option(search_path("compiler.include-libraries", |c, v| c.include_libraries.extend(v)))
        .option(search_path("compiler.theme", |c, v| c.theme.extend(v)))
        .option(flag("compiler.debug", |c, v| c.debug = v).default_value(&["false"]))
        .option(flag("compiler.strict", |c, v| c.strict = v).default_value(&["true"]))
        .option(flag("compiler.as3", |c, v| c.as3 = v).advanced().default_value(&["true"]))
        .option(flag("compiler.es", |c, v| c.es = v).advanced().default_value(&["false"]))
        .option(flag("compiler.accessible", |c, v| c.accessible = v).default_value(&["false"]))
        .option(flag("compiler.optimize", |c, v| c.optimize = v).default_value(&["true"]))
        .option(
            opt(
                "compiler.define",
                ArgContract::fixed(&[("name", ArgType::String), ("value", ArgType::String)]),
            )
            .multiple()
            .advanced()
            .on_set(|c, call| {
                c.defines.push(Define {
                    name: call.string(0)?.to_string(),
                    value: call.string(1)?.to_string(),
                });
                Ok(())
            }),
        )
        .option(
            member(
                "compilerNamespacesNamespace",
                ArgContract::fixed(&[("uri", ArgType::String), ("manifest", ArgType::String)]),
            )
            .multiple()
            .on_set(|c, call| {
                let manifest = c.resolve_file(call, call.string(1)?)?;
                c.namespaces.push(NamespaceMapping {
                    uri: call.string(0)?.to_string(),
                    manifest,
                });
                Ok(())
            }),
        )
        .option(
            member("compilerFontsManagers", ArgContract::list("manager-class"))
                .advanced()
                .on_set(|c, call| {
                    c.font_managers = call.list();
                    Ok(())
                }),
        )
        .option(
            member(
                "compilerFontsLanguagesLanguageRange",
                ArgContract::fixed(&[("lang", ArgType::String), ("range", ArgType::String)]),
            )
            .multiple()
            .advanced()
            .on_set(|c, call| {
                c.language_ranges.push(LanguageRange {
                    lang: call.string(0)?.to_string(),
                    range: call.string(1)?.to_string(),
                });
                Ok(())
            }),
        )
        .option(
            member("compilerMxmlCompatibilityVersion", ArgContract::string("version"))
                .default_value(&["4.7.0"])
                .on_set(|c, call| {
                    c.compatibility_version = Some(call.string(0)?.to_string());
                    Ok(())
                }),
        )
        .option(
            member("compilerMxmlMinimumSupportedVersion", ArgContract::string("version"))
                .advanced()
                .requires(&["compatibility-version"])
                .on_set(|c, call| {
                    c.minimum_supported_version = Some(call.string(0)?.to_string());
                    Ok(())
                }),
        )
        .option(
            opt("compiler.defaults-css-url", ArgContract::string("url"))
                .advanced()
                .on_set(|c, call| {
                    c.defaults_css_url = Some(c.resolve_file(call, call.string(0)?)?);
                    Ok(())
                }),
        )
        .option(strings("compiler.keep-as3-metadata", "name", |c, v| c.keep_as3_metadata.extend(v)).advanced())
        .option(
            flag("compiler.headless-server", |c, v| c.headless_server = v)
                .advanced()
                .deprecated(Deprecation {
                    since: Some("0.9.0".to_string()),
                    replacement: None,
                    message: Some("headless mode is no longer needed".to_string()),
                }),
        )
        .option(removed(
            "compiler.keep-generated-actionscript",
            ArgContract::boolean("keep-generated-actionscript"),
        ))
        .option(removed("compiler.incremental", ArgContract::boolean("incremental")))
        // application
        .option(
            opt(
                "default-size",
                ArgContract::fixed(&[("width", ArgType::Int), ("height", ArgType::Int)]),
            )
            .default_value(&["500", "375"])
            .on_set(|c, call| {
                c.default_size = DefaultSize {
                    width: call.int(0)?,
                    height: call.int(1)?,
                };
                Ok(())
            }),
        )
        .option(int("default-frame-rate", "rate", |c, v| c.default_frame_rate = v).default_value(&["24"]))
        .option(
            int("default-background-color", "color", |c, v| c.default_background_color = v)
                .default_value(&["0xFFFFFF"]),
        )
        .option(
            opt(
                "default-script-limits",
                ArgContract::value_object(&[
                    ("maxRecursionDepth", ArgType::Int),
                    ("maxExecutionTime", ArgType::Int),
                ]),
            )
            .advanced()
            .default_value(&["1000", "60"])
            .on_set(|c, call| {
                c.script_limits = ScriptLimits {
                    max_recursion_depth: call.int_field("max-recursion-depth")?,
                    max_execution_time: call.int_field("max-execution-time")?,
                };
                Ok(())
            }),
        )
        .option(
            text("debug-password", "password", |c, v| c.debug_password = v)
                .advanced()
                .default_args(&[""])
                .requires(&["compiler.debug"]),
        )
        .option(strings("includes", "symbol", |c, v| c.includes.extend(v)).advanced())
        .option(strings("externs", "symbol", |c, v| c.externs.extend(v)).advanced())
        .option(opt("output", ArgContract::string("filename")).on_set(|c, call| {
            c.output = Some(c.output_path(call, call.string(0)?));
            Ok(())
        }))
        .option(
            opt("link-report", ArgContract::string("filename"))
                .advanced()
                .on_set(|c, call| {
                    c.link_report = Some(c.output_path(call, call.string(0)?));
                    Ok(())
                }),
        )
        .option(flag("use-network", |c, v| c.use_network = v).default_value(&["true"]))
        .option(text("tools-locale", "locale", |c, v| c.tools_locale = Some(v)).advanced())
        .option(
            member("metadataTitle", ArgContract::string("text")).on_set(|c, call| {
                c.metadata.title = Some(call.string(0)?.to_string());
                Ok(())
            }),
        )
        .option(
            member("metadataCreator", ArgContract::list("name"))
                .multiple()
                .on_set(|c, call| {
                    c.metadata.creators.extend(call.list());
                    Ok(())
                }),
        )
        .option(
            member("metadataLanguage", ArgContract::string("code")).on_set(|c, call| {
                c.metadata.language = Some(call.string(0)?.to_string());
                Ok(())
            }),
        )
        .option(
            member("framesFrame", ArgContract::list("classname"))
                .multiple()
                .advanced()
                .on_set(|c, call| {
                    let mut args = call.list().into_iter();
                    let label = args.next().ok_or_else(|| missing_argument(call, "label"))?;
                    let classes: Vec<String> = args.collect();
                    if classes.is_empty() {
                        return Err(missing_argument(call, "classname").into());
                    }
                    c.frames.push(FrameInfo { label, classes });
                    Ok(())
                }),
        )
        .option(
            member(
                "licensesLicense",
                ArgContract::fixed(&[("product", ArgType::String), ("serial-number", ArgType::String)]),
            )
            .multiple()
            .advanced()
            .on_set(|c, call| {
                c.licenses
                    .insert(call.string(0)?.to_string(), call.string(1)?.to_string());
                Ok(())
            }),
        )
        // runtime shared libraries
        .option(strings("runtime-shared-libraries", "url", |c, v| {
            c.runtime_shared_libraries.extend(v)
        }))
        .option(
            opt("runtime-shared-library-path", ArgContract::list("path-element"))
                .multiple()
                .after(&["static-link-runtime-shared-libraries"])
                .on_set(|c, call| {
                    let mut args = call.list().into_iter();
                    let swc = args.next().ok_or_else(|| missing_argument(call, "path-element"))?;
                    let swc = c.resolve_strict(call, &swc)?;
                    c.rsl_paths.push(RslPath {
                        swc,
                        urls: args.collect(),
                    });
                    Ok(())
                }),
        )
        .option(
            flag("static-link-runtime-shared-libraries", |c, v| c.static_link_rsls = v).default_value(&["true"]),
        )
        // library targets only
        .option(strings("include-classes", "class", |c, v| c.include_classes.extend(v)).library_only())
        .option(
            opt("include-sources", ArgContract::list("path-element"))
                .path()
                .multiple()
                .library_only()
                .on_set(|c, call| {
                    for path in call.list() {
                        let resolved = c.resolve_strict(call, &path)?;
                        c.include_sources.push(resolved);
                    }
                    Ok(())
                }),
        )
        .option(strings("include-namespaces", "uri", |c, v| c.include_namespaces.extend(v)).library_only())
        .option(
            opt(
                "include-file",
                ArgContract::fixed(&[("name", ArgType::String), ("path", ArgType::String)]),
            )
            .multiple()
            .library_only()
            .on_set(|c, call| {
                let path = c.resolve_file(call, call.string(1)?)?;
                c.include_files.push(IncludeFile {
                    name: call.string(0)?.to_string(),
                    path,
                });
                Ok(())
            }),
        )
        .option(flag("directory", |c, v| c.directory = v).library_only())
        .option(flag("use-flashbuilder-project-files", |c, v| c.use_flashbuilder_project_files = v).hidden())
        // inputs
        .option(
            opt("file-specs", ArgContract::list("path-element"))
                .multiple()
                .hidden()
                .after(&["royale"])
                .on_set(|c, call| {
                    for spec in call.list() {
                        let path = c.resolve_lenient(call, &spec);
                        if matches!(
                            path.extension().and_then(|e| e.to_str()),
                            Some("mxml") | Some("css")
                        ) {
                            c.royale = true;
                        }
                        c.file_specs.push(path);
                    }
                    Ok(())
                }),
        )
        .alias("l", "compiler.library-path")
        .alias("el", "compiler.external-library-path")
        .alias("sp", "compiler.source-path")
        .alias("is", "include-sources")
        .alias("rsl", "runtime-shared-libraries")
        .alias("rslp", "runtime-shared-library-path")
        .alias("o", "output")
        .alias("keep", "compiler.keep-generated-actionscript")
        .alias("static-rsls", "static-link-runtime-shared-libraries")
        .alias("fb", "use-flashbuilder-project-files")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OptionRegistry;

    #[test]
    fn test_schema_builds() {
        let registry = OptionRegistry::build(schema()).unwrap();
        assert!(registry.len() > 60);
        assert_eq!(registry.canonicalize("l"), "compiler.library-path");
        assert!(registry.contains("compiler.fonts.languages.language-range"));
        assert!(registry.contains("compiler.mxml.minimum-supported-version"));
        assert!(registry.contains("metadata.title"));
        assert!(registry.contains("licenses.license"));
        assert!(registry.contains("frames.frame"));
    }

    #[test]
    fn test_locale_commits_before_library_path() {
        let registry = OptionRegistry::build(schema()).unwrap();
        assert!(registry.position("compiler.locale") < registry.position("compiler.library-path"));
        assert!(registry.position("target-player") < registry.position("compiler.library-path"));
    }

    #[test]
    fn test_flags() {
        let registry = OptionRegistry::build(schema()).unwrap();
        assert!(registry.lookup("benchmark").unwrap().flags().is_removed);
        assert!(registry.lookup("keep").unwrap().flags().is_removed);
        assert!(registry.lookup("compiler.locale").unwrap().flags().is_ecosystem_only);
        assert!(registry.lookup("is").unwrap().flags().is_library_only);
        assert!(registry.lookup("compiler.headless-server").unwrap().is_deprecated());
        assert!(registry.lookup("help").unwrap().flags().is_greedy);
    }
}
