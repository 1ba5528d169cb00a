//! Module graph: the entry and every module it reaches.
//!
//! Modules are discovered breadth-first; a module's id is its position in
//! discovery order, so the entry is always module 0.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions};
use oxc::parser::{ParseOptions, Parser};
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};
use oxc_sourcemap::SourceMap;
use rustc_hash::FxHashMap;

use super::resolve::resolve;
use super::rewrite::{Globals, rewrite};
use crate::embed::helpers;
use crate::pipeline::PipelineError;
use crate::utils::path::normalize_path;

#[derive(Debug)]
pub struct Module {
    pub path: PathBuf,
    /// File content as read (embedded in the source map).
    pub source: String,
    pub prologue: String,
    pub body: String,
    /// Body → `source`. `None` for JSON modules and embedded helpers.
    pub map: Option<SourceMap>,
    /// Compiled into the binary; left out of the source map.
    pub embedded: bool,
}

#[derive(Debug)]
pub struct ModuleGraph {
    /// Indexed by module id.
    pub modules: Vec<Module>,
    pub globals: Globals,
}

/// Where a module's text comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ModuleKey {
    File(PathBuf),
    /// Transformer runtime helper compiled into the binary.
    Helper(&'static str),
}

impl ModuleKey {
    /// `node_modules` first, so an installed runtime wins over the
    /// embedded copy. Embedded helpers only import each other.
    fn resolve(&self, specifier: &str) -> Option<Self> {
        let file = match self {
            Self::File(from) => resolve(specifier, from).map(Self::File),
            Self::Helper(_) => None,
        };
        file.or_else(|| helpers::lookup(specifier).map(|(name, _)| Self::Helper(name)))
    }
}

impl ModuleGraph {
    pub fn build(entry: &Path, options: &TransformOptions) -> Result<Self, PipelineError> {
        let entry = ModuleKey::File(normalize_path(entry));
        let mut ids: FxHashMap<ModuleKey, usize> = FxHashMap::default();
        let mut queue = VecDeque::new();
        ids.insert(entry.clone(), 0);
        queue.push_back(entry);

        let mut modules = Vec::new();
        let mut globals = Globals::default();

        while let Some(key) = queue.pop_front() {
            let request = |specifier: &str| -> Result<usize, String> {
                let resolved = key
                    .resolve(specifier)
                    .ok_or_else(|| format!("cannot resolve '{specifier}'"))?;
                let next = ids.len();
                Ok(*ids.entry(resolved.clone()).or_insert_with(|| {
                    queue.push_back(resolved);
                    next
                }))
            };

            let (module, module_globals) = match &key {
                ModuleKey::File(path) => load(path, options, request)?,
                ModuleKey::Helper(name) => load_helper(name, request)?,
            };
            globals.merge(module_globals);
            modules.push(module);
        }

        Ok(Self { modules, globals })
    }
}

fn load<R>(
    path: &Path,
    options: &TransformOptions,
    request: R,
) -> Result<(Module, Globals), PipelineError>
where
    R: FnMut(&str) -> Result<usize, String>,
{
    let source = fs::read_to_string(path).map_err(|e| PipelineError::Io(path.to_path_buf(), e))?;

    if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str::<serde_json::Value>(&source)
            .map_err(|e| PipelineError::compile(path, e))?;
        let module = Module {
            path: path.to_path_buf(),
            body: format!("module.exports = {};\n", source.trim_end()),
            prologue: String::new(),
            map: None,
            embedded: false,
            source,
        };
        return Ok((module, Globals::default()));
    }

    let transformed = transform(path, &source, options).map_err(|e| PipelineError::compile(path, e))?;
    let rewritten = rewrite(&transformed.code, transformed.source_type, request)
        .map_err(|e| PipelineError::compile(path, e))?;

    let module = Module {
        path: path.to_path_buf(),
        source,
        prologue: rewritten.prologue,
        body: rewritten.body,
        map: transformed.map,
        embedded: false,
    };
    Ok((module, rewritten.globals))
}

/// Embedded helpers are already ES5 CommonJS and skip the transformer.
fn load_helper<R>(name: &str, request: R) -> Result<(Module, Globals), PipelineError>
where
    R: FnMut(&str) -> Result<usize, String>,
{
    let specifier = format!("{}{name}", helpers::MODULE_PREFIX);
    let path = PathBuf::from(format!("{specifier}.js"));
    let (_, source) =
        helpers::lookup(&specifier).ok_or_else(|| PipelineError::compile(&path, "unknown helper"))?;

    let rewritten =
        rewrite(source, SourceType::cjs(), request).map_err(|e| PipelineError::compile(&path, e))?;

    let module = Module {
        path,
        source: source.to_string(),
        prologue: rewritten.prologue,
        body: rewritten.body,
        map: None,
        embedded: true,
    };
    Ok((module, rewritten.globals))
}

struct Transformed {
    code: String,
    map: Option<SourceMap>,
    /// How the output must be reparsed (module or script, plain JS).
    source_type: SourceType,
}

/// Lower one file to the configured target and print it with a map.
///
/// Files that fail to parse as ES modules (top-level `return`, legacy
/// octal) are retried as CommonJS scripts unless they are `.mjs`.
fn transform(path: &Path, source: &str, options: &TransformOptions) -> Result<Transformed, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_default();

    let mut ret = Parser::new(&allocator, source, source_type).parse();
    let forced = path.extension().is_some_and(|e| e == "mjs");
    if !ret.errors.is_empty() && !forced {
        let retry = Parser::new(&allocator, source, source_type.with_module(false))
            .with_options(commonjs_options())
            .parse();
        if retry.errors.is_empty() {
            ret = retry;
        }
    }
    if !ret.errors.is_empty() {
        return Err(render_errors(ret.errors.iter().map(ToString::to_string)));
    }

    let mut program = ret.program;
    let scoping = SemanticBuilder::new()
        .with_excess_capacity(2.0)
        .build(&program)
        .semantic
        .into_scoping();

    let ret = Transformer::new(&allocator, path, options).build_with_scoping(scoping, &mut program);
    if !ret.errors.is_empty() {
        return Err(render_errors(ret.errors.iter().map(ToString::to_string)));
    }

    let out = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: Some(path.to_path_buf()),
            ..CodegenOptions::default()
        })
        .build(&program);

    let reparse = if program.source_type.is_module() {
        SourceType::mjs()
    } else {
        SourceType::cjs()
    };

    Ok(Transformed {
        code: out.code,
        map: out.map,
        source_type: reparse,
    })
}

/// CommonJS files run inside a function, so `return` is legal at top level.
pub(super) fn commonjs_options() -> ParseOptions {
    ParseOptions {
        allow_return_outside_function: true,
        ..ParseOptions::default()
    }
}

fn render_errors(errors: impl Iterator<Item = String>) -> String {
    errors.collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn options() -> TransformOptions {
        TransformOptions::from_target("es2015").unwrap()
    }

    #[test]
    fn test_discovery_order_and_dedup() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "app.js",
            "import { add } from './math';\nimport config from './config.json';\nimport './math.js';\nconsole.log(add(1, config.base));\n",
        );
        write(dir.path(), "math.js", "export const add = (a, b) => a + b;\n");
        write(dir.path(), "config.json", "{ \"base\": 40 }\n");

        let graph = ModuleGraph::build(&entry, &options()).unwrap();
        let names: Vec<_> = graph
            .modules
            .iter()
            .map(|m| m.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["app.js", "math.js", "config.json"]);

        assert!(graph.modules[0].body.contains("__require(1)"));
        assert!(graph.modules[0].body.contains("__require(2)"));
        assert!(graph.modules[1].prologue.contains("\"add\""));
        assert!(graph.modules[2].body.starts_with("module.exports = { \"base\": 40 };"));
        assert!(graph.modules[0].map.is_some());
        assert!(graph.modules[2].map.is_none());
    }

    #[test]
    fn test_syntax_is_lowered() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "app.js",
            "const pick = (o) => o?.value ?? 2 ** 3;\nconsole.log(pick({}));\n",
        );

        let graph = ModuleGraph::build(&entry, &options()).unwrap();
        let body = &graph.modules[0].body;
        assert!(!body.contains("?."));
        assert!(!body.contains("??"));
        assert!(!body.contains("**"));
    }

    #[test]
    fn test_commonjs_with_top_level_return() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "legacy.js",
            "if (typeof window === 'undefined') return;\nmodule.exports = 1;\n",
        );

        let graph = ModuleGraph::build(&entry, &options()).unwrap();
        assert!(graph.modules[0].prologue.is_empty());
    }

    #[test]
    fn test_unresolved_import_names_the_importer() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "app.js", "import x from './missing';\n");

        let err = ModuleGraph::build(&entry, &options()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("app.js"));
        assert!(message.contains("cannot resolve './missing'"));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "app.js", "const = ;\n");
        assert!(matches!(
            ModuleGraph::build(&entry, &options()),
            Err(PipelineError::Compile { .. })
        ));
    }

    #[test]
    fn test_runtime_helpers_come_from_the_binary() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "app.js",
            "const a = { x: 1 };\nexport const b = { ...a, y: 2 };\n",
        );

        let graph = ModuleGraph::build(&entry, &options()).unwrap();
        let helpers: Vec<_> = graph
            .modules
            .iter()
            .filter(|m| m.embedded)
            .map(|m| m.path.to_string_lossy().into_owned())
            .collect();
        assert!(helpers.contains(&"@oxc-project/runtime/helpers/objectSpread2.js".to_string()));
        // its own dependency chain is embedded too
        assert!(helpers.contains(&"@oxc-project/runtime/helpers/defineProperty.js".to_string()));
        assert!(graph.modules.iter().filter(|m| m.embedded).all(|m| m.map.is_none()));
        assert!(!graph.modules[0].embedded);
    }

    #[test]
    fn test_installed_runtime_wins_over_embedded() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "app.js",
            "async function load() {\n  await fetch('/x');\n}\nload();\n",
        );
        let installed = write(
            dir.path(),
            "node_modules/@oxc-project/runtime/helpers/asyncToGenerator.js",
            "module.exports = function (fn) { return fn; };\n",
        );

        let graph = ModuleGraph::build(&entry, &options()).unwrap();
        assert_eq!(graph.modules.len(), 2);
        assert_eq!(graph.modules[1].path, normalize_path(&installed));
        assert!(!graph.modules[1].embedded);
    }
}
