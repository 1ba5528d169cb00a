//! Bundle assembly and final minification.
//!
//! ```text
//! (function () {<runtime><globals>var modules = [      line 0
//! function (module, exports, __require) {<prologue>   factory header
//! <module 0 body>                                      start_line..
//! },
//! ...
//! ];__require(0);})();
//! ```

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use oxc::transformer::EngineTargets;
use oxc_sourcemap::SourceMap;

use super::graph::ModuleGraph;

/// Module loader shared by every factory. ES5, one line.
const RUNTIME: &str = concat!(
    "var cache = {};",
    "function __require(id) {",
    "var cached = cache[id]; if (cached) return cached.exports;",
    "var module = cache[id] = { exports: {} };",
    "modules[id].call(module.exports, module, module.exports, __require);",
    "return module.exports; }",
    "__require.d = function (exports, getters) {",
    "Object.defineProperty(exports, \"__esModule\", { value: true });",
    "for (var key in getters) Object.defineProperty(exports, key, { enumerable: true, get: getters[key] }); };",
    "__require.r = function (exports, source) {",
    "Object.keys(source).forEach(function (key) {",
    "if (key === \"default\" || key === \"__esModule\" || Object.prototype.hasOwnProperty.call(exports, key)) return;",
    "Object.defineProperty(exports, key, { enumerable: true, get: function () { return source[key]; } }); }); };",
    "__require.i = function (m) { return m && m.__esModule ? m : { default: m }; };",
    "__require.w = function (m) {",
    "if (m && m.__esModule) return m; var ns = {};",
    "if (m != null) for (var key in m) if (Object.prototype.hasOwnProperty.call(m, key)) ns[key] = m[key];",
    "ns.default = m; return ns; };",
);

const PROCESS_SHIM: &str = "var process = { env: {}, browser: true, argv: [] };";
const GLOBAL_SHIM: &str = "var global = typeof globalThis !== \"undefined\" ? globalThis : typeof window !== \"undefined\" ? window : this;";

const FACTORY_HEADER: &str = "function (module, exports, __require) {";

/// Assembled, not yet minified, bundle.
#[derive(Debug)]
pub struct Bundle {
    pub code: String,
    /// (first body line, line count) per module, in id order.
    spans: Vec<(u32, u32)>,
}

impl Bundle {
    /// Module index and module-local line for a bundle line.
    pub fn locate(&self, line: u32) -> Option<(usize, u32)> {
        let idx = self.spans.partition_point(|(start, _)| *start <= line);
        let index = idx.checked_sub(1)?;
        let (start, count) = self.spans[index];
        (line < start + count).then_some((index, line - start))
    }
}

/// Concatenate the graph's factories behind the runtime.
pub fn assemble(graph: &ModuleGraph) -> Bundle {
    let mut code = String::from("(function () {");
    code.push_str(RUNTIME);
    if graph.globals.process {
        code.push_str(PROCESS_SHIM);
    }
    if graph.globals.global {
        code.push_str(GLOBAL_SHIM);
    }
    code.push_str("var modules = [\n");

    let mut line = 1u32;
    let mut spans = Vec::with_capacity(graph.modules.len());

    for module in &graph.modules {
        code.push_str(FACTORY_HEADER);
        code.push_str(&module.prologue);
        code.push('\n');
        line += 1;

        let count = module.body.matches('\n').count() as u32
            + u32::from(!module.body.is_empty() && !module.body.ends_with('\n'));
        spans.push((line, count));

        code.push_str(&module.body);
        if !module.body.is_empty() && !module.body.ends_with('\n') {
            code.push('\n');
        }
        code.push_str("},\n");
        line += count + 1;
    }

    code.push_str("];__require(0);})();\n");
    Bundle { code, spans }
}

/// Syntax ceiling for the compressor, from the same preset the
/// transformer lowers to. An unparsable preset falls back to ES2015.
pub fn es_target(target: &str) -> EngineTargets {
    EngineTargets::from_target(target)
        .or_else(|_| EngineTargets::from_target("es2015"))
        .unwrap_or_default()
}

/// Compress and mangle the bundle. The map (when requested) points back
/// into `bundle.code`.
pub fn minify(
    bundle: &Bundle,
    target: EngineTargets,
    map_path: Option<&Path>,
) -> Result<(String, Option<SourceMap>), String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &bundle.code, SourceType::cjs()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(error.to_string());
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions {
            target,
            ..CompressOptions::smallest()
        }),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let out = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: map_path.map(Path::to_path_buf),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program);

    Ok((out.code, out.map))
}
