//! Module → factory body rewrite.
//!
//! Every bundled module becomes the body of
//! `function (module, exports, __require) { ... }`:
//!
//! - `import` statements turn into `__require(id)` bindings and every
//!   reference to an imported name reads through the module object, so
//!   bindings stay live across cycles.
//! - `export` keywords are blanked out; the exported names are collected
//!   into a getter table registered by the prologue.
//! - `require("x")` and `import("x")` with literal specifiers are pointed
//!   at module ids.
//!
//! Edits never add or remove lines. The prologue lives on the factory's
//! header line, so a module's own source map still applies to its body.

use oxc::allocator::Allocator;
use oxc::ast::ast::{
    Argument, BindingIdentifier, CallExpression, ExportAllDeclaration,
    ExportDefaultDeclaration, ExportDefaultDeclarationKind, ExportNamedDeclaration, Expression,
    IdentifierReference, ImportDeclaration, ImportDeclarationSpecifier, ImportExpression,
    ObjectProperty, Program, Statement,
};
use oxc::ast_visit::{Visit, walk};
use oxc::parser::Parser;
use oxc::semantic::{Scoping, SemanticBuilder, SymbolId};
use oxc::span::{GetSpan, SourceType, Span};
use oxc_ecmascript::BoundNames;
use rustc_hash::FxHashMap;

/// Free variables the bundle has to provide.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Globals {
    pub process: bool,
    pub global: bool,
}

impl Globals {
    pub fn merge(&mut self, other: Self) {
        self.process |= other.process;
        self.global |= other.global;
    }
}

/// A module ready to be wrapped in a factory.
#[derive(Debug)]
pub struct Rewritten {
    /// Placed on the factory header line (strict mode and export getters).
    pub prologue: String,
    pub body: String,
    pub globals: Globals,
}

/// Rewrite `code`, asking `request` for the module id of each specifier.
pub fn rewrite<R>(code: &str, source_type: SourceType, request: R) -> Result<Rewritten, String>
where
    R: FnMut(&str) -> Result<usize, String>,
{
    let allocator = Allocator::default();
    let mut parser = Parser::new(&allocator, code, source_type);
    if !source_type.is_module() {
        parser = parser.with_options(super::graph::commonjs_options());
    }
    let ret = parser.parse();
    if let Some(error) = ret.errors.first() {
        return Err(error.to_string());
    }
    let program = ret.program;
    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();

    let mut rewriter = Rewriter {
        code,
        scoping: &scoping,
        request,
        imports: FxHashMap::default(),
        import_names: FxHashMap::default(),
        getters: Vec::new(),
        edits: Vec::new(),
        esm: false,
        globals: Globals::default(),
        error: None,
    };

    rewriter.module_declarations(&program)?;
    rewriter.visit_program(&program);
    if let Some(error) = rewriter.error {
        return Err(error);
    }

    Ok(Rewritten {
        prologue: rewriter.prologue(),
        body: apply(code, rewriter.edits),
        globals: rewriter.globals,
    })
}

struct Edit {
    start: u32,
    end: u32,
    text: String,
}

struct Rewriter<'s, R> {
    code: &'s str,
    scoping: &'s Scoping,
    request: R,
    /// Import binding → expression reading it from the module object.
    imports: FxHashMap<SymbolId, String>,
    import_names: FxHashMap<String, String>,
    /// (exported name, expression)
    getters: Vec<(String, String)>,
    edits: Vec<Edit>,
    esm: bool,
    globals: Globals,
    error: Option<String>,
}

impl<R> Rewriter<'_, R>
where
    R: FnMut(&str) -> Result<usize, String>,
{
    /// Top-level `import`/`export` statements. Imports go first so that
    /// `export { name }` can see imported bindings.
    fn module_declarations(&mut self, program: &Program<'_>) -> Result<(), String> {
        for stmt in &program.body {
            if let Statement::ImportDeclaration(decl) = stmt {
                self.import(decl)?;
            }
        }
        for stmt in &program.body {
            match stmt {
                Statement::ExportNamedDeclaration(decl) => self.export_named(decl)?,
                Statement::ExportAllDeclaration(decl) => self.export_all(decl)?,
                Statement::ExportDefaultDeclaration(decl) => self.export_default(decl),
                _ => {}
            }
        }
        Ok(())
    }

    fn import(&mut self, decl: &ImportDeclaration<'_>) -> Result<(), String> {
        self.esm = true;
        let id = (self.request)(decl.source.value.as_str())?;

        let Some(specifiers) = &decl.specifiers else {
            self.replace(decl.span, format!("__require({id});"));
            return Ok(());
        };

        let var = format!("__brisk_m{id}");
        let mut text = format!("var {var} = __require({id});");
        let mut namespaces = String::new();
        let mut interop = false;

        for specifier in specifiers {
            match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                    let imported = spec.imported.name();
                    let expr = if imported == "default" {
                        interop = true;
                        format!("{var}_d.default")
                    } else {
                        member(&var, &imported)
                    };
                    self.bind(&spec.local, expr);
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                    interop = true;
                    self.bind(&spec.local, format!("{var}_d.default"));
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                    namespaces.push_str(&format!(" var {} = __require.w({var});", spec.local.name));
                }
            }
        }

        if interop {
            text.push_str(&format!(" var {var}_d = __require.i({var});"));
        }
        text.push_str(&namespaces);
        self.replace(decl.span, text);
        Ok(())
    }

    fn bind(&mut self, local: &BindingIdentifier<'_>, expr: String) {
        if let Some(symbol) = local.symbol_id.get() {
            self.imports.insert(symbol, expr.clone());
        }
        self.import_names.insert(local.name.to_string(), expr);
    }

    fn export_named(&mut self, decl: &ExportNamedDeclaration<'_>) -> Result<(), String> {
        self.esm = true;

        if let Some(declaration) = &decl.declaration {
            self.blank(Span::new(decl.span.start, declaration.span().start));
            let mut names = Vec::new();
            declaration.bound_names(&mut |ident| names.push(ident.name.to_string()));
            self.getters
                .extend(names.into_iter().map(|name| (name.clone(), name)));
            return Ok(());
        }

        if let Some(source) = &decl.source {
            let id = (self.request)(source.value.as_str())?;
            let var = format!("__brisk_r{id}");
            self.replace(decl.span, format!("var {var} = __require({id});"));
            for spec in &decl.specifiers {
                let local = spec.local.name();
                let expr = if local == "default" {
                    format!("__require.i({var}).default")
                } else {
                    member(&var, &local)
                };
                self.getters.push((spec.exported.name().to_string(), expr));
            }
            return Ok(());
        }

        self.blank(decl.span);
        for spec in &decl.specifiers {
            let local = spec.local.name().to_string();
            let expr = self.import_names.get(&local).cloned().unwrap_or(local);
            self.getters.push((spec.exported.name().to_string(), expr));
        }
        Ok(())
    }

    fn export_all(&mut self, decl: &ExportAllDeclaration<'_>) -> Result<(), String> {
        self.esm = true;
        let id = (self.request)(decl.source.value.as_str())?;

        match &decl.exported {
            Some(name) => {
                let var = format!("__brisk_r{id}");
                self.replace(decl.span, format!("var {var} = __require.w(__require({id}));"));
                self.getters.push((name.name().to_string(), var));
            }
            None => self.replace(decl.span, format!("__require.r(exports, __require({id}));")),
        }
        Ok(())
    }

    fn export_default(&mut self, decl: &ExportDefaultDeclaration<'_>) {
        self.esm = true;
        let prefix = Span::new(decl.span.start, decl.declaration.span().start);

        let named = match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                Some(func.id.as_ref().map(|id| id.name.to_string()))
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                Some(class.id.as_ref().map(|id| id.name.to_string()))
            }
            _ => None,
        };

        match named {
            // `export default function name() {}` keeps its hoisted declaration
            Some(Some(name)) => {
                self.blank(prefix);
                self.getters.push(("default".to_string(), name));
            }
            // anonymous function or class becomes an expression statement
            Some(None) => {
                self.replace(prefix, "var __brisk_default = ".to_string());
                self.insert(decl.span.end, ";");
                self.getters
                    .push(("default".to_string(), "__brisk_default".to_string()));
            }
            None => {
                self.replace(prefix, "var __brisk_default = ".to_string());
                self.getters
                    .push(("default".to_string(), "__brisk_default".to_string()));
            }
        }
    }

    fn prologue(&self) -> String {
        if !self.esm {
            return String::new();
        }
        let getters = self
            .getters
            .iter()
            .map(|(name, expr)| {
                format!(
                    "{}: function () {{ return {expr}; }}",
                    serde_json::Value::from(name.as_str())
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("\"use strict\";__require.d(exports, {{{getters}}});")
    }

    // ------------------------------------------------------------------
    // references
    // ------------------------------------------------------------------

    fn import_for(&self, ident: &IdentifierReference<'_>) -> Option<String> {
        let reference = ident.reference_id.get()?;
        let symbol = self.scoping.get_reference(reference).symbol_id()?;
        self.imports.get(&symbol).cloned()
    }

    fn is_global(&self, ident: &IdentifierReference<'_>) -> bool {
        ident
            .reference_id
            .get()
            .is_some_and(|id| self.scoping.get_reference(id).symbol_id().is_none())
    }

    fn require(&mut self, span: Span, specifier: &str) {
        match (self.request)(specifier) {
            Ok(id) => self.replace(span, format!("__require({id})")),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, message: String) {
        self.error.get_or_insert(message);
    }

    // ------------------------------------------------------------------
    // edits
    // ------------------------------------------------------------------

    /// Replace `span` with `text`, padding with the newlines it covered.
    fn replace(&mut self, span: Span, text: String) {
        let covered = &self.code[span.start as usize..span.end as usize];
        let mut text = text;
        text.extend(std::iter::repeat_n('\n', covered.matches('\n').count()));
        self.edits.push(Edit {
            start: span.start,
            end: span.end,
            text,
        });
    }

    /// Overwrite `span` with spaces, keeping line breaks and columns.
    fn blank(&mut self, span: Span) {
        let covered = &self.code[span.start as usize..span.end as usize];
        let text = covered
            .chars()
            .map(|c| if c == '\n' { '\n' } else { ' ' })
            .collect();
        self.edits.push(Edit {
            start: span.start,
            end: span.end,
            text,
        });
    }

    fn insert(&mut self, at: u32, text: &str) {
        self.edits.push(Edit {
            start: at,
            end: at,
            text: text.to_string(),
        });
    }
}

impl<'a, R> Visit<'a> for Rewriter<'_, R>
where
    R: FnMut(&str) -> Result<usize, String>,
{
    fn visit_import_declaration(&mut self, _it: &ImportDeclaration<'a>) {}

    fn visit_export_all_declaration(&mut self, _it: &ExportAllDeclaration<'a>) {}

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if let Some(declaration) = &it.declaration {
            self.visit_declaration(declaration);
        }
    }

    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        if let Some(expr) = self.import_for(it) {
            self.replace(it.span, expr);
        } else if self.is_global(it) {
            match it.name.as_str() {
                "process" => self.globals.process = true,
                "global" => self.globals.global = true,
                _ => {}
            }
        }
    }

    fn visit_object_property(&mut self, it: &ObjectProperty<'a>) {
        if it.shorthand
            && let Expression::Identifier(ident) = &it.value
            && let Some(expr) = self.import_for(ident)
        {
            self.replace(it.span, format!("{}: {expr}", ident.name));
            return;
        }
        walk::walk_object_property(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &it.callee {
            if callee.name == "require"
                && self.is_global(callee)
                && it.arguments.len() == 1
                && let Argument::StringLiteral(lit) = &it.arguments[0]
            {
                self.require(it.span, lit.value.as_str());
                return;
            }

            // called through the module object without rebinding `this`
            if let Some(expr) = self.import_for(callee) {
                self.replace(callee.span, format!("(0, {expr})"));
                for argument in &it.arguments {
                    self.visit_argument(argument);
                }
                return;
            }
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        let Expression::StringLiteral(lit) = &it.source else {
            self.fail("import() needs a string literal specifier".to_string());
            return;
        };
        match (self.request)(lit.value.as_str()) {
            Ok(id) => self.replace(
                it.span,
                format!("Promise.resolve().then(function () {{ return __require.w(__require({id})); }})"),
            ),
            Err(e) => self.fail(e),
        }
    }
}

/// `object.name`, or `object["name"]` when `name` is not an identifier.
fn member(object: &str, name: &str) -> String {
    let mut chars = name.chars();
    let is_ident = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        format!("{object}.{name}")
    } else {
        format!("{object}[{}]", serde_json::Value::from(name))
    }
}

/// Splice sorted, non-overlapping edits into `code`.
fn apply(code: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.start, e.end));

    let mut out = String::with_capacity(code.len() + edits.len() * 16);
    let mut cursor = 0usize;
    for edit in edits {
        let (start, end) = (edit.start as usize, edit.end as usize);
        if start < cursor {
            continue;
        }
        out.push_str(&code[cursor..start]);
        out.push_str(&edit.text);
        cursor = end;
    }
    out.push_str(&code[cursor..]);
    out
}
