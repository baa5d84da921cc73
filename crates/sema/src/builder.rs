//! Pass 1 — scope builder (§4.5).
//!
//! Walks declarations only (never expression contents — this language has
//! no closures, so expressions never introduce scopes or symbols) and
//! produces a complete [`ScopeTree`], one function scope per function, one
//! block scope per nested block/branch/loop body/switch case, and a module
//! scope per module, with every declared name inserted in encounter order.

use crate::scope::{ScopeId, ScopeKind, ScopeTree, Symbol, SymbolKind};
use crate::typename::{ProgramTypes, resolve_type_name};
use cn_ast::{FunctionDecl, ModuleDecl, Program, Stmt, VarDecl};
use cn_diagnostics::DiagnosticBag;
use cn_types::Type;
use std::path::Path;

/// Hosted I/O entry points (§4.5/§4.9): these have no declaration anywhere
/// in CN source, so the global scope is seeded with them directly rather
/// than requiring a prelude file the preprocessor would have to inject.
/// `打印`/`打印行` take `Unknown` (any printable type — the C backend picks
/// the matching `cn_rt_print_*` overload by the argument's actual type, not
/// by a declared parameter type this single-dispatch type system can't
/// express); `读取整数`/`读取行` take none and return a concrete type.
fn seed_builtins(tree: &mut ScopeTree, global: ScopeId, filename: &Path, diagnostics: &mut DiagnosticBag) {
    let builtins: [(&str, Type); 4] = [
        ("打印", Type::function(Type::Void, vec![Type::Unknown])),
        ("打印行", Type::function(Type::Void, vec![Type::Unknown])),
        ("读取整数", Type::function(Type::Int, vec![])),
        ("读取行", Type::function(Type::String, vec![])),
    ];
    for (name, ty) in builtins {
        tree.declare(
            global,
            Symbol {
                name: name.to_string(),
                kind: SymbolKind::Function,
                scope: global,
                ty,
                is_public: true,
            },
            &filename.to_path_buf(),
            0,
            0,
            diagnostics,
        );
    }
}

pub fn build_scopes(
    program: &Program,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) -> ScopeTree {
    let mut tree = ScopeTree::new();
    let global = tree.global();

    seed_builtins(&mut tree, global, filename, diagnostics);

    for s in &program.structs {
        tree.declare(
            global,
            Symbol {
                name: s.name.clone(),
                kind: SymbolKind::Struct,
                scope: global,
                ty: Type::Struct(s.name.clone()),
                is_public: true,
            },
            &filename.to_path_buf(),
            s.span.line,
            s.span.column,
            diagnostics,
        );
    }

    for e in &program.enums {
        tree.declare(
            global,
            Symbol {
                name: e.name.clone(),
                kind: SymbolKind::Enum,
                scope: global,
                ty: Type::Int,
                is_public: true,
            },
            &filename.to_path_buf(),
            e.span.line,
            e.span.column,
            diagnostics,
        );
        // Enum members themselves are not namespaced in this language's
        // scope model (referenced as bare identifiers, member resolution is
        // the C backend's job once lowered), so no separate symbol per
        // member is declared here.
    }

    for v in &program.globals {
        declare_var(&mut tree, global, v, types, filename, diagnostics);
    }

    for f in &program.functions {
        declare_function(&mut tree, global, f, types, filename, diagnostics);
    }

    for m in &program.modules {
        declare_module(&mut tree, global, m, types, filename, diagnostics);
    }

    tree
}

fn declare_var(
    tree: &mut ScopeTree,
    scope: ScopeId,
    v: &VarDecl,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) {
    let ty = match &v.declared_type {
        Some(tn) => resolve_type_name(
            tn,
            types,
            filename,
            v.span.line,
            v.span.column,
            diagnostics,
        ),
        None => Type::Unknown,
    };
    tree.declare(
        scope,
        Symbol {
            name: v.name.clone(),
            kind: SymbolKind::Variable,
            scope,
            ty,
            is_public: matches!(v.visibility, cn_ast::Visibility::Public),
        },
        &filename.to_path_buf(),
        v.span.line,
        v.span.column,
        diagnostics,
    );
}

fn function_type(
    f: &FunctionDecl,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) -> Type {
    let ret = resolve_type_name(
        &f.return_type,
        types,
        filename,
        f.span.line,
        f.span.column,
        diagnostics,
    );
    let params = f
        .params
        .iter()
        .map(|p| resolve_type_name(&p.type_name, types, filename, p.span.line, p.span.column, diagnostics))
        .collect();
    Type::function(ret, params)
}

fn declare_function(
    tree: &mut ScopeTree,
    scope: ScopeId,
    f: &FunctionDecl,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) {
    let ty = function_type(f, types, filename, diagnostics);
    tree.declare(
        scope,
        Symbol {
            name: f.name.clone(),
            kind: SymbolKind::Function,
            scope,
            ty,
            is_public: true,
        },
        &filename.to_path_buf(),
        f.span.line,
        f.span.column,
        diagnostics,
    );

    let func_scope = tree.child(scope, ScopeKind::Function);
    for p in &f.params {
        let pty = resolve_type_name(
            &p.type_name,
            types,
            filename,
            p.span.line,
            p.span.column,
            diagnostics,
        );
        tree.declare(
            func_scope,
            Symbol {
                name: p.name.clone(),
                kind: SymbolKind::Parameter,
                scope: func_scope,
                ty: pty,
                is_public: false,
            },
            &filename.to_path_buf(),
            p.span.line,
            p.span.column,
            diagnostics,
        );
    }

    for stmt in &f.body {
        build_stmt(tree, func_scope, stmt, types, filename, diagnostics);
    }
}

fn declare_module(
    tree: &mut ScopeTree,
    scope: ScopeId,
    m: &ModuleDecl,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) {
    tree.declare(
        scope,
        Symbol {
            name: m.name.clone(),
            kind: SymbolKind::Module,
            scope,
            ty: Type::Unknown,
            is_public: true,
        },
        &filename.to_path_buf(),
        m.span.line,
        m.span.column,
        diagnostics,
    );

    let mod_scope = tree.child(scope, ScopeKind::Module);
    for stmt in &m.statements {
        build_stmt(tree, mod_scope, stmt, types, filename, diagnostics);
    }
    for f in &m.functions {
        declare_function(tree, mod_scope, f, types, filename, diagnostics);
    }
}

/// Walks one statement's declaration structure, creating child scopes for
/// nested bodies and declaring names as they're encountered. Mirrored
/// exactly (same traversal order) by `analyze::analyze_stmt` so that the
/// `n`th child scope requested under a given parent during analysis is the
/// same one this pass created.
fn build_stmt(
    tree: &mut ScopeTree,
    scope: ScopeId,
    stmt: &Stmt,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) {
    match stmt {
        Stmt::Block(stmts) => {
            let child = tree.child(scope, ScopeKind::Block);
            for s in stmts {
                build_stmt(tree, child, s, types, filename, diagnostics);
            }
        }
        Stmt::VarDecl(v) => declare_var(tree, scope, v, types, filename, diagnostics),
        Stmt::Expr(_) | Stmt::Return { .. } | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Import(_) => {}
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            build_stmt(tree, scope, then_branch, types, filename, diagnostics);
            if let Some(e) = else_branch {
                build_stmt(tree, scope, e, types, filename, diagnostics);
            }
        }
        Stmt::While { body, .. } => build_stmt(tree, scope, body, types, filename, diagnostics),
        Stmt::For { init, body, .. } => {
            // The loop's own init variable (if any) is scoped to the loop,
            // so `for` gets a dedicated block scope even when its body is
            // itself a bare statement rather than a `{ }` block.
            let child = tree.child(scope, ScopeKind::Block);
            if let Some(init_stmt) = init {
                build_stmt(tree, child, init_stmt, types, filename, diagnostics);
            }
            build_stmt(tree, child, body, types, filename, diagnostics);
        }
        Stmt::Switch { cases, default, .. } => {
            for case in cases {
                let child = tree.child(scope, ScopeKind::Block);
                for s in &case.body {
                    build_stmt(tree, child, s, types, filename, diagnostics);
                }
            }
            if let Some(d) = default {
                let child = tree.child(scope, ScopeKind::Block);
                for s in d {
                    build_stmt(tree, child, s, types, filename, diagnostics);
                }
            }
        }
        Stmt::StructDecl(s) => {
            tree.declare(
                scope,
                Symbol {
                    name: s.name.clone(),
                    kind: SymbolKind::Struct,
                    scope,
                    ty: Type::Struct(s.name.clone()),
                    is_public: true,
                },
                &filename.to_path_buf(),
                s.span.line,
                s.span.column,
                diagnostics,
            );
        }
        Stmt::EnumDecl(e) => {
            tree.declare(
                scope,
                Symbol {
                    name: e.name.clone(),
                    kind: SymbolKind::Enum,
                    scope,
                    ty: Type::Int,
                    is_public: true,
                },
                &filename.to_path_buf(),
                e.span.line,
                e.span.column,
                diagnostics,
            );
        }
        Stmt::ModuleDecl(m) => declare_module(tree, scope, m, types, filename, diagnostics),
    }
}
