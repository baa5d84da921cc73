//! Scope tree construction (§4.5 pass 1).
//!
//! Scopes are stored in a flat, append-only `Vec` and referenced by integer
//! index rather than parent/child pointers, the same "avoid cycles in the
//! ownership graph" discipline the IR uses for its block graph (§9).

use cn_diagnostics::{DiagnosticBag, ErrorCode};
use cn_types::Type;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
    Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Parameter,
    Struct,
    Enum,
    Module,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub scope: ScopeId,
    pub ty: Type,
    pub is_public: bool,
}

/// Index into [`ScopeTree`]'s scope vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub symbols: Vec<Symbol>,
    /// Child scopes in creation order. The builder (pass 1) and the
    /// resolver/type-checker (pass 2+3) both recurse over the same AST
    /// shape in the same left-to-right order, so the second walk can fetch
    /// "the next child of this scope" positionally instead of re-creating
    /// scopes or storing scope ids on AST nodes.
    pub children: Vec<ScopeId>,
}

/// Owns every scope created while walking a program. The global scope is
/// always `ScopeId(0)`.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                parent: None,
                symbols: Vec::new(),
                children: Vec::new(),
            }],
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn child(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            symbols: Vec::new(),
            children: Vec::new(),
        });
        self.get_mut(parent).children.push(id);
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Fetch the `n`th child scope created under `parent`, used by the
    /// resolver/type-checker walk to line up with the scopes the builder
    /// pass already created at the same structural position.
    pub fn nth_child(&self, parent: ScopeId, n: usize) -> ScopeId {
        self.get(parent).children[n]
    }

    fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    /// Insert `symbol` into `scope`, rejecting a name collision within the
    /// *same* scope (shallow lookup) as `SEM_DUPLICATE_SYMBOL` (§4.5).
    /// Inner blocks may still shadow outer declarations.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        symbol: Symbol,
        filename: &PathBuf,
        line: usize,
        column: usize,
        diagnostics: &mut DiagnosticBag,
    ) {
        let existing = self
            .get(scope)
            .symbols
            .iter()
            .any(|s| s.name == symbol.name);
        if existing {
            diagnostics.error(
                ErrorCode::SemDuplicateSymbol,
                filename.clone(),
                line,
                column,
                format!("重复声明的符号: {}", symbol.name),
            );
            return;
        }
        self.get_mut(scope).symbols.push(symbol);
    }

    /// Innermost-first chain lookup, honoring shadowing (§4.5 pass 2).
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get(id);
            if let Some(sym) = s.symbols.iter().find(|s| s.name == name) {
                return Some(sym);
            }
            current = s.parent;
        }
        None
    }

    /// Mutable variant of [`ScopeTree::resolve`], used by the type checker
    /// to fill in a symbol's resolved type once known.
    pub fn resolve_mut(&mut self, scope: ScopeId, name: &str) -> Option<&mut Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let has = self.get(id).symbols.iter().any(|s| s.name == name);
            if has {
                return self
                    .get_mut(id)
                    .symbols
                    .iter_mut()
                    .find(|s| s.name == name);
            }
            current = self.get(id).parent;
        }
        None
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fname() -> PathBuf {
        PathBuf::from("t.cn")
    }

    #[test]
    fn duplicate_in_same_scope_is_rejected() {
        let mut tree = ScopeTree::new();
        let mut diags = DiagnosticBag::new();
        let g = tree.global();
        tree.declare(
            g,
            Symbol { name: "x".into(), kind: SymbolKind::Variable, scope: g, ty: Type::Int, is_public: false },
            &fname(),
            1,
            1,
            &mut diags,
        );
        tree.declare(
            g,
            Symbol { name: "x".into(), kind: SymbolKind::Variable, scope: g, ty: Type::Int, is_public: false },
            &fname(),
            2,
            1,
            &mut diags,
        );
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut tree = ScopeTree::new();
        let mut diags = DiagnosticBag::new();
        let g = tree.global();
        tree.declare(
            g,
            Symbol { name: "x".into(), kind: SymbolKind::Variable, scope: g, ty: Type::Int, is_public: false },
            &fname(),
            1,
            1,
            &mut diags,
        );
        let inner = tree.child(g, ScopeKind::Block);
        tree.declare(
            inner,
            Symbol { name: "x".into(), kind: SymbolKind::Variable, scope: inner, ty: Type::Bool, is_public: false },
            &fname(),
            2,
            1,
            &mut diags,
        );
        assert!(diags.is_empty());
        assert_eq!(tree.resolve(inner, "x").unwrap().ty, Type::Bool);
        assert_eq!(tree.resolve(g, "x").unwrap().ty, Type::Int);
    }

    #[test]
    fn unresolved_name_returns_none() {
        let tree = ScopeTree::new();
        assert!(tree.resolve(tree.global(), "missing").is_none());
    }
}
