//! Abstract syntax tree for CN.
//!
//! Every node here is owned by the `Program` it is parsed into — there is
//! no arena indirection at this layer (plain `Vec`/`Box` ownership, the way
//! the teacher compiler owns its `WordDef`/`Statement` trees); the
//! `cn-arena` crate is reserved for the IR, whose basic blocks form a
//! genuine graph rather than a tree.

use cn_types::Type;

pub const IRQ_MAX: u32 = 256;

/// 1-based source location, per the token invariant in the core spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Span { line, column }
    }
}

/// Unresolved type syntax as written by the programmer. The semantic
/// analyzer turns this into a `cn_types::Type`, validating that any named
/// type actually refers to a declared struct or enum.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeName {
    Int,
    Float,
    Bool,
    String,
    Void,
    /// Struct or enum name, resolved by the semantic analyzer.
    Named(String),
    Pointer(Box<TypeName>),
    Array(Box<TypeName>, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    AddressOf,
    Deref,
    BitNot,
}

/// Fields of a struct literal, either positional (resolved by declaration
/// order during semantics) or named (`.field = value`).
#[derive(Debug, Clone, PartialEq)]
pub enum StructLiteralFields {
    Positional(Vec<Expr>),
    Named(Vec<(String, Expr)>),
}

/// The memory- and hardware-facing intrinsic forms, available only under
/// freestanding compilation (§4.5 freestanding check).
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryIntrinsic {
    ReadMemory { address: Box<Expr> },
    WriteMemory { address: Box<Expr>, value: Box<Expr> },
    MemoryCopy { dest: Box<Expr>, src: Box<Expr>, len: Box<Expr> },
    MemorySet { dest: Box<Expr>, value: Box<Expr>, len: Box<Expr> },
    MapMemory { address: Box<Expr>, len: Box<Expr> },
    UnmapMemory { address: Box<Expr>, len: Box<Expr> },
    /// Raw inline assembly template text, opaque to the core — the C
    /// backend emits it verbatim inside a `__asm__` block.
    InlineAsm { template: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLiteral(i64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    StringLiteral(String),
    Identifier(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Assignment {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    ArrayLiteral(Vec<Expr>),
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// `object.field` (dot) or `object->field` (arrow, pointer-to-struct).
    Member {
        object: Box<Expr>,
        field: String,
        arrow: bool,
    },
    StructLiteral {
        type_name: String,
        fields: StructLiteralFields,
    },
    MemoryIntrinsic(MemoryIntrinsic),
}

/// An expression node. `ty` starts as `Type::Unknown` and is filled in by
/// the type checker (pass 3 of the semantic analyzer); it is never absent
/// after type checking runs, per the §3 invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Type,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            ty: Type::Unknown,
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub declared_type: Option<TypeName>,
    pub init: Option<Expr>,
    pub is_const: bool,
    pub visibility: Visibility,
    pub span: Span,
    /// Filled in by the semantic analyzer once the declared (or inferred)
    /// type has been resolved and checked.
    pub resolved_type: Type,
}

impl VarDecl {
    pub fn new(
        name: String,
        declared_type: Option<TypeName>,
        init: Option<Expr>,
        is_const: bool,
        visibility: Visibility,
        span: Span,
    ) -> Self {
        VarDecl {
            name,
            declared_type,
            init,
            is_const,
            visibility,
            span,
            resolved_type: Type::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub value: i64,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub type_name: TypeName,
    pub is_const: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<StructField>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<EnumMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub name: String,
    pub statements: Vec<Stmt>,
    pub functions: Vec<FunctionDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub path: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    VarDecl(VarDecl),
    Expr(Expr),
    Return {
        value: Option<Expr>,
        span: Span,
    },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Box<Stmt>,
        span: Span,
    },
    Break(Span),
    Continue(Span),
    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
        span: Span,
    },
    StructDecl(StructDecl),
    EnumDecl(EnumDecl),
    ModuleDecl(ModuleDecl),
    Import(ImportDecl),
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_name: TypeName,
    pub is_const: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeName,
    pub body: Vec<Stmt>,
    pub is_interrupt_handler: bool,
    /// Interrupt vector number; must be `< IRQ_MAX` and the function must
    /// take no parameters (§3 invariant), checked by the semantic analyzer.
    pub interrupt_vector: Option<u32>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub functions: Vec<FunctionDecl>,
    pub structs: Vec<StructDecl>,
    pub enums: Vec<EnumDecl>,
    pub modules: Vec<ModuleDecl>,
    pub imports: Vec<ImportDecl>,
    pub globals: Vec<VarDecl>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_struct(&self, name: &str) -> Option<&StructDecl> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn find_enum(&self, name: &str) -> Option<&EnumDecl> {
        self.enums.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_finds_declared_function() {
        let mut program = Program::new();
        program.functions.push(FunctionDecl {
            name: "主程序".to_string(),
            params: vec![],
            return_type: TypeName::Int,
            body: vec![],
            is_interrupt_handler: false,
            interrupt_vector: None,
            span: Span::new(1, 1),
        });
        assert!(program.find_function("主程序").is_some());
        assert!(program.find_function("missing").is_none());
    }

    #[test]
    fn expr_starts_with_unknown_type() {
        let expr = Expr::new(ExprKind::IntLiteral(1), Span::new(1, 1));
        assert!(expr.ty.is_unknown());
    }

    #[test]
    fn interrupt_vector_constraint_is_expressible() {
        let f = FunctionDecl {
            name: "计时器中断".to_string(),
            params: vec![],
            return_type: TypeName::Void,
            body: vec![],
            is_interrupt_handler: true,
            interrupt_vector: Some(3),
            span: Span::new(1, 1),
        };
        assert!(f.interrupt_vector.unwrap() < IRQ_MAX);
        assert!(f.params.is_empty());
    }
}
