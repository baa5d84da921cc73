//! Recursive-descent parser with precedence climbing, per §4.4.
//!
//! The token stream is fully materialized by the lexer before parsing
//! starts (same shape as the teacher's own `Parser<'a>` over a `Vec<Token>`
//! peeked by index rather than an iterator), which keeps lookahead trivial.

use cn_ast::*;
use cn_diagnostics::{DiagnosticBag, ErrorCode};
use cn_lexer::{Token, TokenKind};
use std::mem::discriminant;
use std::path::PathBuf;

/// Function names matching this pattern are tagged as interrupt-service
/// routines; the suffix digits become the interrupt vector (§3 invariant:
/// vector < IRQ_MAX, zero parameters). This is the "reserved syntax" the
/// core spec gestures at without naming a keyword — `中断` already lexes to
/// `Break` (see `cn_lexer::keywords`), so ISR tagging is a naming
/// convention on the function name instead of a dedicated keyword.
const ISR_NAME_PREFIX: &str = "中断处理_";

/// Identifiers that the parser special-cases as memory/hardware
/// intrinsics (§3). None of these appear in the closed keyword set of §6,
/// so they are recognized as ordinary call syntax on a fixed name set
/// rather than dedicated grammar productions.
fn memory_intrinsic_arity(name: &str) -> Option<usize> {
    match name {
        "read_memory" => Some(1),
        "write_memory" => Some(2),
        "memory_copy" => Some(3),
        "memory_set" => Some(3),
        "map_memory" => Some(2),
        "unmap_memory" => Some(2),
        "inline_asm" => Some(1),
        _ => None,
    }
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    filename: PathBuf,
    diagnostics: &'a mut DiagnosticBag,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, filename: impl Into<PathBuf>, diagnostics: &'a mut DiagnosticBag) -> Self {
        Parser {
            tokens,
            pos: 0,
            filename: filename.into(),
            diagnostics,
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::new();
        while !self.is_eof() {
            match self.current_kind() {
                TokenKind::KwFunction => {
                    if let Some(f) = self.parse_function() {
                        program.functions.push(f);
                    }
                }
                TokenKind::KwStruct => program.structs.push(self.parse_struct()),
                TokenKind::KwEnum => program.enums.push(self.parse_enum()),
                TokenKind::KwModule => program.modules.push(self.parse_module()),
                TokenKind::KwImport => program.imports.push(self.parse_import()),
                _ if self.looks_like_var_decl() => program.globals.push(self.parse_var_decl()),
                _ => {
                    self.error_expected("声明（函数、结构体、枚举、模块、导入或变量）");
                    self.synchronize();
                }
            }
        }
        program
    }

    // ------------------------------------------------------------------
    // Token stream helpers
    // ------------------------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn span(&self) -> Span {
        let t = self.current();
        Span::new(t.line, t.column)
    }

    fn is_eof(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn is(&self, kind: &TokenKind) -> bool {
        discriminant(self.current_kind()) == discriminant(kind)
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.is(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error_expected(what);
            false
        }
    }

    fn error_expected(&mut self, what: &str) {
        let span = self.span();
        self.diagnostics.error(
            ErrorCode::ParseExpectedToken,
            self.filename.clone(),
            span.line,
            span.column,
            format!("期望{what}，但遇到了其他内容"),
        );
    }

    fn error_invalid_expr(&mut self, message: impl Into<String>) {
        let span = self.span();
        self.diagnostics.error(
            ErrorCode::ParseInvalidExpr,
            self.filename.clone(),
            span.line,
            span.column,
            message.into(),
        );
    }

    /// Synchronize to the next `;`, `}`, or declaration-starting keyword,
    /// per §4.4's recovery contract.
    fn synchronize(&mut self) {
        loop {
            match self.current_kind() {
                TokenKind::Eof | TokenKind::RBrace => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::KwFunction
                | TokenKind::KwStruct
                | TokenKind::KwEnum
                | TokenKind::KwModule
                | TokenKind::KwImport
                | TokenKind::KwVar => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn identifier_name(&self) -> Option<String> {
        match self.current_kind() {
            TokenKind::Identifier(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn expect_identifier(&mut self, what: &str) -> String {
        if let Some(name) = self.identifier_name() {
            self.advance();
            name
        } else {
            self.error_expected(what);
            if !self.is_eof() {
                self.advance();
            }
            "<错误>".to_string()
        }
    }

    fn looks_like_var_decl(&self) -> bool {
        match self.current_kind() {
            TokenKind::KwVar | TokenKind::KwConst => true,
            TokenKind::KwInt | TokenKind::KwFloat | TokenKind::KwString | TokenKind::KwBool | TokenKind::KwVoid => true,
            TokenKind::Identifier(_) => {
                matches!(self.peek_kind(1), TokenKind::Identifier(_))
            }
            _ => false,
        }
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn parse_base_type_name(&mut self) -> TypeName {
        let ty = match self.current_kind() {
            TokenKind::KwInt => TypeName::Int,
            TokenKind::KwFloat => TypeName::Float,
            TokenKind::KwString => TypeName::String,
            TokenKind::KwBool => TypeName::Bool,
            TokenKind::KwVoid => TypeName::Void,
            TokenKind::Identifier(name) => TypeName::Named(name.clone()),
            _ => {
                self.error_expected("类型");
                TypeName::Named("<错误>".to_string())
            }
        };
        self.advance();
        ty
    }

    /// Applies the optional `[]` / `[N]` suffix that follows a declared
    /// name, turning `base` into a pointer or fixed-size array type.
    fn parse_type_suffix(&mut self, base: TypeName) -> TypeName {
        if !self.eat(&TokenKind::LBracket) {
            return base;
        }
        if self.eat(&TokenKind::RBracket) {
            return TypeName::Pointer(Box::new(base));
        }
        if let TokenKind::IntLiteral(n) = *self.current_kind() {
            self.advance();
            self.expect(&TokenKind::RBracket, "']'");
            return TypeName::Array(Box::new(base), n.max(0) as usize);
        }
        self.error_expected("数组长度或']'");
        self.expect(&TokenKind::RBracket, "']'");
        TypeName::Pointer(Box::new(base))
    }

    // ------------------------------------------------------------------
    // Top-level declarations
    // ------------------------------------------------------------------

    fn parse_function(&mut self) -> Option<FunctionDecl> {
        let span = self.span();
        self.advance(); // 函数
        let name = match self.identifier_name() {
            Some(name) => {
                self.advance();
                name
            }
            None => {
                let name_span = self.span();
                self.diagnostics.error(
                    ErrorCode::ParseInvalidFunctionName,
                    self.filename.clone(),
                    name_span.line,
                    name_span.column,
                    "函数名不能是关键字",
                );
                if !self.is_eof() {
                    self.advance();
                }
                "<错误>".to_string()
            }
        };

        self.expect(&TokenKind::LParen, "'('");
        let params = self.parse_param_list();
        self.expect(&TokenKind::RParen, "')'");

        let return_type = if self.eat(&TokenKind::Colon) {
            self.parse_base_type_name()
        } else {
            TypeName::Void
        };

        let body = if self.expect(&TokenKind::LBrace, "'{'") {
            self.parse_statements_until(&TokenKind::RBrace)
        } else {
            Vec::new()
        };
        self.expect(&TokenKind::RBrace, "'}'");

        let interrupt_vector = name
            .strip_prefix(ISR_NAME_PREFIX)
            .and_then(|suffix| suffix.parse::<u32>().ok());

        Some(FunctionDecl {
            name,
            params,
            return_type,
            body,
            is_interrupt_handler: interrupt_vector.is_some(),
            interrupt_vector,
            span,
        })
    }

    fn parse_param_list(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        if self.is(&TokenKind::RParen) {
            return params;
        }
        loop {
            let span = self.span();
            let is_const = self.eat(&TokenKind::KwConst);
            let base = self.parse_base_type_name();
            let name = self.expect_identifier("参数名");
            let type_name = self.parse_type_suffix(base);
            params.push(Param {
                name,
                type_name,
                is_const,
                span,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        params
    }

    fn parse_struct(&mut self) -> StructDecl {
        let span = self.span();
        self.advance(); // 结构体
        let name = self.expect_identifier("结构体名");
        self.expect(&TokenKind::LBrace, "'{'");
        let mut fields = Vec::new();
        while !self.is(&TokenKind::RBrace) && !self.is_eof() {
            let is_const = self.eat(&TokenKind::KwConst);
            let base = self.parse_base_type_name();
            let field_name = self.expect_identifier("字段名");
            let type_name = self.parse_type_suffix(base);
            self.expect(&TokenKind::Semicolon, "';'");
            fields.push(StructField {
                name: field_name,
                type_name,
                is_const,
            });
        }
        self.expect(&TokenKind::RBrace, "'}'");
        StructDecl { name, fields, span }
    }

    fn parse_enum(&mut self) -> EnumDecl {
        let span = self.span();
        self.advance(); // 枚举
        let name = self.expect_identifier("枚举名");
        self.expect(&TokenKind::LBrace, "'{'");
        let mut members = Vec::new();
        while !self.is(&TokenKind::RBrace) && !self.is_eof() {
            let member_name = self.expect_identifier("枚举成员名");
            let value = if self.eat(&TokenKind::Assign) {
                match *self.current_kind() {
                    TokenKind::IntLiteral(n) => {
                        self.advance();
                        Some(n)
                    }
                    _ => {
                        self.error_expected("整数常量");
                        None
                    }
                }
            } else {
                None
            };
            members.push(EnumMember { name: member_name, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'");
        EnumDecl { name, members, span }
    }

    fn parse_module(&mut self) -> ModuleDecl {
        let span = self.span();
        self.advance(); // 模块
        let name = self.expect_identifier("模块名");
        self.expect(&TokenKind::LBrace, "'{'");
        let mut statements = Vec::new();
        let mut functions = Vec::new();
        while !self.is(&TokenKind::RBrace) && !self.is_eof() {
            let _visibility = self.parse_optional_visibility();
            match self.current_kind() {
                TokenKind::KwFunction => {
                    if let Some(f) = self.parse_function() {
                        functions.push(f);
                    }
                }
                _ if self.looks_like_var_decl() => {
                    statements.push(Stmt::VarDecl(self.parse_var_decl()));
                }
                TokenKind::KwStruct => statements.push(Stmt::StructDecl(self.parse_struct())),
                TokenKind::KwEnum => statements.push(Stmt::EnumDecl(self.parse_enum())),
                TokenKind::KwImport => statements.push(Stmt::Import(self.parse_import())),
                _ => {
                    self.error_expected("模块成员（函数或变量声明）");
                    self.synchronize();
                }
            }
        }
        self.expect(&TokenKind::RBrace, "'}'");
        ModuleDecl {
            name,
            statements,
            functions,
            span,
        }
    }

    fn parse_optional_visibility(&mut self) -> Visibility {
        if self.eat(&TokenKind::KwPublic) {
            Visibility::Public
        } else if self.eat(&TokenKind::KwPrivate) {
            Visibility::Private
        } else {
            Visibility::Private
        }
    }

    fn parse_import(&mut self) -> ImportDecl {
        let span = self.span();
        self.advance(); // 导入
        let path = if let TokenKind::StringLiteral(s) = self.current_kind() {
            let s = s.clone();
            self.advance();
            s
        } else {
            let mut segments = vec![self.expect_identifier("导入路径")];
            while self.eat(&TokenKind::Dot) {
                segments.push(self.expect_identifier("导入路径"));
            }
            segments.join(".")
        };
        self.expect(&TokenKind::Semicolon, "';'");
        ImportDecl { path, span }
    }

    /// Handles both `变量 name [: type] [= expr];` and the typed form
    /// `type name [= expr];`, with an optional leading `常量`.
    fn parse_var_decl(&mut self) -> VarDecl {
        let span = self.span();
        let is_const = self.eat(&TokenKind::KwConst);
        let visibility = self.parse_optional_visibility();

        if self.eat(&TokenKind::KwVar) {
            let name = self.expect_identifier("变量名");
            let declared_type = if self.eat(&TokenKind::Colon) {
                Some(self.parse_base_type_name())
            } else {
                None
            };
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_expression())
            } else {
                None
            };
            self.expect(&TokenKind::Semicolon, "';'");
            VarDecl::new(name, declared_type, init, is_const, visibility, span)
        } else {
            let base = self.parse_base_type_name();
            let name = self.expect_identifier("变量名");
            let declared_type = Some(self.parse_type_suffix(base));
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_expression())
            } else {
                None
            };
            self.expect(&TokenKind::Semicolon, "';'");
            VarDecl::new(name, declared_type, init, is_const, visibility, span)
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statements_until(&mut self, terminator: &TokenKind) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        while !self.is(terminator) && !self.is_eof() {
            stmts.push(self.parse_statement());
        }
        stmts
    }

    fn parse_statement(&mut self) -> Stmt {
        match self.current_kind() {
            TokenKind::LBrace => {
                self.advance();
                let body = self.parse_statements_until(&TokenKind::RBrace);
                self.expect(&TokenKind::RBrace, "'}'");
                Stmt::Block(body)
            }
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Break => {
                let span = self.span();
                self.advance();
                self.expect(&TokenKind::Semicolon, "';'");
                Stmt::Break(span)
            }
            TokenKind::Continue => {
                let span = self.span();
                self.advance();
                self.expect(&TokenKind::Semicolon, "';'");
                Stmt::Continue(span)
            }
            TokenKind::KwStruct => Stmt::StructDecl(self.parse_struct()),
            TokenKind::KwEnum => Stmt::EnumDecl(self.parse_enum()),
            TokenKind::KwModule => Stmt::ModuleDecl(self.parse_module()),
            TokenKind::KwImport => Stmt::Import(self.parse_import()),
            _ if self.looks_like_var_decl() => Stmt::VarDecl(self.parse_var_decl()),
            _ => {
                let expr = self.parse_expression();
                self.expect(&TokenKind::Semicolon, "';'");
                Stmt::Expr(expr)
            }
        }
    }

    fn parse_return(&mut self) -> Stmt {
        let span = self.span();
        self.advance(); // 返回
        let value = if self.is(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(&TokenKind::Semicolon, "';'");
        Stmt::Return { value, span }
    }

    fn parse_if(&mut self) -> Stmt {
        let span = self.span();
        self.advance(); // 如果
        self.expect(&TokenKind::LParen, "'('");
        let cond = self.parse_expression();
        self.expect(&TokenKind::RParen, "')'");
        let then_branch = Box::new(self.parse_statement());
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()))
        } else {
            None
        };
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            span,
        }
    }

    fn parse_while(&mut self) -> Stmt {
        let span = self.span();
        self.advance(); // 当
        self.expect(&TokenKind::LParen, "'('");
        let cond = self.parse_expression();
        self.expect(&TokenKind::RParen, "')'");
        let body = Box::new(self.parse_statement());
        Stmt::While { cond, body, span }
    }

    fn parse_for(&mut self) -> Stmt {
        let span = self.span();
        self.advance(); // 循环
        self.expect(&TokenKind::LParen, "'('");

        let init = if self.eat(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_statement()))
        };

        let cond = if self.is(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(&TokenKind::Semicolon, "';'");

        let update = if self.is(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(Stmt::Expr(self.parse_expression())))
        };
        self.expect(&TokenKind::RParen, "')'");
        let body = Box::new(self.parse_statement());

        Stmt::For {
            init,
            cond,
            update,
            body,
            span,
        }
    }

    fn parse_switch(&mut self) -> Stmt {
        let span = self.span();
        self.advance(); // 选择
        self.expect(&TokenKind::LParen, "'('");
        let scrutinee = self.parse_expression();
        self.expect(&TokenKind::RParen, "')'");
        self.expect(&TokenKind::LBrace, "'{'");

        let mut cases = Vec::new();
        let mut default = None;
        loop {
            match self.current_kind() {
                TokenKind::Case => {
                    let case_span = self.span();
                    self.advance();
                    let value = match *self.current_kind() {
                        TokenKind::IntLiteral(n) => {
                            self.advance();
                            n
                        }
                        _ => {
                            self.error_expected("整数常量");
                            0
                        }
                    };
                    self.expect(&TokenKind::Colon, "':'");
                    self.expect(&TokenKind::LBrace, "'{'");
                    let body = self.parse_statements_until(&TokenKind::RBrace);
                    self.expect(&TokenKind::RBrace, "'}'");
                    cases.push(SwitchCase {
                        value,
                        body,
                        span: case_span,
                    });
                }
                TokenKind::Default => {
                    self.advance();
                    self.expect(&TokenKind::Colon, "':'");
                    self.expect(&TokenKind::LBrace, "'{'");
                    default = Some(self.parse_statements_until(&TokenKind::RBrace));
                    self.expect(&TokenKind::RBrace, "'}'");
                }
                TokenKind::RBrace | TokenKind::Eof => break,
                _ => {
                    self.error_expected("'情况'、'默认' 或 '}'");
                    self.synchronize();
                    if self.is(&TokenKind::RBrace) || self.is_eof() {
                        break;
                    }
                }
            }
        }
        self.expect(&TokenKind::RBrace, "'}'");
        Stmt::Switch {
            scrutinee,
            cases,
            default,
            span,
        }
    }

    // ------------------------------------------------------------------
    // Expressions (precedence climbing, low to high)
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Expr {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Expr {
        let left = self.parse_logical_or();
        if self.eat(&TokenKind::Assign) {
            let span = left.span;
            let value = self.parse_assignment(); // right-associative
            Expr::new(
                ExprKind::Assignment {
                    target: Box::new(left),
                    value: Box::new(value),
                },
                span,
            )
        } else {
            left
        }
    }

    fn parse_logical_or(&mut self) -> Expr {
        let mut left = self.parse_logical_and();
        while self.eat(&TokenKind::OrOr) {
            let span = left.span;
            let right = self.parse_logical_and();
            left = Expr::new(
                ExprKind::Logical {
                    op: LogicalOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        left
    }

    fn parse_logical_and(&mut self) -> Expr {
        let mut left = self.parse_bitor();
        while self.eat(&TokenKind::AndAnd) {
            let span = left.span;
            let right = self.parse_bitor();
            left = Expr::new(
                ExprKind::Logical {
                    op: LogicalOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        left
    }

    fn parse_bitor(&mut self) -> Expr {
        let mut left = self.parse_bitxor();
        while self.eat(&TokenKind::Pipe) {
            left = self.binary(left, BinaryOp::BitOr, Self::parse_bitxor);
        }
        left
    }

    fn parse_bitxor(&mut self) -> Expr {
        let mut left = self.parse_bitand();
        while self.eat(&TokenKind::Caret) {
            left = self.binary(left, BinaryOp::BitXor, Self::parse_bitand);
        }
        left
    }

    fn parse_bitand(&mut self) -> Expr {
        let mut left = self.parse_equality();
        while self.eat(&TokenKind::Amp) {
            left = self.binary(left, BinaryOp::BitAnd, Self::parse_equality);
        }
        left
    }

    fn parse_equality(&mut self) -> Expr {
        let mut left = self.parse_relational();
        loop {
            let op = if self.eat(&TokenKind::EqEq) {
                BinaryOp::Eq
            } else if self.eat(&TokenKind::NotEq) {
                BinaryOp::Ne
            } else {
                break;
            };
            left = self.binary(left, op, Self::parse_relational);
        }
        left
    }

    fn parse_relational(&mut self) -> Expr {
        let mut left = self.parse_shift();
        loop {
            let op = if self.eat(&TokenKind::Lt) {
                BinaryOp::Lt
            } else if self.eat(&TokenKind::Le) {
                BinaryOp::Le
            } else if self.eat(&TokenKind::Gt) {
                BinaryOp::Gt
            } else if self.eat(&TokenKind::Ge) {
                BinaryOp::Ge
            } else {
                break;
            };
            left = self.binary(left, op, Self::parse_shift);
        }
        left
    }

    fn parse_shift(&mut self) -> Expr {
        let mut left = self.parse_additive();
        loop {
            let op = if self.eat(&TokenKind::Shl) {
                BinaryOp::Shl
            } else if self.eat(&TokenKind::Shr) {
                BinaryOp::Shr
            } else {
                break;
            };
            left = self.binary(left, op, Self::parse_additive);
        }
        left
    }

    fn parse_additive(&mut self) -> Expr {
        let mut left = self.parse_multiplicative();
        loop {
            let op = if self.eat(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.eat(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            left = self.binary(left, op, Self::parse_multiplicative);
        }
        left
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut left = self.parse_unary();
        loop {
            let op = if self.eat(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.eat(&TokenKind::Slash) {
                BinaryOp::Div
            } else if self.eat(&TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            left = self.binary(left, op, Self::parse_unary);
        }
        left
    }

    fn binary(&mut self, left: Expr, op: BinaryOp, next: fn(&mut Self) -> Expr) -> Expr {
        let span = left.span;
        let right = next(self);
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    fn parse_unary(&mut self) -> Expr {
        let span = self.span();
        let op = if self.eat(&TokenKind::Bang) {
            Some(UnaryOp::Not)
        } else if self.eat(&TokenKind::Minus) {
            Some(UnaryOp::Neg)
        } else if self.eat(&TokenKind::Amp) {
            Some(UnaryOp::AddressOf)
        } else if self.eat(&TokenKind::Star) {
            Some(UnaryOp::Deref)
        } else if self.eat(&TokenKind::Tilde) {
            Some(UnaryOp::BitNot)
        } else {
            None
        };
        match op {
            Some(op) => {
                let operand = self.parse_unary();
                Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                )
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        loop {
            if self.eat(&TokenKind::LParen) {
                let span = expr.span;
                let mut args = Vec::new();
                if !self.is(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expression());
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen, "')'");
                expr = self.finish_call(expr, args, span);
            } else if self.eat(&TokenKind::LBracket) {
                let span = expr.span;
                let index = self.parse_expression();
                self.expect(&TokenKind::RBracket, "']'");
                expr = Expr::new(
                    ExprKind::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else if self.eat(&TokenKind::Dot) {
                let span = expr.span;
                let field = self.expect_identifier("字段名");
                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        field,
                        arrow: false,
                    },
                    span,
                );
            } else if self.eat(&TokenKind::Arrow) {
                let span = expr.span;
                let field = self.expect_identifier("字段名");
                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        field,
                        arrow: true,
                    },
                    span,
                );
            } else {
                break;
            }
        }
        expr
    }

    /// Rewrites a call whose callee is one of the fixed memory-intrinsic
    /// names into the dedicated AST node, when its arity matches; anything
    /// else stays an ordinary call (§3 memory intrinsics).
    fn finish_call(&mut self, callee: Expr, mut args: Vec<Expr>, span: Span) -> Expr {
        if let ExprKind::Identifier(name) = &callee.kind {
            if let Some(expected_arity) = memory_intrinsic_arity(name) {
                if args.len() == expected_arity {
                    let intrinsic = match name.as_str() {
                        "read_memory" => MemoryIntrinsic::ReadMemory {
                            address: Box::new(args.remove(0)),
                        },
                        "write_memory" => {
                            let address = args.remove(0);
                            let value = args.remove(0);
                            MemoryIntrinsic::WriteMemory {
                                address: Box::new(address),
                                value: Box::new(value),
                            }
                        }
                        "memory_copy" => {
                            let dest = args.remove(0);
                            let src = args.remove(0);
                            let len = args.remove(0);
                            MemoryIntrinsic::MemoryCopy {
                                dest: Box::new(dest),
                                src: Box::new(src),
                                len: Box::new(len),
                            }
                        }
                        "memory_set" => {
                            let dest = args.remove(0);
                            let value = args.remove(0);
                            let len = args.remove(0);
                            MemoryIntrinsic::MemorySet {
                                dest: Box::new(dest),
                                value: Box::new(value),
                                len: Box::new(len),
                            }
                        }
                        "map_memory" => {
                            let address = args.remove(0);
                            let len = args.remove(0);
                            MemoryIntrinsic::MapMemory {
                                address: Box::new(address),
                                len: Box::new(len),
                            }
                        }
                        "unmap_memory" => {
                            let address = args.remove(0);
                            let len = args.remove(0);
                            MemoryIntrinsic::UnmapMemory {
                                address: Box::new(address),
                                len: Box::new(len),
                            }
                        }
                        "inline_asm" => {
                            let template = match &args[0].kind {
                                ExprKind::StringLiteral(s) => s.clone(),
                                _ => {
                                    self.error_invalid_expr("inline_asm 需要一个字符串字面量模板");
                                    String::new()
                                }
                            };
                            MemoryIntrinsic::InlineAsm { template }
                        }
                        _ => unreachable!(),
                    };
                    return Expr::new(ExprKind::MemoryIntrinsic(intrinsic), span);
                }
            }
        }
        Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            span,
        )
    }

    fn parse_primary(&mut self) -> Expr {
        let span = self.span();
        match self.current_kind().clone() {
            TokenKind::IntLiteral(n) => {
                self.advance();
                Expr::new(ExprKind::IntLiteral(n), span)
            }
            TokenKind::FloatLiteral(f) => {
                self.advance();
                Expr::new(ExprKind::FloatLiteral(f), span)
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                Expr::new(ExprKind::StringLiteral(s), span)
            }
            TokenKind::True => {
                self.advance();
                Expr::new(ExprKind::BoolLiteral(true), span)
            }
            TokenKind::False => {
                self.advance();
                Expr::new(ExprKind::BoolLiteral(false), span)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.is(&TokenKind::LBrace) {
                    self.parse_struct_literal(name, span)
                } else {
                    Expr::new(ExprKind::Identifier(name), span)
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression();
                self.expect(&TokenKind::RParen, "')'");
                inner
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.is(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expression());
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket, "']'");
                Expr::new(ExprKind::ArrayLiteral(items), span)
            }
            _ => {
                self.error_invalid_expr("期望一个表达式");
                if !self.is_eof() {
                    self.advance();
                }
                Expr::new(ExprKind::IntLiteral(0), span)
            }
        }
    }

    fn parse_struct_literal(&mut self, type_name: String, span: Span) -> Expr {
        self.advance(); // '{'
        let fields = if self.is(&TokenKind::Dot) {
            let mut named = Vec::new();
            while self.eat(&TokenKind::Dot) {
                let field = self.expect_identifier("字段名");
                self.expect(&TokenKind::Assign, "'='");
                let value = self.parse_expression();
                named.push((field, value));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            StructLiteralFields::Named(named)
        } else {
            let mut positional = Vec::new();
            if !self.is(&TokenKind::RBrace) {
                loop {
                    positional.push(self.parse_expression());
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            StructLiteralFields::Positional(positional)
        };
        self.expect(&TokenKind::RBrace, "'}'");
        Expr::new(ExprKind::StructLiteral { type_name, fields }, span)
    }
}

/// Convenience entry point mirroring the lexer/preprocessor phase-function
/// shape.
pub fn parse(tokens: Vec<Token>, filename: impl Into<PathBuf>, diagnostics: &mut DiagnosticBag) -> Program {
    Parser::new(tokens, filename, diagnostics).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_lexer::lex;
    use std::path::Path;

    fn parse_source(source: &str) -> (Program, DiagnosticBag) {
        let mut diags = DiagnosticBag::new();
        let tokens = lex(source, Path::new("t.cn"), &mut diags);
        let program = parse(tokens, Path::new("t.cn"), &mut diags);
        (program, diags)
    }

    #[test]
    fn parses_minimal_function() {
        let (program, diags) = parse_source("函数 主程序() { 返回 0; }");
        assert!(diags.is_empty());
        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].name, "主程序");
        assert_eq!(program.functions[0].body.len(), 1);
    }

    #[test]
    fn parses_typed_and_named_variable_forms() {
        let (program, diags) = parse_source("整数 计数 = 0; 变量 x: 整数 = 1;");
        assert!(diags.is_empty());
        assert_eq!(program.globals.len(), 2);
        assert_eq!(program.globals[0].name, "计数");
        assert_eq!(program.globals[1].name, "x");
    }

    #[test]
    fn parses_struct_with_fields_and_literal() {
        let (program, diags) = parse_source(
            "结构体 点 { 整数 x; 整数 y; } 函数 主程序() { 变量 p: 点 = 点 { 1, 2 }; 返回 0; }",
        );
        assert!(diags.is_empty());
        assert_eq!(program.structs.len(), 1);
        assert_eq!(program.structs[0].fields.len(), 2);
    }

    #[test]
    fn parses_enum_with_explicit_values() {
        let (program, diags) = parse_source("枚举 颜色 { 红 = 1, 绿 = 2, 蓝 }");
        assert!(diags.is_empty());
        let e = &program.enums[0];
        assert_eq!(e.members[0].value, Some(1));
        assert_eq!(e.members[2].value, None);
    }

    #[test]
    fn parses_if_while_for_and_switch() {
        let source = "函数 f() {
            如果 (真) { 返回 1; } 否则 { 返回 0; }
            当 (假) { 中断; }
            循环 (变量 i: 整数 = 0; i < 10; i = i + 1) { 继续; }
            选择 (1) { 情况 1: { 返回 1; } 默认: { 返回 0; } }
        }";
        let (program, diags) = parse_source(source);
        assert!(diags.is_empty());
        assert_eq!(program.functions[0].body.len(), 4);
    }

    #[test]
    fn precedence_climbs_correctly() {
        let (program, diags) = parse_source("整数 r = 1 + 2 * 3;");
        assert!(diags.is_empty());
        let init = program.globals[0].init.as_ref().unwrap();
        match &init.kind {
            ExprKind::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected top-level add, got {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        let (program, diags) = parse_source("函数 f() { 变量 a: 整数 = 0; 变量 b: 整数 = 0; a = b = 1; }");
        assert!(diags.is_empty());
        if let Stmt::Expr(expr) = &program.functions[0].body[2] {
            match &expr.kind {
                ExprKind::Assignment { value, .. } => {
                    assert!(matches!(value.kind, ExprKind::Assignment { .. }));
                }
                other => panic!("expected assignment, got {other:?}"),
            }
        } else {
            panic!("expected expression statement");
        }
    }

    #[test]
    fn postfix_call_index_and_member_chain() {
        let (program, diags) = parse_source("函数 f() { 返回 a.b[0](1); }");
        assert!(diags.is_empty());
        if let Stmt::Return { value: Some(expr), .. } = &program.functions[0].body[0] {
            assert!(matches!(expr.kind, ExprKind::Call { .. }));
        } else {
            panic!("expected return with call expression");
        }
    }

    #[test]
    fn invalid_function_name_is_diagnosed() {
        let (_, diags) = parse_source("函数 如果() { }");
        assert!(diags.has_errors());
    }

    #[test]
    fn error_recovery_reports_multiple_diagnostics() {
        let source = "函数 a() { 1 2; } 函数 b() { 3 4; }";
        let (_, diags) = parse_source(source);
        assert!(diags.error_count() >= 2);
    }

    #[test]
    fn interrupt_handler_name_sets_vector() {
        let (program, diags) = parse_source("函数 中断处理_3() { }");
        assert!(diags.is_empty());
        let f = &program.functions[0];
        assert!(f.is_interrupt_handler);
        assert_eq!(f.interrupt_vector, Some(3));
        assert!(f.params.is_empty());
    }

    #[test]
    fn memory_intrinsic_call_is_recognized() {
        let (program, diags) = parse_source("函数 f() { 返回 read_memory(1); }");
        assert!(diags.is_empty());
        if let Stmt::Return { value: Some(expr), .. } = &program.functions[0].body[0] {
            assert!(matches!(expr.kind, ExprKind::MemoryIntrinsic(MemoryIntrinsic::ReadMemory { .. })));
        } else {
            panic!("expected return with memory intrinsic");
        }
    }
}
