//! Resolves the unresolved `TypeName` syntax tree produced by the parser
//! into a `cn_types::Type`, validating named types against declared
//! structs/enums.
//!
//! Lookups go through an owned [`ProgramTypes`] snapshot rather than
//! borrowing `Program` directly: the analyzer needs read access to struct
//! and enum declarations while mutably walking `Program`'s function bodies,
//! and the snapshot sidesteps that aliasing conflict.

use cn_ast::{EnumDecl, Program, StructDecl, TypeName};
use cn_diagnostics::{DiagnosticBag, ErrorCode};
use cn_types::Type;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ProgramTypes {
    pub structs: Vec<StructDecl>,
    pub enums: Vec<EnumDecl>,
}

impl ProgramTypes {
    pub fn from_program(program: &Program) -> Self {
        ProgramTypes {
            structs: program.structs.clone(),
            enums: program.enums.clone(),
        }
    }

    pub fn find_struct(&self, name: &str) -> Option<&StructDecl> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn find_enum(&self, name: &str) -> Option<&EnumDecl> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// Resolved type of `field` on struct `struct_name`, or `None` if either
    /// the struct or the field doesn't exist.
    pub fn field_type(
        &self,
        struct_name: &str,
        field: &str,
        filename: &Path,
        line: usize,
        column: usize,
        diagnostics: &mut DiagnosticBag,
    ) -> Option<Type> {
        let decl = self.find_struct(struct_name)?;
        let f = decl.fields.iter().find(|f| f.name == field)?;
        Some(resolve_type_name(
            &f.type_name,
            self,
            filename,
            line,
            column,
            diagnostics,
        ))
    }

    /// Struct fields in declaration order, as resolved types — used for
    /// positional struct-literal checking.
    pub fn field_types_in_order(
        &self,
        struct_name: &str,
        filename: &Path,
        line: usize,
        column: usize,
        diagnostics: &mut DiagnosticBag,
    ) -> Option<Vec<(String, Type)>> {
        let decl = self.find_struct(struct_name)?.clone();
        Some(
            decl.fields
                .iter()
                .map(|f| {
                    (
                        f.name.clone(),
                        resolve_type_name(&f.type_name, self, filename, line, column, diagnostics),
                    )
                })
                .collect(),
        )
    }
}

/// Enums have no dedicated `Type` variant (§3's type sum-type is
/// {int, float, bool, string, void, unknown, pointer, array, struct,
/// function}); an enum-typed value is represented by its underlying `Int`
/// representation, matching how the C backend emits it.
pub fn resolve_type_name(
    type_name: &TypeName,
    types: &ProgramTypes,
    filename: &Path,
    line: usize,
    column: usize,
    diagnostics: &mut DiagnosticBag,
) -> Type {
    match type_name {
        TypeName::Int => Type::Int,
        TypeName::Float => Type::Float,
        TypeName::Bool => Type::Bool,
        TypeName::String => Type::String,
        TypeName::Void => Type::Void,
        TypeName::Named(name) => {
            if types.find_struct(name).is_some() {
                Type::Struct(name.clone())
            } else if types.find_enum(name).is_some() {
                Type::Int
            } else {
                diagnostics.error(
                    ErrorCode::SemUndefinedIdentifier,
                    filename.to_path_buf(),
                    line,
                    column,
                    format!("未定义的类型: {name}"),
                );
                Type::Unknown
            }
        }
        TypeName::Pointer(inner) => Type::pointer_to(resolve_type_name(
            inner, types, filename, line, column, diagnostics,
        )),
        TypeName::Array(inner, len) => Type::array_of(
            resolve_type_name(inner, types, filename, line, column, diagnostics),
            *len,
        ),
    }
}
