//! `cn_types::Type` -> C type-name rendering.

use cn_types::Type;

/// Renders `ty` as a C type name. Arrays render the same as a pointer to
/// their element, matching the generator's "arrays decay to their base
/// pointer" convention (`cn-ir`'s `generator.rs`): a runtime-allocated
/// array is handed around as a pointer everywhere past its `alloca`/
/// `cn_rt_array_alloc` site.
pub fn c_type(ty: &Type) -> String {
    match ty {
        Type::Int => "int64_t".to_string(),
        Type::Float => "double".to_string(),
        Type::Bool => "bool".to_string(),
        Type::String => "const char*".to_string(),
        Type::Void => "void".to_string(),
        Type::Unknown => "void*".to_string(),
        Type::Pointer(inner) => format!("{}*", c_type(inner)),
        Type::Array(inner, _) => format!("{}*", c_type(inner)),
        Type::Struct(name) => format!("struct {}", struct_type_name(name)),
        Type::Function { ret, params } => {
            let param_list = params.iter().map(|p| c_type(p)).collect::<Vec<_>>().join(", ");
            format!("{} (*)({})", c_type(ret), param_list)
        }
    }
}

/// `struct cn_struct_<name>` tag, per §4.8's "struct definitions" with
/// field order preserved; the name itself is carried through unmodified
/// (including non-ASCII bytes), matching `cn_var_`/`cn_func_`-style
/// prefixing elsewhere (§6) rather than any transliteration.
pub fn struct_type_name(name: &str) -> String {
    format!("cn_struct_{name}")
}

pub fn var_name(name: &str) -> String {
    format!("cn_var_{name}")
}

pub fn func_name(name: &str) -> String {
    format!("cn_func_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_types_map_to_stdint_bool_double() {
        assert_eq!(c_type(&Type::Int), "int64_t");
        assert_eq!(c_type(&Type::Bool), "bool");
        assert_eq!(c_type(&Type::Float), "double");
    }

    #[test]
    fn pointer_and_array_both_render_as_pointer() {
        assert_eq!(c_type(&Type::pointer_to(Type::Int)), "int64_t*");
        assert_eq!(c_type(&Type::array_of(Type::Int, 4)), "int64_t*");
    }

    #[test]
    fn struct_type_keeps_original_name() {
        assert_eq!(c_type(&Type::Struct("点".to_string())), "struct cn_struct_点");
    }
}
