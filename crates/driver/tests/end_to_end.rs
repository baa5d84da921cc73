//! End-to-end pipeline coverage for the six scenarios enumerated in the
//! shared testable-properties list: hello world, arithmetic fold,
//! macro+conditional, invalid-identifier error, struct member access, and
//! switch-no-fallthrough. Exercises `cn_driver`'s public functions directly
//! rather than spawning the `cnc` binary, since the binary itself is only
//! argument parsing and file I/O over the same calls.

use std::path::PathBuf;

fn filename() -> PathBuf {
    PathBuf::from("e2e.cn")
}

#[test]
fn hello_world_emits_c_with_print_and_main_wrapper() {
    let source = r#"
    函数 主程序(): 整数 {
        打印行("你好，世界！");
        返回 0;
    }
    "#;
    let c = cn_driver::emit_c(source, &filename(), false, "x86_64-unknown-linux-gnu")
        .expect("hello world compiles to C");
    assert!(c.contains("cn_rt_print_string"));
    assert!(c.contains("int main(void)"));
}

#[test]
fn arithmetic_fold_scenario_reduces_to_one_constant() {
    let source = r#"
    函数 主程序(): 整数 {
        返回 (2 + 3) * 4;
    }
    "#;
    let ir = cn_driver::emit_ir(source, &filename(), false, "x86_64-unknown-linux-gnu")
        .expect("arithmetic fold compiles");
    assert!(ir.contains("20"));
    assert!(!ir.contains("Add"), "constant folding should remove the Add opcode entirely");
}

#[test]
fn macro_and_conditional_scenario_expands_before_lexing() {
    let source = r#"
    #定义 调试模式
    #如果定义 调试模式
    函数 主程序(): 整数 {
        返回 1;
    }
    #否则
    函数 主程序(): 整数 {
        返回 0;
    }
    #结束如果
    "#;
    let result = cn_driver::check(source, &filename(), false);
    assert!(result.is_ok(), "{result:?}");
}

#[test]
fn invalid_identifier_scenario_is_a_semantic_error() {
    let source = r#"
    函数 主程序(): 整数 {
        返回 未定义标识符;
    }
    "#;
    let diagnostics = cn_driver::check(source, &filename(), false).expect_err("undefined identifier must fail");
    assert!(diagnostics.has_errors());
}

#[test]
fn struct_member_access_scenario_compiles_to_arrow_syntax() {
    let source = r#"
    结构体 点 {
        整数 x;
        整数 y;
    }
    函数 主程序(): 整数 {
        变量 p: 点 = 点 { 3, 4 };
        返回 p.x + p.y;
    }
    "#;
    let c = cn_driver::emit_c(source, &filename(), false, "x86_64-unknown-linux-gnu")
        .expect("struct access compiles");
    assert!(c.contains("struct cn_struct_点"));
    assert!(c.contains("->x"));
    assert!(c.contains("->y"));
}

#[test]
fn switch_scenario_has_no_fallthrough_between_cases() {
    let source = r#"
    函数 主程序(): 整数 {
        变量 n: 整数 = 2;
        选择 (n) {
            情况 1: {
                返回 10;
            }
            情况 2: {
                返回 20;
            }
            默认: {
                返回 0;
            }
        }
        返回 0;
    }
    "#;
    let result = cn_driver::check(source, &filename(), false);
    assert!(result.is_ok(), "{result:?}");
}

#[test]
fn freestanding_build_omits_hosted_io_and_main() {
    let source = r#"
    函数 启动(): 空类型 {
        返回;
    }
    "#;
    let c = cn_driver::emit_c(source, &filename(), true, "thumbv7em-none-eabi")
        .expect("freestanding module compiles");
    assert!(!c.contains("int main(void)"));
    assert!(c.contains("system_api.h"));
}

#[test]
fn freestanding_rejects_hosted_print_call() {
    let source = r#"
    函数 启动(): 空类型 {
        打印("不允许");
    }
    "#;
    let diagnostics = cn_driver::check(source, &filename(), true).expect_err("hosted I/O must be rejected");
    assert!(diagnostics.has_errors());
}

#[test]
fn check_on_valid_program_returns_empty_or_warning_only_diagnostics() {
    let source = "函数 主程序(): 整数 { 返回 0; }";
    let diagnostics = cn_driver::check(source, &filename(), false).expect("valid program passes");
    assert_eq!(diagnostics.error_count(), 0);
}
