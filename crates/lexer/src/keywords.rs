//! The closed keyword set, per spec §6.
//!
//! A lookup compares the raw UTF-8 bytes of a scanned identifier against
//! every entry; on miss the token is an ordinary identifier. Nothing here
//! decodes Chinese characters individually — keywords are just known byte
//! sequences, the same way the core's identifier scanner treats any byte
//! `>= 0x80` as an identifier-continuing byte without inspecting codepoints.

use crate::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCategory {
    ControlFlow,
    Type,
    Declaration,
    Constant,
    /// Lexes to a token but has no grammar production — the parser rejects
    /// it with `PARSE_EXPECTED_TOKEN` wherever it appears (§6).
    Reserved,
}

pub struct KeywordEntry {
    pub bytes: &'static str,
    pub kind: TokenKind,
    pub category: KeywordCategory,
}

/// Flat keyword table. `中断` is assigned to `break`: it is adjacent to
/// `继续` (continue) in the closed set and the spec's only other use of
/// "interrupt" is the ISR *function* tag, which the grammar derives from
/// the reserved vector-annotation syntax rather than a standalone keyword
/// (§4.4) — so no table entry is needed for that sense.
pub static KEYWORDS: &[KeywordEntry] = &[
    KeywordEntry { bytes: "如果", kind: TokenKind::If, category: KeywordCategory::ControlFlow },
    KeywordEntry { bytes: "否则", kind: TokenKind::Else, category: KeywordCategory::ControlFlow },
    KeywordEntry { bytes: "当", kind: TokenKind::While, category: KeywordCategory::ControlFlow },
    KeywordEntry { bytes: "循环", kind: TokenKind::For, category: KeywordCategory::ControlFlow },
    KeywordEntry { bytes: "返回", kind: TokenKind::Return, category: KeywordCategory::ControlFlow },
    KeywordEntry { bytes: "中断", kind: TokenKind::Break, category: KeywordCategory::ControlFlow },
    KeywordEntry { bytes: "继续", kind: TokenKind::Continue, category: KeywordCategory::ControlFlow },
    KeywordEntry { bytes: "选择", kind: TokenKind::Switch, category: KeywordCategory::ControlFlow },
    KeywordEntry { bytes: "情况", kind: TokenKind::Case, category: KeywordCategory::ControlFlow },
    KeywordEntry { bytes: "默认", kind: TokenKind::Default, category: KeywordCategory::ControlFlow },
    KeywordEntry { bytes: "整数", kind: TokenKind::KwInt, category: KeywordCategory::Type },
    KeywordEntry { bytes: "小数", kind: TokenKind::KwFloat, category: KeywordCategory::Type },
    KeywordEntry { bytes: "字符串", kind: TokenKind::KwString, category: KeywordCategory::Type },
    KeywordEntry { bytes: "布尔", kind: TokenKind::KwBool, category: KeywordCategory::Type },
    KeywordEntry { bytes: "空类型", kind: TokenKind::KwVoid, category: KeywordCategory::Type },
    KeywordEntry { bytes: "结构体", kind: TokenKind::KwStruct, category: KeywordCategory::Declaration },
    KeywordEntry { bytes: "枚举", kind: TokenKind::KwEnum, category: KeywordCategory::Declaration },
    KeywordEntry { bytes: "函数", kind: TokenKind::KwFunction, category: KeywordCategory::Declaration },
    KeywordEntry { bytes: "变量", kind: TokenKind::KwVar, category: KeywordCategory::Declaration },
    KeywordEntry { bytes: "模块", kind: TokenKind::KwModule, category: KeywordCategory::Declaration },
    KeywordEntry { bytes: "导入", kind: TokenKind::KwImport, category: KeywordCategory::Declaration },
    KeywordEntry { bytes: "公开", kind: TokenKind::KwPublic, category: KeywordCategory::Declaration },
    KeywordEntry { bytes: "私有", kind: TokenKind::KwPrivate, category: KeywordCategory::Declaration },
    KeywordEntry { bytes: "常量", kind: TokenKind::KwConst, category: KeywordCategory::Declaration },
    KeywordEntry { bytes: "静态", kind: TokenKind::KwStatic, category: KeywordCategory::Declaration },
    KeywordEntry { bytes: "真", kind: TokenKind::True, category: KeywordCategory::Constant },
    KeywordEntry { bytes: "假", kind: TokenKind::False, category: KeywordCategory::Constant },
    KeywordEntry { bytes: "无", kind: TokenKind::KwNone, category: KeywordCategory::Constant },
    KeywordEntry { bytes: "命名空间", kind: TokenKind::Namespace, category: KeywordCategory::Reserved },
    KeywordEntry { bytes: "接口", kind: TokenKind::Interface, category: KeywordCategory::Reserved },
    KeywordEntry { bytes: "类", kind: TokenKind::Class, category: KeywordCategory::Reserved },
    KeywordEntry { bytes: "模板", kind: TokenKind::Template, category: KeywordCategory::Reserved },
    KeywordEntry { bytes: "保护", kind: TokenKind::Protected, category: KeywordCategory::Reserved },
    KeywordEntry { bytes: "虚拟", kind: TokenKind::Virtual, category: KeywordCategory::Reserved },
    KeywordEntry { bytes: "重写", kind: TokenKind::Override, category: KeywordCategory::Reserved },
    KeywordEntry { bytes: "抽象", kind: TokenKind::Abstract, category: KeywordCategory::Reserved },
];

/// Look up `text` against every keyword entry's raw bytes, longest table a
/// flat scan is fine at this size (36 entries).
pub fn lookup(text: &str) -> Option<(TokenKind, KeywordCategory)> {
    KEYWORDS
        .iter()
        .find(|entry| entry.bytes == text)
        .map(|entry| (entry.kind.clone(), entry.category))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyword_round_trips_to_its_kind() {
        for entry in KEYWORDS {
            let (kind, _) = lookup(entry.bytes).expect("keyword must be found");
            assert_eq!(kind, entry.kind);
        }
    }

    #[test]
    fn non_keyword_identifier_misses() {
        assert!(lookup("你好").is_none());
        assert!(lookup("main").is_none());
    }
}
