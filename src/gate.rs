//! Source-language detection.
//!
//! Text is eligible for translation when it contains at least one CJK
//! Unified Ideograph in the range U+4E00..=U+9FA5.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SOURCE_LANGUAGE: Regex = Regex::new(r"[\x{4E00}-\x{9FA5}]").unwrap();
}

/// Does `text` contain source-language content?
pub fn contains_source_language(text: &str) -> bool {
    SOURCE_LANGUAGE.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chinese_text() {
        assert!(contains_source_language("你好"));
        assert!(contains_source_language("一"));
        assert!(contains_source_language("龥"));
    }

    #[test]
    fn test_latin_text() {
        assert!(!contains_source_language("hello"));
        assert!(!contains_source_language(""));
        assert!(!contains_source_language("Hello, world! 123"));
    }

    #[test]
    fn test_mixed_text() {
        assert!(contains_source_language("hello 世界"));
        assert!(contains_source_language("abc中def"));
    }

    #[test]
    fn test_range_boundaries() {
        // Just outside the range on either side
        assert!(!contains_source_language("\u{4DFF}"));
        assert!(!contains_source_language("\u{9FA6}"));
        // Japanese kana and Korean hangul are not in the range
        assert!(!contains_source_language("こんにちは"));
        assert!(!contains_source_language("안녕하세요"));
    }

    proptest! {
        #[test]
        fn prop_ascii_never_matches(s in "[ -~]{0,64}") {
            prop_assert!(!contains_source_language(&s));
        }

        #[test]
        fn prop_any_ideograph_matches(
            prefix in "[a-z ]{0,16}",
            c in 0x4E00u32..=0x9FA5u32,
            suffix in "[a-z ]{0,16}",
        ) {
            let ideograph = char::from_u32(c).unwrap();
            let text = format!("{}{}{}", prefix, ideograph, suffix);
            prop_assert!(contains_source_language(&text));
        }
    }
}
