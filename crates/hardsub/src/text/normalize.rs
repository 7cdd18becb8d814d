/// Collapses every whitespace run to a single space and trims both ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fractions of a line's characters per character class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharRatios {
    /// Precomposed Hangul syllables (U+AC00..=U+D7A3).
    pub hangul: f64,
    /// ASCII letters and digits.
    pub alphanumeric: f64,
    /// Everything else that is not whitespace.
    pub special: f64,
}

pub fn is_hangul_syllable(ch: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&ch)
}

/// Computes class ratios over all characters of `line`, whitespace included in
/// the denominator. An empty line counts as entirely special.
pub fn char_ratios(line: &str) -> CharRatios {
    let mut total = 0usize;
    let mut hangul = 0usize;
    let mut alphanumeric = 0usize;
    let mut special = 0usize;

    for ch in line.chars() {
        total += 1;
        if is_hangul_syllable(ch) {
            hangul += 1;
        } else if ch.is_ascii_alphanumeric() {
            alphanumeric += 1;
        } else if !ch.is_whitespace() {
            special += 1;
        }
    }

    if total == 0 {
        return CharRatios {
            hangul: 0.0,
            alphanumeric: 0.0,
            special: 1.0,
        };
    }

    let total = total as f64;
    CharRatios {
        hangul: hangul as f64 / total,
        alphanumeric: alphanumeric as f64 / total,
        special: special as f64 / total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  a   b\n"), "a b");
        assert_eq!(normalize_text("\t자막\u{3000} 입니다 "), "자막 입니다");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "  a   b\n",
            "",
            "이건\t\t자막\n\n입니다",
            "already normal",
            " \u{00a0}mixed \u{2003} spaces ",
        ];
        for input in inputs {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_char_ratios_mixed_line() {
        // 2 hangul + space + 3 ascii + '!' = 7 characters
        let ratios = char_ratios("자막 abc!");
        assert!((ratios.hangul - 2.0 / 7.0).abs() < 1e-9);
        assert!((ratios.alphanumeric - 3.0 / 7.0).abs() < 1e-9);
        assert!((ratios.special - 1.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_char_ratios_empty_line() {
        let ratios = char_ratios("");
        assert_eq!(ratios.hangul, 0.0);
        assert_eq!(ratios.alphanumeric, 0.0);
        assert_eq!(ratios.special, 1.0);
    }

    #[test]
    fn test_hangul_jamo_is_not_syllable() {
        assert!(is_hangul_syllable('가'));
        assert!(is_hangul_syllable('힣'));
        assert!(!is_hangul_syllable('ㄱ'));
        assert!(!is_hangul_syllable('a'));
    }
}
