// Reading characters and whitespace-delimited words from an InputSource,
// and recognizing number literals.

use crate::internals::files::InputSource;
use crate::kernel::{Cell, MAX_WORD_LENGTH};

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0c)
}

/// Delivers one byte, or None at end of input. Thin wrapper kept distinct
/// from InputSource::get_char so callers reading the tokenizer match it
/// against the spec's own names.
pub fn get_char(src: &mut InputSource) -> Option<u8> {
    src.get_char()
}

/// Consumes characters up to and including the next newline, or to EOF.
pub fn comment(src: &mut InputSource) {
    loop {
        match src.get_char() {
            None => return,
            Some(b'\n') => return,
            Some(_) => continue,
        }
    }
}

/// Skips leading whitespace, then collects up to MAX_WORD_LENGTH - 1
/// non-whitespace bytes. Returns None only when EOF is reached before any
/// non-whitespace byte is seen.
pub fn get_word(src: &mut InputSource) -> Option<Vec<u8>> {
    let mut b = loop {
        match src.get_char() {
            None => return None,
            Some(c) if is_whitespace(c) => continue,
            Some(c) => break c,
        }
    };
    let mut word = Vec::with_capacity(MAX_WORD_LENGTH);
    loop {
        word.push(b);
        if word.len() >= MAX_WORD_LENGTH - 1 {
            break;
        }
        match src.get_char() {
            None => break,
            Some(c) if is_whitespace(c) => break,
            Some(c) => b = c,
        }
    }
    Some(word)
}

/// Recognizes decimal, `0x`-prefixed hexadecimal, and `0`-prefixed octal
/// literals, with an optional leading `-`.
pub fn is_number(s: &[u8]) -> bool {
    parse_number(s).is_some()
}

/// Parses the same grammar `is_number` recognizes, returning the cell
/// value with two's-complement wraparound for negative literals. Unsigned
/// from this point on, per the design note on `<` and printing semantics.
pub fn parse_number(s: &[u8]) -> Option<Cell> {
    let (negative, digits) = match s.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, s),
    };
    if digits.is_empty() {
        return None;
    }
    let (radix, digits) = if digits.len() > 2 && digits[0] == b'0' && (digits[1] | 0x20) == b'x' {
        (16, &digits[2..])
    } else if digits[0] == b'0' && digits.len() > 1 {
        (8, &digits[1..])
    } else if digits == b"0" {
        (10, digits)
    } else {
        (10, digits)
    };
    if digits.is_empty() {
        return None;
    }
    let text = std::str::from_utf8(digits).ok()?;
    let magnitude = Cell::from_str_radix(text, radix).ok()?;
    Some(if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(s: &str) -> InputSource {
        InputSource::from_string(s)
    }

    #[test]
    fn test_get_word_skips_leading_whitespace() {
        let mut s = src("   dup");
        assert_eq!(get_word(&mut s), Some(b"dup".to_vec()));
    }

    #[test]
    fn test_get_word_stops_at_whitespace() {
        let mut s = src("dup swap");
        assert_eq!(get_word(&mut s), Some(b"dup".to_vec()));
        assert_eq!(get_word(&mut s), Some(b"swap".to_vec()));
    }

    #[test]
    fn test_get_word_eof() {
        let mut s = src("   ");
        assert_eq!(get_word(&mut s), None);
    }

    #[test]
    fn test_get_word_truncates_long_words() {
        let long = "a".repeat(64);
        let mut s = src(&long);
        let word = get_word(&mut s).unwrap();
        assert_eq!(word.len(), MAX_WORD_LENGTH - 1);
    }

    #[test]
    fn test_comment_consumes_to_newline() {
        let mut s = src(" this is ignored\ndup");
        comment(&mut s);
        assert_eq!(get_word(&mut s), Some(b"dup".to_vec()));
    }

    #[test]
    fn test_is_number_decimal() {
        assert!(is_number(b"123"));
        assert!(is_number(b"-123"));
        assert!(!is_number(b"abc"));
        assert!(!is_number(b"-"));
        assert!(!is_number(b""));
    }

    #[test]
    fn test_is_number_hex_and_octal() {
        assert!(is_number(b"0xFF"));
        assert!(is_number(b"017"));
        assert!(!is_number(b"0x"));
    }

    #[test]
    fn test_parse_number_values() {
        assert_eq!(parse_number(b"255"), Some(255));
        assert_eq!(parse_number(b"0xFF"), Some(255));
        assert_eq!(parse_number(b"010"), Some(8));
        assert_eq!(parse_number(b"-1"), Some(Cell::MAX));
    }
}
