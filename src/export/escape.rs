//! String literal escaping for the two supported SQL dialects.
//!
//! The escaper produces the body of a single-quoted literal; the caller
//! writes the surrounding quotes. Both variants scan the input once and copy
//! runs of bytes that need no escaping in a single `extend_from_slice`.

use bytes::BytesMut;

/// Escape `src` into `dst` for the dialect selected by `escape_backslash`.
///
/// * `escape_backslash = true` - MySQL default: NUL, `\n`, `\r`, `\\`, `'`,
///   `"` and SUB (0x1A) become backslash sequences.
/// * `escape_backslash = false` - `NO_BACKSLASH_ESCAPES` / ANSI: only `'` is
///   escaped, by doubling it.
pub fn escape_into(src: &[u8], escape_backslash: bool, dst: &mut BytesMut) {
    // Worst case every byte doubles.
    if dst.capacity() - dst.len() < src.len() {
        dst.reserve(2 * src.len());
    }
    if escape_backslash {
        backslash_escape(src, dst);
    } else {
        quote_double_escape(src, dst);
    }
}

/// Escape `src` into a freshly allocated buffer.
pub fn escape(src: &[u8], escape_backslash: bool) -> Vec<u8> {
    let mut dst = BytesMut::with_capacity(src.len() + src.len() / 8);
    escape_into(src, escape_backslash, &mut dst);
    dst.to_vec()
}

#[inline]
fn backslash_sequence(b: u8) -> Option<u8> {
    match b {
        0 => Some(b'0'),
        b'\n' => Some(b'n'),
        b'\r' => Some(b'r'),
        b'\\' => Some(b'\\'),
        b'\'' => Some(b'\''),
        b'"' => Some(b'"'),
        0x1a => Some(b'Z'),
        _ => None,
    }
}

fn backslash_escape(src: &[u8], dst: &mut BytesMut) {
    let mut last = 0;
    for (i, &b) in src.iter().enumerate() {
        if let Some(esc) = backslash_sequence(b) {
            dst.extend_from_slice(&src[last..i]);
            dst.extend_from_slice(&[b'\\', esc]);
            last = i + 1;
        }
    }
    dst.extend_from_slice(&src[last..]);
}

fn quote_double_escape(src: &[u8], dst: &mut BytesMut) {
    let mut last = 0;
    for (i, &b) in src.iter().enumerate() {
        if b == b'\'' {
            // copy through the quote itself, then emit it a second time
            dst.extend_from_slice(&src[last..=i]);
            dst.extend_from_slice(b"'");
            last = i + 1;
        }
    }
    dst.extend_from_slice(&src[last..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// MySQL's reading of a backslash-escaped literal body.
    fn unescape_backslash(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(body.len());
        let mut iter = body.iter();
        while let Some(&b) = iter.next() {
            if b != b'\\' {
                assert_ne!(b, b'\'', "unescaped quote in body");
                out.push(b);
                continue;
            }
            let next = *iter.next().expect("dangling backslash");
            out.push(match next {
                b'0' => 0,
                b'n' => b'\n',
                b'r' => b'\r',
                b'Z' => 0x1a,
                other => other,
            });
        }
        out
    }

    /// ANSI reading: `''` is one quote, everything else literal.
    fn unescape_quotes(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(body.len());
        let mut i = 0;
        while i < body.len() {
            if body[i] == b'\'' {
                assert_eq!(body.get(i + 1), Some(&b'\''), "lone quote in body");
                i += 1;
            }
            out.push(body[i]);
            i += 1;
        }
        out
    }

    fn samples() -> Vec<Vec<u8>> {
        let mut samples: Vec<Vec<u8>> = vec![
            b"".to_vec(),
            b"plain".to_vec(),
            b"it's\\path".to_vec(),
            b"''''".to_vec(),
            b"\\\\\\".to_vec(),
            b"line1\nline2\r\n".to_vec(),
            b"\0\x1a\"".to_vec(),
            "unicode \u{e9}'\u{4e2d}".as_bytes().to_vec(),
        ];
        samples.push((0u8..=255).collect());
        samples.push((0u8..=255).rev().cycle().take(1000).collect());
        samples
    }

    #[test]
    fn test_backslash_dialect() {
        assert_eq!(escape(b"it's\\path", true), b"it\\'s\\\\path");
        assert_eq!(escape(b"a\0b\nc\rd\x1ae\"f", true), b"a\\0b\\nc\\rd\\Ze\\\"f");
    }

    #[test]
    fn test_quote_doubling_dialect() {
        assert_eq!(escape(b"it's\\path", false), b"it''s\\path");
        assert_eq!(escape(b"'", false), b"''");
        assert_eq!(escape(b"a\nb\"", false), b"a\nb\"");
    }

    #[test]
    fn test_no_escape_needed_is_verbatim() {
        assert_eq!(escape(b"hello world", true), b"hello world");
        assert_eq!(escape(b"hello world", false), b"hello world");
    }

    #[test]
    fn test_backslash_round_trip() {
        for s in samples() {
            assert_eq!(unescape_backslash(&escape(&s, true)), s);
        }
    }

    #[test]
    fn test_quote_round_trip() {
        for s in samples() {
            assert_eq!(unescape_quotes(&escape(&s, false)), s);
        }
    }

    proptest! {
        #[test]
        fn test_backslash_round_trip_any_bytes(s in prop::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(unescape_backslash(&escape(&s, true)), s);
        }

        #[test]
        fn test_quote_round_trip_any_bytes(s in prop::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(unescape_quotes(&escape(&s, false)), s);
        }
    }

    #[test]
    fn test_escape_into_appends() {
        let mut dst = BytesMut::from(&b"prefix:"[..]);
        escape_into(b"o'k", true, &mut dst);
        assert_eq!(&dst[..], b"prefix:o\\'k");
    }
}
