//! Decoding of form-style escaped path segments.

/// Decode `+` as a space and `%XX` as the byte `0xXX`.
///
/// A `%` not followed by two hex digits is kept as is. Decoded bytes that
/// are not valid UTF-8 are replaced with U+FFFD.
pub fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                match (hex_value(bytes.get(i + 1)), hex_value(bytes.get(i + 2))) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: Option<&u8>) -> Option<u8> {
    match byte? {
        b @ b'0'..=b'9' => Some(b - b'0'),
        b @ b'a'..=b'f' => Some(b - b'a' + 10),
        b @ b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_becomes_space() {
        assert_eq!(decode_component("Fish+and+Chips"), "Fish and Chips");
    }

    #[test]
    fn test_percent_escapes() {
        assert_eq!(decode_component("Taco%20Bell"), "Taco Bell");
        assert_eq!(decode_component("Cr%C3%AApe"), "Crêpe");
        assert_eq!(decode_component("1%2B1"), "1+1");
    }

    #[test]
    fn test_incomplete_escape_kept() {
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("50%z1"), "50%z1");
        assert_eq!(decode_component("%4"), "%4");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(decode_component("Taco"), "Taco");
    }
}
