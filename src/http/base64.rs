//! Standard base64 ([RFC 4648, Section 4](https://tools.ietf.org/html/rfc4648#section-4))
//! for `Authorization: Basic` credentials.

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

pub(crate) fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);

    for chunk in data.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let word = (b0 << 16) | (b1 << 8) | b2;

        out.push(ALPHABET[(word >> 18) as usize & 0x3f] as char);
        out.push(ALPHABET[(word >> 12) as usize & 0x3f] as char);
        out.push(match chunk.len() {
            1 => '=',
            _ => ALPHABET[(word >> 6) as usize & 0x3f] as char,
        });
        out.push(match chunk.len() {
            3 => ALPHABET[word as usize & 0x3f] as char,
            _ => '=',
        });
    }

    out
}

/// Decodes padded base64. Returns `None` on a bad length, a byte outside
/// the alphabet or misplaced padding.
pub(crate) fn decode(input: &[u8]) -> Option<Vec<u8>> {
    if input.len() % 4 != 0 {
        return None;
    }

    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let last = input.len() / 4;

    for (i, quad) in input.chunks_exact(4).enumerate() {
        let padding = match quad {
            [_, _, b'=', b'='] => 2,
            [_, _, _, b'='] => 1,
            _ => 0,
        };
        if padding > 0 && i + 1 != last {
            return None;
        }

        let mut word = 0u32;
        for &byte in &quad[..4 - padding] {
            word = (word << 6) | sextet(byte)? as u32;
        }
        word <<= 6 * padding as u32;

        out.push((word >> 16) as u8);
        if padding < 2 {
            out.push((word >> 8) as u8);
        }
        if padding < 1 {
            out.push(word as u8);
        }
    }

    Some(out)
}

#[inline(always)]
const fn sextet(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        #[rustfmt::skip]
        let cases = [
            ("",       ""),
            ("f",      "Zg=="),
            ("fo",     "Zm8="),
            ("foo",    "Zm9v"),
            ("foob",   "Zm9vYg=="),
            ("fooba",  "Zm9vYmE="),
            ("foobar", "Zm9vYmFy"),
            ("Aladdin:open sesame", "QWxhZGRpbjpvcGVuIHNlc2FtZQ=="),
        ];

        for (plain, encoded) in cases {
            assert_eq!(encode(plain.as_bytes()), encoded);
            assert_eq!(decode(encoded.as_bytes()).as_deref(), Some(plain.as_bytes()));
        }
    }

    #[test]
    fn rejects() {
        for input in ["Zg=", "Zg=a", "Zg==Zg==", "Z===", "Zm9*", "Zm9vY"] {
            assert_eq!(decode(input.as_bytes()), None, "{input}");
        }
    }
}
