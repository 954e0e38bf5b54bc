use crate::models::ShortCode;

const SEED: u32 = 5381;
const MULTIPLIER: u32 = 33;
const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Derive the short code for a URL.
///
/// djb2-xor over the UTF-16 code units of `input`, walked from the last unit
/// to the first, folded to a `u32` and rendered in lowercase base-36. Pure and
/// deterministic; distinct inputs may share a code.
pub fn hash(input: &str) -> ShortCode {
    let units: Vec<u16> = input.encode_utf16().collect();
    let digest = units
        .iter()
        .rev()
        .fold(SEED, |h, &unit| h.wrapping_mul(MULTIPLIER) ^ u32::from(unit));

    ShortCode::new(to_base36(digest))
}

fn to_base36(mut n: u32) -> String {
    if n == 0 {
        return "0".to_owned();
    }

    let mut digits = Vec::with_capacity(7);
    while n > 0 {
        digits.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.iter().rev().map(|&d| d as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(hash("").as_str(), "45h");
        assert_eq!(hash("a").as_str(), "3t1g");
        assert_eq!(hash("http://openai.com").as_str(), "1xacdtg");
        assert_eq!(hash("https://www.rust-lang.org").as_str(), "5oi3u8");
        assert_eq!(hash("ftp://example.com").as_str(), "gwux8a");
    }

    #[test]
    fn test_non_ascii_hashes_utf16_units() {
        assert_eq!(hash("héllo→").as_str(), "5goms9");
    }

    #[test]
    fn test_deterministic_and_alphabet() {
        let inputs = [
            "",
            "x",
            "http://example.com/a/very/long/path?with=query&and=more#frag",
            "https://例え.jp/パス",
            "ftp://files.example.org",
        ];
        for input in inputs {
            let first = hash(input);
            assert_eq!(first, hash(input));
            assert!(!first.as_str().is_empty());
            assert!(first
                .as_str()
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
            assert!(first.as_str().len() <= 7);
        }
    }

    #[test]
    fn test_known_collision() {
        assert_eq!(
            hash("http://example.com/1958091"),
            hash("http://example.com/5004826")
        );
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u32::MAX), "1z141z3");
    }
}
