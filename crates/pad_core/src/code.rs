//! Short pad codes.
//!
//! Six characters from a 32-character alphabet that drops the glyphs easily
//! confused in handwriting or print (0/O, 1/I). Codes are generated from OS
//! randomness; they do not need to be unguessable, only collision-checked by
//! the store that issues them.

use rand::rngs::OsRng;
use rand::Rng;

/// Uppercase letters and digits, minus `0`, `O`, `1`, `I`.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Fixed code length.
pub const CODE_LEN: usize = 6;

/// Generate one candidate code. Makes no uniqueness guarantee.
pub fn generate_code(len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Normalize a caller-supplied code: trim surrounding whitespace, uppercase.
/// Codes are case-insensitive at the boundary but stored uppercase.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_fixed_length_and_alphabet() {
        for _ in 0..200 {
            let code = generate_code(CODE_LEN);
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)), "{code}");
        }
    }

    #[test]
    fn ambiguous_glyphs_never_appear() {
        for _ in 0..200 {
            let code = generate_code(CODE_LEN);
            assert!(!code.contains(['0', 'O', '1', 'I']), "{code}");
        }
    }

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_code("  abc234 \n"), "ABC234");
        assert_eq!(normalize_code("AbC234"), "ABC234");
        assert_eq!(normalize_code(""), "");
    }
}
