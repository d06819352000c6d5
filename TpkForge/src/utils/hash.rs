//! Hashing utilities

/// TPK string hash.
///
/// A DJB2-style multiply-by-33 hash seeded with `0xFFFFFFFF`. Used for texture
/// identity, the hash list / offset table sort order, and the pipeline path
/// hash that links the data section back to the head section.
#[must_use]
pub fn tpk_hash(s: &str) -> u32 {
    let mut hash: u32 = 0xFFFF_FFFF;
    for byte in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(u32::from(byte));
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_seed() {
        assert_eq!(tpk_hash(""), 0xFFFF_FFFF);
    }

    #[test]
    fn test_known_values() {
        // 0xFFFFFFFF * 33 + 'a' wraps to 0xFFFFFFDF + 0x61
        assert_eq!(tpk_hash("a"), 0x0000_0040);
        assert_eq!(tpk_hash("ab"), 0x0000_08A2);
    }

    #[test]
    fn test_order_sensitive() {
        for s in ["ab", "foo", "CAR_SKIN", "pipeline/path"] {
            let reversed: String = s.chars().rev().collect();
            assert_ne!(tpk_hash(s), tpk_hash(&reversed), "{s}");
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(tpk_hash("TEXTURES"), tpk_hash("TEXTURES"));
    }
}
