//! API credential sets and their per-request rotation.
//!
//! The web-search upstream has a small daily quota per key, so several keys
//! are configured and each request walks them in an order derived from the
//! query. The same query always starts at the same key; different queries
//! spread across the set.

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Split a raw key list on commas and whitespace, dropping empties and
/// duplicates. First occurrence wins.
pub fn parse_api_keys(raw: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// 32-bit FNV-1a over the UTF-16 code units of `seed`.
pub fn hash32(seed: &str) -> u32 {
    seed.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// A key paired with its position in the configured list. Only the index
/// is ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotatedKey<'a> {
    pub key: &'a str,
    pub index: usize,
}

/// Every key exactly once, starting at `hash32(seed) % len`.
pub fn rotated_order<'a>(keys: &'a [String], seed: &str) -> Vec<RotatedKey<'a>> {
    match keys.len() {
        0 => Vec::new(),
        1 => vec![RotatedKey {
            key: &keys[0],
            index: 0,
        }],
        len => {
            let start = hash32(seed) as usize % len;
            (0..len)
                .map(|i| {
                    let index = (start + i) % len;
                    RotatedKey {
                        key: &keys[index],
                        index,
                    }
                })
                .collect()
        }
    }
}

/// Immutable, deduplicated credential list for one upstream.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeySet {
    keys: Vec<String>,
}

impl ApiKeySet {
    pub fn parse(raw: &str) -> Self {
        Self {
            keys: parse_api_keys(raw),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Rotation for one request. The seed is case-folded so that queries
    /// differing only in case share a starting key.
    pub fn rotation(&self, seed: &str) -> Vec<RotatedKey<'_>> {
        rotated_order(&self.keys, &seed.to_lowercase())
    }
}

impl std::fmt::Debug for ApiKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKeySet({} keys)", self.keys.len())
    }
}
