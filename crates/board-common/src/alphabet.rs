//! The base-36 symbol set order keys are written in.
//!
//! Symbols are ASCII `0-9` followed by `a-z`, so the natural byte order of a
//! key string is also its alphabet order. That lets SQLite's default `BINARY`
//! collation sort keys correctly without a custom collation.

/// All symbols, in ascending order.
pub const SYMBOLS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of symbols in the alphabet.
pub const BASE: u8 = 36;

/// Smallest symbol. Reserved as the "never final" sentinel: generated keys
/// never end with it.
pub const MIN: char = '0';

/// Largest symbol.
pub const MAX: char = 'z';

/// Index of the middle symbol (`'i'`).
pub const MID_INDEX: u8 = 18;

/// The middle symbol, used as the seed key of an empty column.
pub const MID: char = 'i';

/// Position of `symbol` in the alphabet, or `None` for a foreign character.
pub fn index_of(symbol: char) -> Option<u8> {
    match symbol {
        '0'..='9' => Some(symbol as u8 - b'0'),
        'a'..='z' => Some(symbol as u8 - b'a' + 10),
        _ => None,
    }
}

/// Symbol at `index`. Indices outside the alphabet are a caller bug.
pub fn symbol_at(index: u8) -> char {
    debug_assert!(index < BASE, "alphabet index {} out of range", index);
    SYMBOLS[usize::from(index.min(BASE - 1))] as char
}

pub fn contains(symbol: char) -> bool {
    index_of(symbol).is_some()
}

/// True if every symbol in `key` is the minimum sentinel.
pub fn is_all_min(key: &str) -> bool {
    key.chars().all(|c| c == MIN)
}
