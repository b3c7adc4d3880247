//! Order-key generation.
//!
//! Keys live in a dense base-36 space: between any two distinct keys there is
//! always room for another, limited only by the configured maximum length.
//! New trailing symbols are picked near the middle of the alphabet with a
//! small random offset so repeated insertion at the same spot does not walk a
//! predictable path or grow keys faster than necessary.
//!
//! ```
//! use board_common::{KeyGenerator, NoJitter, OrderKey};
//!
//! let mut keys = KeyGenerator::with_jitter(NoJitter);
//! let a: OrderKey = "a".parse().unwrap();
//! let c: OrderKey = "c".parse().unwrap();
//! assert_eq!(keys.generate(Some(&a), Some(&c)).unwrap().as_str(), "b");
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::alphabet::{self, BASE, MID_INDEX};
use crate::error::KeyGenError;
use crate::order_key::{MAX_KEY_LENGTH, OrderKey};

/// Default jitter window: the trailing symbol lands within ±2 of the middle.
pub const DEFAULT_JITTER_WINDOW: u8 = 2;

/// Largest usable window. Keeps the jittered symbol inside `1..=35`.
pub const MAX_JITTER_WINDOW: u8 = MID_INDEX - 1;

// ── Jitter capability ─────────────────────────────────────────────────

/// Supplies the random offset applied to newly appended trailing symbols.
pub trait JitterSource {
    /// An offset in `[-window, window]`.
    fn offset(&mut self, window: u8) -> i8;
}

impl<J: JitterSource + ?Sized> JitterSource for &mut J {
    fn offset(&mut self, window: u8) -> i8 {
        (**self).offset(window)
    }
}

/// Always zero. Pins generation for deterministic tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn offset(&mut self, _window: u8) -> i8 {
        0
    }
}

/// Draws from the calling thread's RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn offset(&mut self, window: u8) -> i8 {
        if window == 0 {
            return 0;
        }
        let w = window.min(MAX_JITTER_WINDOW) as i8;
        rand::thread_rng().gen_range(-w..=w)
    }
}

/// Reproducible jitter from a fixed seed.
#[derive(Debug, Clone)]
pub struct SeededJitter {
    rng: StdRng,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl JitterSource for SeededJitter {
    fn offset(&mut self, window: u8) -> i8 {
        if window == 0 {
            return 0;
        }
        let w = window.min(MAX_JITTER_WINDOW) as i8;
        self.rng.gen_range(-w..=w)
    }
}

// ── Generator ─────────────────────────────────────────────────────────

/// Produces keys that sort strictly between two optional bounds.
///
/// The generator owns its jitter source and nothing else; give each caller
/// its own instance.
#[derive(Debug, Clone)]
pub struct KeyGenerator<J = RandomJitter> {
    max_len: usize,
    jitter_window: u8,
    jitter: J,
}

impl KeyGenerator<RandomJitter> {
    pub fn new() -> Self {
        Self::with_jitter(RandomJitter)
    }
}

impl Default for KeyGenerator<RandomJitter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J: JitterSource> KeyGenerator<J> {
    pub fn with_jitter(jitter: J) -> Self {
        Self {
            max_len: MAX_KEY_LENGTH,
            jitter_window: DEFAULT_JITTER_WINDOW,
            jitter,
        }
    }

    /// Cap generated keys at `max_len` symbols (clamped to `1..=256`).
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len.clamp(1, MAX_KEY_LENGTH);
        self
    }

    pub fn with_jitter_window(mut self, window: u8) -> Self {
        self.jitter_window = window.min(MAX_JITTER_WINDOW);
        self
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Generate a key ordered strictly between `left` and `right`. A missing
    /// bound is open; with both missing the seed key `"i"` is returned.
    pub fn generate(
        &mut self,
        left: Option<&OrderKey>,
        right: Option<&OrderKey>,
    ) -> Result<OrderKey, KeyGenError> {
        match (left, right) {
            (None, None) => Ok(seed_key()),
            (Some(l), None) => self.generate_after(l),
            (None, Some(r)) => self.generate_before(r),
            (Some(l), Some(r)) => self.generate_between(l, r),
        }
    }

    /// A key greater than `key`: `key` plus one jittered middle symbol.
    pub fn generate_after(&mut self, key: &OrderKey) -> Result<OrderKey, KeyGenError> {
        if key.len() >= self.max_len {
            return Err(self.exhausted());
        }
        let mut out = String::with_capacity(key.len() + 1);
        out.push_str(key.as_str());
        out.push(self.jittered_middle());
        Ok(OrderKey::from_generated(out))
    }

    /// A key less than `key`.
    ///
    /// Leading minimum symbols are kept; the first larger symbol is halved.
    /// When halving lands on the minimum (`'1'` → `'0'`), a jittered middle
    /// symbol is appended so the result does not end in the sentinel.
    pub fn generate_before(&mut self, key: &OrderKey) -> Result<OrderKey, KeyGenError> {
        let mut out = String::new();
        for (pos, &b) in key.as_str().as_bytes().iter().enumerate() {
            let idx = symbol_index(b);
            if idx == 0 {
                out.push(alphabet::MIN);
                continue;
            }

            let half = idx / 2;
            if half == 0 {
                if pos + 2 > self.max_len {
                    return Err(self.exhausted());
                }
                out.push(alphabet::MIN);
                out.push(self.jittered_middle());
            } else {
                if pos + 1 > self.max_len {
                    return Err(self.exhausted());
                }
                out.push(alphabet::symbol_at(half));
            }
            return Ok(OrderKey::from_generated(out));
        }

        // Nothing sorts before a run of minimum symbols without ending in one.
        Err(self.exhausted())
    }

    /// A key strictly between `left` and `right`.
    pub fn generate_between(
        &mut self,
        left: &OrderKey,
        right: &OrderKey,
    ) -> Result<OrderKey, KeyGenError> {
        if left >= right {
            return Err(KeyGenError::InvalidBounds {
                left: left.to_string(),
                right: right.to_string(),
            });
        }

        let l = left.as_str().as_bytes();
        let r = right.as_str().as_bytes();
        let mut out = String::new();
        // Set once the result has already dropped below `right` at an earlier
        // position; from then on only `left` constrains the tail.
        let mut right_open = false;
        let mut pos = 0;

        loop {
            if pos >= self.max_len {
                return Err(self.exhausted());
            }

            if right_open && pos >= l.len() {
                out.push(self.jittered_middle());
                break;
            }

            // Everything so far equals `right`; any extension would sort after
            // it. Only happens when `right` is `left` padded with '0's.
            if !right_open && pos >= r.len() {
                return Err(self.exhausted());
            }

            let lo = l.get(pos).map_or(0, |&b| symbol_index(b));
            // Exclusive ceiling; once released it sits one past 'z'.
            let hi = if right_open {
                BASE
            } else {
                symbol_index(r[pos])
            };

            if lo == hi {
                out.push(alphabet::symbol_at(lo));
            } else if hi - lo > 1 {
                out.push(alphabet::symbol_at(lo + (hi - lo) / 2));
                break;
            } else {
                // Adjacent symbols: no room here, borrow length from the left.
                out.push(alphabet::symbol_at(lo));
                right_open = true;
            }
            pos += 1;
        }

        Ok(OrderKey::from_generated(out))
    }

    /// `n` strictly increasing keys spread evenly over the key space, all of
    /// the same width. Used to rebalance a column whose keys have grown long.
    pub fn spread(&self, n: usize) -> Result<Vec<OrderKey>, KeyGenError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let slots = (n as u128 + 1).saturating_mul(2);
        let mut width = 1usize;
        let mut space: u128 = u128::from(BASE);
        while space < slots {
            width += 1;
            space = space
                .checked_mul(u128::from(BASE))
                .ok_or_else(|| self.exhausted())?;
        }
        if width > self.max_len {
            return Err(self.exhausted());
        }

        // step >= 2, so nudging a value off a trailing '0' never reaches the
        // next slot.
        let step = space / (n as u128 + 1);
        let keys = (1..=n as u128)
            .map(|k| {
                let mut value = step * k;
                if value % u128::from(BASE) == 0 {
                    value += 1;
                }
                OrderKey::from_generated(encode_fixed(value, width))
            })
            .collect();
        Ok(keys)
    }

    fn jittered_middle(&mut self) -> char {
        let window = self.jitter_window;
        let offset = self
            .jitter
            .offset(window)
            .clamp(-(window as i8), window as i8);
        let idx = (i16::from(MID_INDEX) + i16::from(offset)).clamp(1, i16::from(BASE - 1));
        alphabet::symbol_at(idx as u8)
    }

    fn exhausted(&self) -> KeyGenError {
        KeyGenError::KeyExhausted {
            max_len: self.max_len,
        }
    }
}

/// The key given to the first item of an empty column.
pub fn seed_key() -> OrderKey {
    OrderKey::from_generated(alphabet::MID.to_string())
}

/// String-level entry point with random jitter and the default length cap.
pub fn generate_order_key(
    left: Option<&str>,
    right: Option<&str>,
) -> Result<String, KeyGenError> {
    let left = left.map(OrderKey::new).transpose()?;
    let right = right.map(OrderKey::new).transpose()?;
    KeyGenerator::new()
        .generate(left.as_ref(), right.as_ref())
        .map(OrderKey::into_string)
}

fn symbol_index(b: u8) -> u8 {
    alphabet::index_of(b as char).unwrap_or(0)
}

fn encode_fixed(mut value: u128, width: usize) -> String {
    let mut digits = vec![alphabet::MIN; width];
    for slot in digits.iter_mut().rev() {
        *slot = alphabet::symbol_at((value % u128::from(BASE)) as u8);
        value /= u128::from(BASE);
    }
    digits.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(s: &str) -> OrderKey {
        OrderKey::new(s).unwrap()
    }

    fn pinned() -> KeyGenerator<NoJitter> {
        KeyGenerator::with_jitter(NoJitter)
    }

    /// Always pushes to the edge of the window.
    struct MaxJitter(i8);

    impl JitterSource for MaxJitter {
        fn offset(&mut self, _window: u8) -> i8 {
            self.0
        }
    }

    #[test]
    fn test_seed_is_middle_symbol() {
        let seed = pinned().generate(None, None).unwrap();
        assert_eq!(seed.as_str(), "i");
        assert_ne!(seed.as_str(), "0");
        assert_ne!(seed.as_str(), "z");
    }

    #[test]
    fn test_seed_has_room_on_both_sides() {
        let mut g = KeyGenerator::new();
        let seed = g.generate(None, None).unwrap();
        let before = g.generate(None, Some(&seed)).unwrap();
        let after = g.generate(Some(&seed), None).unwrap();
        assert!(before < seed);
        assert!(seed < after);
    }

    #[test]
    fn test_after_appends_middle_symbol() {
        let k = pinned().generate(Some(&key("a")), None).unwrap();
        assert_eq!(k.as_str(), "ai");
        assert!(k > key("a"));
    }

    #[test]
    fn test_after_jitter_stays_in_window() {
        let mut g = KeyGenerator::with_jitter(MaxJitter(2));
        assert_eq!(g.generate(Some(&key("a")), None).unwrap().as_str(), "ak");
        let mut g = KeyGenerator::with_jitter(MaxJitter(-2));
        assert_eq!(g.generate(Some(&key("a")), None).unwrap().as_str(), "ag");
        // Out-of-window offsets are clamped.
        let mut g = KeyGenerator::with_jitter(MaxJitter(100));
        assert_eq!(g.generate(Some(&key("a")), None).unwrap().as_str(), "ak");
    }

    #[test]
    fn test_before_halves_first_symbol() {
        let k = pinned().generate(None, Some(&key("a"))).unwrap();
        assert_eq!(k.as_str(), "5");
        assert!(k < key("a"));
    }

    #[test]
    fn test_before_keeps_minimum_prefix() {
        let k = pinned().generate(None, Some(&key("00a"))).unwrap();
        assert_eq!(k.as_str(), "005");
    }

    #[test]
    fn test_before_one_extends_past_minimum() {
        let k = pinned().generate(None, Some(&key("1"))).unwrap();
        assert_eq!(k.as_str(), "0i");
        assert!(k < key("1"));
        let k = pinned().generate(None, Some(&key("01"))).unwrap();
        assert_eq!(k.as_str(), "00i");
    }

    #[test]
    fn test_before_all_minimum_is_exhausted() {
        let err = pinned().generate(None, Some(&key("000"))).unwrap_err();
        assert!(err.is_exhausted());
    }

    #[test]
    fn test_between_wide_gap_takes_midpoint_without_jitter() {
        let mut g = KeyGenerator::with_jitter(MaxJitter(2));
        let k = g.generate(Some(&key("a")), Some(&key("c"))).unwrap();
        assert_eq!(k.as_str(), "b");
    }

    #[test]
    fn test_between_adjacent_borrows_from_left() {
        let k = pinned().generate(Some(&key("a")), Some(&key("b"))).unwrap();
        assert_eq!(k.as_str(), "ai");
        assert!(key("a") < k && k < key("b"));
    }

    #[test]
    fn test_between_adjacent_with_left_tail() {
        // 'a' vs 'b' adjacent, then left tail 'i' against the open ceiling.
        let k = pinned().generate(Some(&key("ai")), Some(&key("b"))).unwrap();
        assert_eq!(k.as_str(), "ar");
    }

    #[test]
    fn test_between_left_is_prefix_of_right() {
        let k = pinned().generate(Some(&key("a")), Some(&key("a5"))).unwrap();
        assert_eq!(k.as_str(), "a2");
        let k = pinned().generate(Some(&key("a")), Some(&key("a01"))).unwrap();
        assert_eq!(k.as_str(), "a00i");
        assert!(key("a") < k && k < key("a01"));
    }

    #[test]
    fn test_between_left_tail_of_max_symbols() {
        let k = pinned().generate(Some(&key("azz")), Some(&key("b"))).unwrap();
        assert!(key("azz") < k && k < key("b"));
        assert_eq!(k.as_str(), "azzi");
    }

    #[test]
    fn test_between_rejects_unordered_bounds() {
        let err = pinned()
            .generate(Some(&key("c")), Some(&key("a")))
            .unwrap_err();
        assert!(matches!(err, KeyGenError::InvalidBounds { .. }));
        let err = pinned()
            .generate(Some(&key("b")), Some(&key("b")))
            .unwrap_err();
        assert!(matches!(err, KeyGenError::InvalidBounds { .. }));
    }

    #[test]
    fn test_after_at_max_length_is_exhausted() {
        let mut g = pinned().with_max_len(3);
        let err = g.generate(Some(&key("abc")), None).unwrap_err();
        assert_eq!(err, KeyGenError::KeyExhausted { max_len: 3 });
    }

    #[test]
    fn test_adjacent_keys_at_max_length_are_exhausted() {
        let mut g = pinned().with_max_len(2);
        assert!(g.generate(Some(&key("ab")), Some(&key("ac"))).unwrap_err().is_exhausted());
        let mut g = pinned().with_max_len(3);
        assert!(g.generate(Some(&key("zz")), Some(&key("zz1"))).unwrap_err().is_exhausted());
        // One more symbol of room is enough.
        let mut g = pinned().with_max_len(4);
        let k = g.generate(Some(&key("zz")), Some(&key("zz1"))).unwrap();
        assert_eq!(k.as_str(), "zz0i");
    }

    #[test]
    fn test_between_fills_last_slot_before_length_limit() {
        let mut g = pinned().with_max_len(2);
        let k = g.generate(Some(&key("ay")), Some(&key("b"))).unwrap();
        assert_eq!(k.as_str(), "az");

        // At the default cap, with only the final symbol free to move.
        let left = key(&format!("a{}y", "z".repeat(MAX_KEY_LENGTH - 2)));
        let k = pinned().generate(Some(&left), Some(&key("b"))).unwrap();
        assert_eq!(k.as_str(), format!("a{}", "z".repeat(MAX_KEY_LENGTH - 1)));
        assert_eq!(k.len(), MAX_KEY_LENGTH);
        assert!(left < k && k < key("b"));

        // A long left tail of 'y's is passed at the first one.
        let left = key(&format!("a{}", "y".repeat(MAX_KEY_LENGTH - 1)));
        let k = pinned().generate(Some(&left), Some(&key("b"))).unwrap();
        assert_eq!(k.as_str(), "az");
    }

    #[test]
    fn test_between_max_symbol_tail_still_exhausts_at_limit() {
        let mut g = pinned().with_max_len(2);
        assert!(g.generate(Some(&key("az")), Some(&key("b"))).unwrap_err().is_exhausted());
        let mut g = pinned().with_max_len(3);
        assert_eq!(g.generate(Some(&key("az")), Some(&key("b"))).unwrap().as_str(), "azi");
    }

    #[test]
    fn test_between_key_and_its_zero_extension_is_exhausted() {
        let err = pinned()
            .generate(Some(&key("a")), Some(&key("a00")))
            .unwrap_err();
        assert!(err.is_exhausted());
    }

    #[test]
    fn test_before_respects_max_length() {
        let mut g = pinned().with_max_len(2);
        assert!(g.generate(None, Some(&key("01"))).unwrap_err().is_exhausted());
    }

    #[test]
    fn test_repeated_insert_before_same_key_stays_ordered() {
        let mut g = KeyGenerator::with_jitter(SeededJitter::new(7));
        let right = key("b");
        let mut left = key("a");
        for _ in 0..200 {
            let k = g.generate(Some(&left), Some(&right)).unwrap();
            assert!(left < k && k < right);
            left = k;
        }
    }

    #[test]
    fn test_repeated_insert_after_same_key_stays_ordered() {
        let mut g = KeyGenerator::with_jitter(SeededJitter::new(11));
        let left = key("a");
        let mut right = key("b");
        for _ in 0..200 {
            let k = g.generate(Some(&left), Some(&right)).unwrap();
            assert!(left < k && k < right);
            right = k;
        }
    }

    #[test]
    fn test_spread_is_increasing_and_never_ends_in_minimum() {
        let keys = pinned().spread(100).unwrap();
        assert_eq!(keys.len(), 100);
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for k in &keys {
            assert!(!k.as_str().ends_with('0'));
            assert_eq!(k.len(), keys[0].len());
        }
    }

    #[test]
    fn test_spread_leaves_room_around_keys() {
        let mut g = pinned();
        let keys = g.spread(3).unwrap();
        let first = keys[0].clone();
        let before = g.generate(None, Some(&first)).unwrap();
        assert!(before < first);
        let between = g.generate(Some(&keys[0]), Some(&keys[1])).unwrap();
        assert!(keys[0] < between && between < keys[1]);
    }

    #[test]
    fn test_spread_respects_max_length() {
        assert!(pinned().with_max_len(1).spread(100).unwrap_err().is_exhausted());
        assert!(pinned().spread(0).unwrap().is_empty());
    }

    #[test]
    fn test_generate_order_key_validates_input() {
        assert_eq!(generate_order_key(None, None).unwrap(), "i");
        assert_eq!(generate_order_key(Some("a"), Some("c")).unwrap(), "b");
        assert!(matches!(
            generate_order_key(Some("A"), None),
            Err(KeyGenError::InvalidKey { .. })
        ));
    }

    fn key_strategy() -> impl Strategy<Value = OrderKey> {
        "[0-9a-z]{1,12}".prop_map(|s| OrderKey::new(s).unwrap())
    }

    proptest! {
        #[test]
        fn prop_between_is_strictly_inside(a in key_strategy(), b in key_strategy(), seed in any::<u64>()) {
            prop_assume!(a != b);
            let (left, right) = if a < b { (a, b) } else { (b, a) };
            let mut g = KeyGenerator::with_jitter(SeededJitter::new(seed));
            match g.generate(Some(&left), Some(&right)) {
                Ok(k) => {
                    prop_assert!(left < k && k < right);
                    prop_assert!(k.len() <= g.max_len());
                    prop_assert!(!k.as_str().ends_with('0'));
                }
                // Only possible when no non-'0'-terminated key fits, e.g. "a" and "a0".
                Err(e) => prop_assert!(e.is_exhausted()),
            }
        }

        #[test]
        fn prop_after_is_greater(a in key_strategy(), seed in any::<u64>()) {
            let mut g = KeyGenerator::with_jitter(SeededJitter::new(seed));
            let k = g.generate(Some(&a), None).unwrap();
            prop_assert!(k > a);
        }

        #[test]
        fn prop_before_is_smaller(a in key_strategy(), seed in any::<u64>()) {
            prop_assume!(!alphabet::is_all_min(a.as_str()));
            let mut g = KeyGenerator::with_jitter(SeededJitter::new(seed));
            let k = g.generate(None, Some(&a)).unwrap();
            prop_assert!(k < a);
            prop_assert!(!k.as_str().ends_with('0'));
        }

        #[test]
        fn prop_short_max_len_never_exceeded(a in "[0-9a-z]{1,6}", b in "[0-9a-z]{1,6}") {
            let a = OrderKey::new(a).unwrap();
            let b = OrderKey::new(b).unwrap();
            prop_assume!(a != b);
            let (left, right) = if a < b { (a, b) } else { (b, a) };
            let mut g = KeyGenerator::with_jitter(NoJitter).with_max_len(6);
            match g.generate(Some(&left), Some(&right)) {
                Ok(k) => prop_assert!(k.len() <= 6),
                Err(e) => prop_assert!(e.is_exhausted()),
            }
        }
    }
}
