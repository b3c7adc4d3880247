//! Shared ordering primitives for the Forge board.
//!
//! Everything in this crate is pure: no I/O, no global state. The board
//! service and its tests build on these types.
//!
//! | Module      | Responsibility                                        |
//! |-------------|-------------------------------------------------------|
//! | `alphabet`  | The 36-symbol ordered alphabet                        |
//! | `order_key` | `OrderKey` newtype and its validation                 |
//! | `generator` | `KeyGenerator`, `JitterSource` implementations        |
//! | `error`     | `KeyGenError`                                         |

pub mod alphabet;
pub mod error;
pub mod generator;
pub mod order_key;

pub use error::KeyGenError;
pub use generator::{
    DEFAULT_JITTER_WINDOW, JitterSource, KeyGenerator, MAX_JITTER_WINDOW, NoJitter, RandomJitter,
    SeededJitter, generate_order_key, seed_key,
};
pub use order_key::{MAX_KEY_LENGTH, OrderKey};
