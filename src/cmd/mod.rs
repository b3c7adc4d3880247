//! CLI command implementations.
//!
//! | Module   | Commands handled      |
//! |----------|-----------------------|
//! | `serve`  | `Serve`, `Init`       |
//! | `key`    | `Key`                 |
//! | `column` | `Rebalance`, `Move`   |

pub mod column;
pub mod key;
pub mod serve;

pub use column::{cmd_move, cmd_rebalance};
pub use key::cmd_key;
pub use serve::{cmd_init, cmd_serve};
