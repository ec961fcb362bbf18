//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled                  |
//! |----------|-----------------------------------|
//! | `serve`  | `Serve`                           |
//! | `db`     | `InitDb`, `CheckDb`               |
//! | `board`  | `Stages`, `Board`, `Move`         |
//! | `config` | `Config`                          |

pub mod board;
pub mod config;
pub mod db;
pub mod serve;

pub use board::{cmd_board, cmd_move, cmd_stages, open_store};
pub use config::cmd_config;
pub use db::{cmd_check_db, cmd_init_db};
pub use serve::cmd_serve;
