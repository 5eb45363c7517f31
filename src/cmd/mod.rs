//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `serve`  | `Serve`          |
//! | `burn`   | `Burn`           |
//! | `chat`   | `Chat`           |
//! | `config` | `Config`         |

pub mod burn;
pub mod chat;
pub mod config;
pub mod serve;

pub use burn::{BurnArgs, cmd_burn};
pub use chat::cmd_chat;
pub use config::cmd_config;
pub use serve::cmd_serve;
