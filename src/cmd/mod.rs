//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled                                   |
//! |-----------------|-----------------------------------------------------|
//! | `project`       | `Init`                                             |
//! | `session`       | `Say`, `Advance`, `Segments`, `Reset`, `Sessions`  |
//! | `context`       | `Context`                                          |
//! | `config`        | `Config`                                           |

pub mod config;
pub mod context;
pub mod project;
pub mod session;

pub use config::cmd_config;
pub use context::cmd_context;
pub use project::cmd_init;
pub use session::{cmd_advance, cmd_reset, cmd_say, cmd_segments, cmd_sessions};
