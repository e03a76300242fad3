//! Configuration loader and schema types.
//!
//! Settings come from struct defaults, an optional TOML file and
//! `PENGUIN_TUNES__*` environment variables, in increasing precedence.

mod load;
mod schema;

pub use load::{default_config_path, default_index_dir, resolve_config_path};
pub use schema::*;
