//! Layered configuration for the exhook bridge.
//!
//! The configuration is built from two layers, merged field by field:
//! 1. **Defaults** - the built-in registry in [`defaults`]
//! 2. **File** - the first `config.yaml` found along the search path
//!
//! ## Search Path
//! 1. `/etc/emqx-exhook/`
//! 2. `~/.emqx-exhook/`
//! 3. `.` (working directory)
//! 4. `..`
//! 5. `./conf/`
//!
//! ## Merge Strategy
//! - Mappings merge key by key; absent keys keep their default
//! - Sequences and scalars present in the file replace the default
//!
//! ## Errors
//! - No file anywhere: defaults apply
//! - Unreadable or malformed file, type mismatch, broken invariant: fatal

pub mod defaults;
pub mod global;
mod merge;
mod resolver;
mod search;
mod types;

pub use defaults::{DefaultSet, register_defaults};
pub use merge::deep_merge;
pub use resolver::{ConfigLoader, decode, load_and_merge, resolve_config, validate};
pub use search::{
    CONFIG_BASE_NAME, CONFIG_EXTENSION, SearchDir, SearchLocation, SearchPaths,
    discover_config_path,
};
pub use types::*;
