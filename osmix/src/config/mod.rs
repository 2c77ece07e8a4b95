//! The optional `osmix.yml` configuration file.
//!
//! Every field is optional. Command line flags override the file, the file overrides the
//! built-in defaults.

mod index;
mod main;
mod tile;

pub use index::IndexConfig;
pub use main::Config;
pub use tile::TileSection;
