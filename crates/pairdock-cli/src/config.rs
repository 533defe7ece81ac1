mod builder;
mod defaults;
mod file;

pub use builder::{build_dock_config, build_merge_config};
