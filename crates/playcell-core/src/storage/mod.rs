//! Local storage abstractions for cached attachment copies.

mod cache;

pub use cache::{purge_if_empty, resolve_local_file, FsFileResolver};
