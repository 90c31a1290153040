//! Library target for the `anisrc` package.
//!
//! The primary deliverable of this package is the `anisrc` CLI binary
//! (`src/main.rs`). This library exists so `cargo test -p anisrc --doc`
//! can validate the re-exported parser crate under each feature set.

#[doc(hidden)]
pub use sources_parser;
