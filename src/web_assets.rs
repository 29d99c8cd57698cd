//! Embedded static web assets for serve mode.
//!
//! The stylesheet is compiled into the binary via `include_str!` so the
//! binary is fully self-contained; no asset files need to be distributed.

/// Stylesheet for the serve-mode course pages.
///
/// Loaded from `src/assets/cours.css` at compile time.
pub const CSS: &str = include_str!("assets/cours.css");
