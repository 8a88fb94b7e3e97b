//! Visual theme for DefraNotes.

mod styles;

pub use styles::GLOBAL_STYLES;
