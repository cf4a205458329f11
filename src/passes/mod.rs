//! Passes consuming the capability layer.

pub mod annotate_profile;

pub use annotate_profile::{AnnotateProfilePass, AnnotateStats};
