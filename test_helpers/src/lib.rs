//! Test helpers shared across crates.
//!
//! [`text`] normalises inline documents and rendered reports; [`files`]
//! writes fixture documents into a scratch directory.

pub mod files;
pub mod text;
