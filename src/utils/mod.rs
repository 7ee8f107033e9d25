//! Utility modules for the static site generator.

pub mod date;
pub mod path;
pub mod url;

#[cfg(test)]
pub mod testing;
