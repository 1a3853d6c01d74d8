//! Core types for Bindgate

mod credential;
mod outcome;

pub use credential::*;
pub use outcome::*;
