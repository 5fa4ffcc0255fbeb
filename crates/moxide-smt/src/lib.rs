#![doc = include_str!("../README.md")]

pub mod backends;
pub mod oracle;

pub use oracle::{Model, Oracle, SatResult};
