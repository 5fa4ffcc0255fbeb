#![doc = include_str!("../README.md")]

pub mod bmc;
pub mod error;
pub mod pdr;
pub mod pipeline;
pub mod result;

#[cfg(test)]
pub(crate) mod testing;

pub use bmc::{BmcInduction, BmcInductionIncr};
pub use error::CheckError;
pub use pdr::Pdr;
pub use pipeline::{check_reachability, Algorithm, CheckOptions, SolverChoice};
pub use result::{Cube, Verdict, Witness};
