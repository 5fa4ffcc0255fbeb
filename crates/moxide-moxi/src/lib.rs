#![doc = include_str!("../README.md")]

pub mod ast;
pub mod errors;
pub mod translate;

pub use ast::Command;
pub use errors::TranslateError;
pub use translate::{parse_task, translate, VerificationTask};
