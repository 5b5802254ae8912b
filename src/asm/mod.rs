//! turns `.tpu` assembly source into a loaded `Memory` image. split into
//! the same stages the original loader folds into one function: lexing
//! (`lexer`), operand classification (`operand`), label bookkeeping
//! (`label`), per-mnemonic encoding (`encoder`), and the section-aware
//! driver that ties them together (`resolver`).

pub use self::error::AssembleError;
pub use self::resolver::{assemble, assemble_with_config, assemble_with_layout, DEBUG_BACKPATCH};

mod encoder;
mod error;
mod label;
mod lexer;
mod operand;
mod resolver;
