//! the T-language front end: lexing (`lexer`), recursive-descent/
//! precedence-climbing parsing onto a typed AST (`parser`, `ast`, `types`,
//! `scope`), and a stack-machine code generator that lowers the AST to TPU
//! assembly text (`codegen`) for `asm::assemble` to consume.

pub use self::codegen::{generate, generate_with_config, CodegenContext, CodegenError};
pub use self::error::{LexError, ParseError, SemanticError};
pub use self::lexer::tokenize;
pub use self::parser::{parse, Error as ParserError};

use crate::config::Config as TpuConfig;

pub mod ast;
mod codegen;
mod error;
mod lexer;
mod parser;
mod scope;
mod token;
mod types;

/// compiles T source straight through to assembly text, matching the
/// `compile` binary's one-shot use of the front end.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let tokens = tokenize(source)?;
    let ast = parse(&tokens)?;
    let asm = generate(&ast)?;
    Ok(asm)
}

/// same as `compile`, but honors `cfg.compiler.trace_emit`.
pub fn compile_with_config(source: &str, cfg: &TpuConfig) -> Result<String, CompileError> {
    let tokens = tokenize(source)?;
    let ast = parse(&tokens)?;
    let asm = generate_with_config(&ast, &cfg.compiler)?;
    Ok(asm)
}

quick_error! {
    #[derive(Debug)]
    pub enum CompileError {
        Lex(err: LexError) {
            display("{}", err)
            from()
        }
        Parse(err: ParserError) {
            display("{:?}", err)
            from()
        }
        Codegen(err: CodegenError) {
            display("{}", err)
            from()
        }
    }
}
