pub mod ast;
pub mod builder;
pub mod container;
pub mod cst;
pub mod emitter;
pub mod lexer;
pub mod parser;
