//! Lexical analysis: turns the source character buffer into a token
//! sequence terminated by an `Eof` sentinel.

pub mod cursor;
pub mod error;
pub mod lexer;
pub mod token;

pub use error::{LexError, LexResult};
pub use lexer::Lexer;
pub use token::{Token, TokenKind};
