//! huskc-lex - Layout-Aware Lexical Analyzer
//!
//! Transforms husk source text into a token stream. Most of a Haskell-style
//! lexer is conventional; the interesting part is the *layout rule*, which
//! turns indentation into virtual `{`, `;` and `}` tokens so the grammar
//! itself never has to look at columns:
//!
//! ```text
//! main = do          do opens an implicit block at the column of `x`
//!   x <- getLine
//!   putStrLn x       same column: virtual `;` before the token
//! other = 0          smaller column: virtual `}` closes the block
//! ```
//!
//! The lexer owns a stack of block indentations. On the first token of each
//! line it compares the token's effective column (tabs expand to 8-column
//! stops) against the top of the stack and emits the corresponding virtual
//! token *before* the real one. Blocks are opened cooperatively with the
//! parser through [`Lexer::next_open`] / [`Lexer::next_close`], which also
//! cover the "close an implicit block on parse error" clause of the layout
//! rule (`let x = 1 in x` never sees a dedent, yet the block must close
//! before `in`).
//!
//! Two more properties the parser depends on:
//!
//! - one token of pushback via [`Lexer::unsee`], and
//! - cheap whole-state cloning, which is what makes unbounded-lookahead
//!   backtracking in the parser a simple save/restore.
//!
//! All lex errors are fatal; there is no recovery or resynchronization.

pub mod lexer;
pub mod token;

pub use lexer::Lexer;
pub use token::{Token, TokenKind, TokenValue};

use huskc_util::Pos;
use thiserror::Error;

/// Fatal lexical errors.
///
/// Every variant carries the position where lexing stopped; the driver
/// prints it and exits.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("{pos}: unterminated block comment")]
    UnterminatedBlockComment { pos: Pos },

    #[error("{pos}: unterminated string literal")]
    UnterminatedString { pos: Pos },

    #[error("{pos}: unknown escape sequence `\\{escape}`")]
    BadEscape { pos: Pos, escape: char },

    #[error("{pos}: `{found}` is not a hexadecimal digit")]
    BadHexDigit { pos: Pos, found: char },

    #[error("{pos}: malformed character literal")]
    MalformedChar { pos: Pos },

    #[error("{pos}: invalid input byte 0x{byte:02x}")]
    InvalidByte { pos: Pos, byte: u8 },
}
