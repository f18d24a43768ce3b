//! huskc-par - Parser (Syntactic Analyzer)
//!
//! Hand-written recursive descent over the token stream from `huskc-lex`,
//! producing the tagged [`Tree`] AST. The grammar is modeled on Haskell 98's
//! expression/pattern/declaration subset and is *not* LL(1); instead of
//! factoring it, the parser uses unbounded lookahead via checkpointing:
//!
//! - Every speculative alternative runs under [`Parser::attempt`], which
//!   snapshots the lexer (a cheap clone: position, layout stack, pushback
//!   slot), runs the sub-parser, and restores the snapshot when the
//!   sub-parser reports *no match*.
//! - Failures are two-tier. `Fail::NoMatch` is an ordinary "this
//!   alternative doesn't apply" and is caught by `attempt`;
//!   `Fail::Fatal` wraps a [`ParseError`] (depth exhaustion, lexer errors,
//!   trailing input) and aborts the whole parse.
//! - A recursion-depth counter is bumped on every non-terminal entry
//!   ([`Parser::run`]); exceeding [`MAX_DEPTH`] is fatal, so adversarially
//!   nested input dies with a diagnostic instead of blowing the control
//!   stack.
//!
//! Two grammar quirks worth knowing before reading the productions:
//!
//! - Operator expressions come out *unresolved*: `a + b * c` parses to
//!   right-nested [`AstTag::UOperator`] nodes regardless of fixity. The
//!   fixity declarations (`infixl 6 +`) are parsed and preserved, but the
//!   reassociation pass that consumes them lives outside this crate.
//! - Parenthesized forms are genuinely ambiguous prefixes: `(,)`, `(-)`,
//!   `(1 +)`, `(+ 1)`, `(1 + 2)` and `(1, 2)` all start with `(` and only
//!   checkpointed retries tell them apart. See `expr.rs` for the dance.
//!
//! Blocks (`let`, `where`, `do`, `case … of`) are opened through the
//! lexer's `next_open`, remembering whether the brace was virtual, and must
//! be closed with the same virtuality; a mismatch fails the production.

pub mod ast;
pub mod dump;
mod expr;
mod items;
mod pattern;
mod stmt;
mod types;

pub use ast::{AstTag, ListIter, Payload, Tree};
pub use dump::Dump;

use huskc_lex::{LexError, Lexer, Token, TokenKind};
use huskc_util::{Pos, Symbol};
use thiserror::Error;

/// Maximum recursion depth before the parser gives up.
pub const MAX_DEPTH: usize = 0x1000;

/// Fatal parse errors. Anything that is not a clean backtrack aborts the
/// parse with one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{pos}: ran out of depth")]
    DepthExceeded { pos: Pos },

    #[error("{pos}: did not consume the entire input")]
    TrailingInput { pos: Pos },

    #[error(transparent)]
    Lex(#[from] LexError),
}

/// Internal failure channel: a soft no-match (caught by [`Parser::attempt`])
/// or a fatal error (propagated to the entry point).
#[derive(Debug)]
pub(crate) enum Fail {
    NoMatch,
    Fatal(ParseError),
}

impl From<LexError> for Fail {
    fn from(err: LexError) -> Fail {
        Fail::Fatal(ParseError::Lex(err))
    }
}

pub(crate) type PResult<T> = Result<T, Fail>;

/// Whether a name spelling refers to a constructor (uppercase initial, or a
/// `:`-initial operator).
pub(crate) fn is_con_name(name: Symbol) -> bool {
    matches!(name.as_str().bytes().next(), Some(b'A'..=b'Z' | b':'))
}

/// The recursive-descent parser.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(src),
            depth: 0,
        }
    }

    /// Parse a whole program: an optional `module M where { … }` header
    /// around a declaration list, consuming the input to end-of-file.
    pub fn parse_program(&mut self) -> Result<Tree, ParseError> {
        let decls = self.toplevel(Self::parse_module)?;
        self.expect_eof()?;
        Ok(decls)
    }

    /// Parse a single expression, consuming the input to end-of-file.
    pub fn parse_expression(&mut self) -> Result<Tree, ParseError> {
        let expr = self.toplevel(Self::parse_exp)?;
        self.expect_eof()?;
        Ok(expr)
    }

    /// Parse a single type, consuming the input to end-of-file.
    pub fn parse_type_expression(&mut self) -> Result<Tree, ParseError> {
        let ty = self.toplevel(Self::parse_type)?;
        self.expect_eof()?;
        Ok(ty)
    }

    /// Run an entry-point production, turning a top-level no-match into the
    /// trailing-input diagnostic (nothing above us can backtrack).
    fn toplevel(&mut self, f: fn(&mut Self) -> PResult<Tree>) -> Result<Tree, ParseError> {
        match self.run(f) {
            Ok(tree) => Ok(tree),
            Err(Fail::NoMatch) => Err(ParseError::TrailingInput {
                pos: self.lexer.pos(),
            }),
            Err(Fail::Fatal(err)) => Err(err),
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        let tok = self.lexer.next()?;
        if tok.kind != TokenKind::Eof {
            return Err(ParseError::TrailingInput { pos: tok.pos });
        }
        Ok(())
    }

    // =========================================================================
    // Parsing machinery
    // =========================================================================

    pub(crate) fn next(&mut self) -> PResult<Token> {
        Ok(self.lexer.next()?)
    }

    pub(crate) fn unsee(&mut self, tok: Token) {
        self.lexer.unsee(tok);
    }

    /// Push `tok` back and report no-match; the shape of almost every
    /// failing alternative.
    pub(crate) fn no_match<T>(&mut self, tok: Token) -> PResult<T> {
        self.unsee(tok);
        Err(Fail::NoMatch)
    }

    /// Enter a non-terminal: bump the depth counter, fail fatally at the
    /// cap.
    pub(crate) fn run<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth == MAX_DEPTH {
            return Err(Fail::Fatal(ParseError::DepthExceeded {
                pos: self.lexer.pos(),
            }));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Checkpointed alternative: snapshot the lexer, run `f`, and restore
    /// the snapshot if `f` reports no-match. Fatal errors propagate.
    pub(crate) fn attempt<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<Option<T>> {
        let save = self.lexer.clone();
        match self.run(f) {
            Ok(value) => Ok(Some(value)),
            Err(Fail::NoMatch) => {
                self.lexer = save;
                Ok(None)
            }
            Err(fatal) => Err(fatal),
        }
    }

    pub(crate) fn save(&self) -> Lexer<'a> {
        self.lexer.clone()
    }

    pub(crate) fn restore(&mut self, save: Lexer<'a>) {
        self.lexer = save;
    }

    /// Parse a layout block around `f`: open a real or virtual brace, run
    /// `f`, and close with the same virtuality.
    pub(crate) fn parse_block(&mut self, f: fn(&mut Self) -> PResult<Tree>) -> PResult<Tree> {
        let (virt, _open) = self.lexer.next_open()?;
        let body = self.run(f)?;
        let close = self.lexer.next_close(virt)?;
        let expected = if virt {
            TokenKind::VCloseBrace
        } else {
            TokenKind::CloseBrace
        };
        if close.kind != expected {
            return self.no_match(close);
        }
        Ok(body)
    }

    fn skip_semicolons(&mut self) -> PResult<()> {
        loop {
            let tok = self.next()?;
            if tok.kind != TokenKind::Semicolon && tok.kind != TokenKind::VSemicolon {
                self.unsee(tok);
                return Ok(());
            }
        }
    }

    /// Parse a possibly-empty run of `f` separated by real or virtual
    /// semicolons (with empty groups allowed), producing a `Cons`/`Nil`
    /// list.
    pub(crate) fn parse_semicolon_list(
        &mut self,
        f: fn(&mut Self) -> PResult<Tree>,
    ) -> PResult<Tree> {
        let mut items = Vec::new();
        self.skip_semicolons()?;
        loop {
            match self.attempt(f)? {
                None => break,
                Some(elem) => items.push(elem),
            }
            let tok = self.next()?;
            if tok.kind != TokenKind::Semicolon && tok.kind != TokenKind::VSemicolon {
                self.unsee(tok);
                break;
            }
            self.skip_semicolons()?;
        }
        Ok(Tree::list(items))
    }

    // =========================================================================
    // Names
    // =========================================================================

    /// An unqualified variable name: `x` or a parenthesized operator `(+)`.
    pub(crate) fn parse_var(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::OpenParen => {
                let op = self.next()?;
                if op.kind != TokenKind::Oper {
                    return self.no_match(op);
                }
                let name = op.qual_name();
                if name.qualifier.is_some() || is_con_name(name.name) {
                    return self.no_match(op);
                }
                let close = self.next()?;
                if close.kind != TokenKind::CloseParen {
                    return self.no_match(close);
                }
                Ok(Tree::name(name.name))
            }
            TokenKind::Name => {
                let name = tok.qual_name();
                if name.qualifier.is_none() && !is_con_name(name.name) {
                    Ok(Tree::name(name.name))
                } else {
                    self.no_match(tok)
                }
            }
            _ => self.no_match(tok),
        }
    }

    /// A possibly-qualified variable: `x`, `M.x`, `(+)`, `(M.+)`.
    pub(crate) fn parse_qvar(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::OpenParen => {
                let op = self.next()?;
                if op.kind != TokenKind::Oper || is_con_name(op.qual_name().name) {
                    return self.no_match(op);
                }
                let name = op.qual_name();
                let close = self.next()?;
                if close.kind != TokenKind::CloseParen {
                    return self.no_match(close);
                }
                Ok(Tree::qual_name(name))
            }
            TokenKind::Name => {
                if !is_con_name(tok.qual_name().name) {
                    Ok(Tree::qual_name(tok.qual_name()))
                } else {
                    self.no_match(tok)
                }
            }
            _ => self.no_match(tok),
        }
    }

    /// A possibly-qualified constructor: `Just`, `M.Just`, `(:+)`.
    pub(crate) fn parse_qcon(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::OpenParen => {
                let op = self.next()?;
                if op.kind != TokenKind::Oper || !is_con_name(op.qual_name().name) {
                    return self.no_match(op);
                }
                let name = op.qual_name();
                let close = self.next()?;
                if close.kind != TokenKind::CloseParen {
                    return self.no_match(close);
                }
                Ok(Tree::qual_name(name))
            }
            TokenKind::Name => {
                if is_con_name(tok.qual_name().name) {
                    Ok(Tree::qual_name(tok.qual_name()))
                } else {
                    self.no_match(tok)
                }
            }
            _ => self.no_match(tok),
        }
    }

    /// A general constructor: a qualified constructor, the unit/tuple
    /// constructors `()`, `(,)`, `(,,)`, …, or the empty list `[]`.
    pub(crate) fn parse_gcon(&mut self) -> PResult<Tree> {
        if let Some(con) = self.attempt(Self::parse_qcon)? {
            return Ok(con);
        }
        let tok = self.next()?;
        match tok.kind {
            TokenKind::OpenParen => {
                let inner = self.next()?;
                match inner.kind {
                    TokenKind::CloseParen => return Ok(Tree::tuple(0)),
                    TokenKind::Comma => {
                        let mut arity = 1u64;
                        let mut cur = inner;
                        while cur.kind == TokenKind::Comma {
                            arity += 1;
                            cur = self.next()?;
                        }
                        if cur.kind == TokenKind::CloseParen {
                            return Ok(Tree::tuple(arity));
                        }
                        self.unsee(cur);
                    }
                    _ => self.unsee(inner),
                }
                Err(Fail::NoMatch)
            }
            TokenKind::OpenBracket => {
                let close = self.next()?;
                if close.kind != TokenKind::CloseBracket {
                    return self.no_match(close);
                }
                Ok(Tree::qual_name(huskc_util::QualName::plain(Symbol::intern(
                    "[]",
                ))))
            }
            _ => self.no_match(tok),
        }
    }
}
