//! The layout-aware lexer.
//!
//! State and contract:
//!
//! - `next` is total: it yields a token (possibly `Eof`) or a fatal
//!   [`LexError`].
//! - `unsee` pushes one token back; the slot must be empty.
//! - The lexer is `Clone`; the parser snapshots it before speculative
//!   parses and restores the snapshot on no-match.
//!
//! Layout bookkeeping: `line_started` records whether the current line has
//! produced a token yet; `indent_adj` accumulates the extra columns tabs
//! expand to, so a token's effective column is
//! `(offset - line_start) + indent_adj`. The indent stack holds the left
//! margins of the implicit blocks currently open.

use huskc_util::{Pos, QualName, Symbol};

use crate::token::{keyword_from_ident, Token, TokenKind, TokenValue};
use crate::LexError;

/// Characters that form operator symbols.
fn is_symbol_byte(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'*'
            | b'+'
            | b'.'
            | b'/'
            | b'<'
            | b'='
            | b'>'
            | b'?'
            | b'@'
            | b'\\'
            | b'^'
            | b'|'
            | b'-'
            | b'~'
            | b':'
    )
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// The husk lexer.
///
/// See the crate docs for the layout rule; everything else is a
/// conventional dispatch-on-first-byte scanner.
#[derive(Clone)]
pub struct Lexer<'a> {
    /// Input bytes. A NUL byte terminates the input early, matching the
    /// null-terminated-buffer input contract.
    src: &'a [u8],
    /// Current byte offset.
    pos: usize,
    /// Current line, 1-based.
    line: u32,
    /// Byte offset of the start of the current line.
    line_start: usize,
    /// Whether this line has emitted a token yet.
    line_started: bool,
    /// Extra columns contributed by tab expansion on this line.
    indent_adj: usize,
    /// Layout state: indents of the open implicit blocks, innermost last.
    indents: Vec<usize>,
    /// One-slot pushback buffer.
    lookahead: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
            line_started: false,
            indent_adj: 0,
            indents: Vec::new(),
            lookahead: None,
        }
    }

    /// Byte at `idx`, with everything past the end reading as NUL.
    fn at(&self, idx: usize) -> u8 {
        match self.src.get(idx) {
            Some(&b) => b,
            None => 0,
        }
    }

    /// Current source position, 1-based line/column.
    pub fn pos(&self) -> Pos {
        Pos::new(
            self.pos,
            self.line,
            (self.pos - self.line_start + 1) as u32,
        )
    }

    /// Effective column at the current offset, after tab expansion.
    fn current_indent(&self) -> usize {
        self.pos - self.line_start + self.indent_adj
    }

    fn token_here(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.pos(), self.current_indent())
    }

    /// Push one token back so the next [`Lexer::next`] returns it.
    ///
    /// # Panics
    ///
    /// Panics if the pushback slot is occupied. In particular a virtual
    /// open-brace cannot be unseen: it is not real input, and synthesizing
    /// one already filled the slot with the token that triggered it.
    pub fn unsee(&mut self, tok: Token) {
        assert!(
            self.lookahead.is_none(),
            "lexer pushback slot already occupied"
        );
        self.lookahead = Some(tok);
    }

    /// Consume whitespace and comments.
    ///
    /// Handles newline variants (`\n`, `\r`, `\r\n`), tab stops, `--` line
    /// comments (unless the dash run continues into an operator) and nested
    /// `{- -}` block comments.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.at(self.pos) {
                b'\r' | b'\n' => {
                    if self.at(self.pos) == b'\r' && self.at(self.pos + 1) == b'\n' {
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                    }
                    self.line += 1;
                    self.line_start = self.pos;
                    self.line_started = false;
                    self.indent_adj = 0;
                }
                b'\t' => {
                    // Effective column rounds up to the next multiple of 8,
                    // counting expansion from prior tabs on this line.
                    let col = self.current_indent();
                    self.pos += 1;
                    self.indent_adj = ((col | 7) + 1) - (self.pos - self.line_start);
                }
                // Form feed and vertical tab count as plain whitespace.
                b' ' | b'\x0b' | b'\x0c' => {
                    self.pos += 1;
                }
                b'-' if self.at(self.pos + 1) == b'-' => {
                    let mut end = self.pos;
                    while self.at(end) == b'-' {
                        end += 1;
                    }
                    // A dash run continuing into an operator (`-->`) is an
                    // operator, not a comment.
                    if is_symbol_byte(self.at(end)) {
                        return Ok(());
                    }
                    self.pos = end;
                    while self.at(self.pos) != 0
                        && self.at(self.pos) != b'\n'
                        && self.at(self.pos) != b'\r'
                    {
                        self.pos += 1;
                    }
                }
                b'{' if self.at(self.pos + 1) == b'-' => {
                    let open = self.pos();
                    let mut depth = 1usize;
                    self.pos += 2;
                    while depth > 0 {
                        if self.at(self.pos) == b'{' && self.at(self.pos + 1) == b'-' {
                            depth += 1;
                            self.pos += 2;
                        } else if self.at(self.pos) == b'-' && self.at(self.pos + 1) == b'}' {
                            depth -= 1;
                            self.pos += 2;
                        } else if self.at(self.pos) == 0 {
                            return Err(LexError::UnterminatedBlockComment { pos: open });
                        } else {
                            if self.at(self.pos) == b'\n' || self.at(self.pos) == b'\r' {
                                if self.at(self.pos) == b'\r' && self.at(self.pos + 1) == b'\n' {
                                    self.pos += 1;
                                }
                                self.line += 1;
                                self.line_start = self.pos + 1;
                                self.line_started = false;
                                self.indent_adj = 0;
                            }
                            self.pos += 1;
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Read the next token.
    ///
    /// Emits layout tokens first: on the first token of a line, while any
    /// implicit block is open, an equal column yields a virtual semicolon
    /// and a smaller column pops the stack and yields a virtual close
    /// brace, in both cases without consuming the real token.
    pub fn next(&mut self) -> Result<Token, LexError> {
        if let Some(tok) = self.lookahead.take() {
            return Ok(tok);
        }

        self.skip_whitespace_and_comments()?;

        if !self.line_started {
            if let Some(&top) = self.indents.last() {
                let indent = self.current_indent();
                if indent == top {
                    self.line_started = true;
                    return Ok(self.token_here(TokenKind::VSemicolon));
                } else if indent < top {
                    self.indents.pop();
                    return Ok(self.token_here(TokenKind::VCloseBrace));
                }
            }
        }
        self.line_started = true;

        let start = self.pos();
        let indent = self.current_indent();

        macro_rules! single {
            ($kind:expr) => {{
                self.pos += 1;
                return Ok(Token::new($kind, start, indent));
            }};
        }

        match self.at(self.pos) {
            0 => Ok(Token::new(TokenKind::Eof, start, indent)),
            b'{' => single!(TokenKind::OpenBrace),
            b'}' => single!(TokenKind::CloseBrace),
            b';' => single!(TokenKind::Semicolon),
            b'(' => single!(TokenKind::OpenParen),
            b')' => single!(TokenKind::CloseParen),
            b'[' => single!(TokenKind::OpenBracket),
            b']' => single!(TokenKind::CloseBracket),
            b',' => single!(TokenKind::Comma),
            b'`' => single!(TokenKind::Backtick),
            b'\'' => self.lex_char(start, indent),
            b'"' => self.lex_string(start, indent),
            b if is_symbol_byte(b) => Ok(self.lex_operator(start, indent)),
            b if is_ident_start(b) => Ok(self.lex_name(start, indent)),
            b if b.is_ascii_digit() => Ok(self.lex_number(start, indent)),
            b => Err(LexError::InvalidByte {
                pos: start,
                byte: b,
            }),
        }
    }

    /// Decode one escape sequence, positioned just past the backslash.
    fn lex_escape(&mut self) -> Result<u8, LexError> {
        let b = self.at(self.pos);
        if b == b'x' {
            self.pos += 1;
            let hi = self.hex_digit()?;
            let lo = self.hex_digit()?;
            return Ok(hi * 16 + lo);
        }
        self.pos += 1;
        Ok(match b {
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0b,
            b'\\' => b'\\',
            b'"' => b'"',
            b'\'' => b'\'',
            other => {
                return Err(LexError::BadEscape {
                    pos: self.pos(),
                    escape: other as char,
                })
            }
        })
    }

    fn hex_digit(&mut self) -> Result<u8, LexError> {
        let b = self.at(self.pos);
        let value = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            other => {
                return Err(LexError::BadHexDigit {
                    pos: self.pos(),
                    found: other as char,
                })
            }
        };
        self.pos += 1;
        Ok(value)
    }

    fn lex_char(&mut self, start: Pos, indent: usize) -> Result<Token, LexError> {
        self.pos += 1;
        let value = if self.at(self.pos) == b'\\' {
            self.pos += 1;
            self.lex_escape()?
        } else if self.at(self.pos) == 0 {
            return Err(LexError::MalformedChar { pos: start });
        } else {
            let b = self.at(self.pos);
            self.pos += 1;
            b
        };
        if self.at(self.pos) != b'\'' {
            return Err(LexError::MalformedChar { pos: start });
        }
        self.pos += 1;
        Ok(Token::with_value(
            TokenKind::Char,
            start,
            indent,
            TokenValue::Num(value as u64),
        ))
    }

    fn lex_string(&mut self, start: Pos, indent: usize) -> Result<Token, LexError> {
        self.pos += 1;
        let mut bytes = Vec::new();
        loop {
            match self.at(self.pos) {
                b'"' => {
                    self.pos += 1;
                    return Ok(Token::with_value(
                        TokenKind::String,
                        start,
                        indent,
                        TokenValue::Str(bytes),
                    ));
                }
                b'\\' => {
                    self.pos += 1;
                    bytes.push(self.lex_escape()?);
                }
                0 => return Err(LexError::UnterminatedString { pos: start }),
                b => {
                    bytes.push(b);
                    self.pos += 1;
                }
            }
        }
    }

    fn lex_operator(&mut self, start: Pos, indent: usize) -> Token {
        let run_start = self.pos;
        while is_symbol_byte(self.at(self.pos)) {
            self.pos += 1;
        }
        let run = &self.src[run_start..self.pos];
        // Reserved operators match only when they are the entire run:
        // `::=` is an ordinary symbol, not `::` followed by `=`.
        let kind = match run {
            b".." => Some(TokenKind::Range),
            b"::" => Some(TokenKind::HasType),
            b"<-" => Some(TokenKind::From),
            b"->" => Some(TokenKind::To),
            b"=>" => Some(TokenKind::Context),
            b"=" => Some(TokenKind::Equals),
            b"\\" => Some(TokenKind::Lambda),
            b"|" => Some(TokenKind::Bar),
            b"@" => Some(TokenKind::At),
            _ => None,
        };
        match kind {
            Some(kind) => Token::new(kind, start, indent),
            None => {
                let text = std::str::from_utf8(run).expect("operator bytes are ASCII");
                Token::with_value(
                    TokenKind::Oper,
                    start,
                    indent,
                    TokenValue::Name(QualName::plain(Symbol::intern(text))),
                )
            }
        }
    }

    /// Lex an identifier, constructor, or qualified name.
    ///
    /// `Mod.Sub.name` interns `Mod.Sub` as the qualifier and `name` as the
    /// name; `Mod.+` is a qualified operator symbol. The last `.`-separated
    /// component wins; everything before its dot is the qualifier.
    fn lex_name(&mut self, start: Pos, indent: usize) -> Token {
        let begin = self.pos;
        let mut name_begin = self.pos;
        while is_ident_continue(self.at(self.pos)) {
            self.pos += 1;
            if self.at(self.pos) == b'.' && is_ident_start(self.at(self.pos + 1)) {
                self.pos += 1;
                name_begin = self.pos;
            }
        }

        if self.at(self.pos) == b'.' && is_symbol_byte(self.at(self.pos + 1)) {
            self.pos += 1;
            let sym_begin = self.pos;
            while is_symbol_byte(self.at(self.pos)) {
                self.pos += 1;
            }
            let qualifier = self.intern_range(begin, sym_begin - 1);
            let name = self.intern_range(sym_begin, self.pos);
            return Token::with_value(
                TokenKind::Oper,
                start,
                indent,
                TokenValue::Name(QualName::qualified(qualifier, name)),
            );
        }

        let name = self.intern_range(name_begin, self.pos);
        if name_begin == begin {
            let text = name.as_str();
            if let Some(kw) = keyword_from_ident(text) {
                return Token::new(kw, start, indent);
            }
            Token::with_value(
                TokenKind::Name,
                start,
                indent,
                TokenValue::Name(QualName::plain(name)),
            )
        } else {
            let qualifier = self.intern_range(begin, name_begin - 1);
            Token::with_value(
                TokenKind::Name,
                start,
                indent,
                TokenValue::Name(QualName::qualified(qualifier, name)),
            )
        }
    }

    fn intern_range(&self, from: usize, to: usize) -> Symbol {
        let text = std::str::from_utf8(&self.src[from..to]).expect("name bytes are ASCII");
        Symbol::intern(text)
    }

    /// Lex a numeric literal: decimal, `0x` hexadecimal, or `0`-prefixed
    /// octal.
    fn lex_number(&mut self, start: Pos, indent: usize) -> Token {
        let mut value: u64 = 0;
        if self.at(self.pos) == b'0'
            && (self.at(self.pos + 1) == b'x' || self.at(self.pos + 1) == b'X')
            && self.at(self.pos + 2).is_ascii_hexdigit()
        {
            self.pos += 2;
            while self.at(self.pos).is_ascii_hexdigit() {
                let d = (self.at(self.pos) as char).to_digit(16).unwrap() as u64;
                value = value.wrapping_mul(16).wrapping_add(d);
                self.pos += 1;
            }
        } else if self.at(self.pos) == b'0' && matches!(self.at(self.pos + 1), b'0'..=b'7') {
            self.pos += 1;
            while matches!(self.at(self.pos), b'0'..=b'7') {
                value = value.wrapping_mul(8).wrapping_add((self.at(self.pos) - b'0') as u64);
                self.pos += 1;
            }
        } else {
            while self.at(self.pos).is_ascii_digit() {
                value = value
                    .wrapping_mul(10)
                    .wrapping_add((self.at(self.pos) - b'0') as u64);
                self.pos += 1;
            }
        }
        Token::with_value(TokenKind::Number, start, indent, TokenValue::Num(value))
    }

    /// Open a block: consume a literal `{`, or synthesize a virtual
    /// open-brace, pushing the indent of the unconsumed next token onto the
    /// layout stack. Returns whether the brace was virtual.
    pub fn next_open(&mut self) -> Result<(bool, Token), LexError> {
        let tok = self.next()?;
        if tok.kind == TokenKind::OpenBrace {
            return Ok((false, tok));
        }
        let vtok = Token::new(TokenKind::VOpenBrace, tok.pos, tok.indent);
        self.indents.push(tok.indent);
        self.unsee(tok);
        Ok((true, vtok))
    }

    /// Close a block opened with [`Lexer::next_open`].
    ///
    /// For a real brace (`virt == false`) this just reads the next token;
    /// the parser verifies it is `}`. For a virtual brace it consumes the
    /// pending layout-emitted virtual close if one arrives, and otherwise
    /// pops the layout stack and synthesizes one. The synthesis case is the
    /// layout rule's parse-error clause: `let x = 1 in x` must close the
    /// declaration block at `in` even though no dedent occurred.
    pub fn next_close(&mut self, virt: bool) -> Result<Token, LexError> {
        if !virt {
            return self.next();
        }
        let tok = self.next()?;
        if tok.kind == TokenKind::VCloseBrace {
            return Ok(tok);
        }
        let vtok = Token::new(TokenKind::VCloseBrace, tok.pos, tok.indent);
        self.unsee(tok);
        assert!(
            self.indents.pop().is_some(),
            "virtual close with no open layout block"
        );
        Ok(vtok)
    }
}
