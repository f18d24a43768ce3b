//! Expression grammar.
//!
//! `exp` wraps `infixexp` with optional `:: type` ascriptions. `infixexp`
//! emits *unresolved* right-nested `UOPERATOR` chains; fixity resolution is
//! a later pass. `lexp` dispatches on the leading keyword (lambda, `let`,
//! `if`, `case`, `do`) and otherwise falls through to left-associative
//! application (`fexp`) over atomic expressions (`aexp`).
//!
//! The parenthesized forms are the reason this parser backtracks at all.
//! After `(` we first try a full expression:
//!
//! - no expression parses ⇒ only a right section `(+ 1)` can follow;
//! - an expression parses ⇒ rewind and try the section parser anyway,
//!   because `(1 +)` also begins with a valid expression prefix; if the
//!   section parser fails too, commit to the expression and continue into
//!   grouping `(e)` or tuples `(e1, e2, …)`.

use huskc_lex::TokenKind;

use crate::ast::{AstTag, Payload, Tree};
use crate::{is_con_name, PResult, Parser};

impl<'a> Parser<'a> {
    /// `exp -> infixexp { :: type }`
    pub(crate) fn parse_exp(&mut self) -> PResult<Tree> {
        let mut expr = self.run(Self::parse_infixexp)?;
        loop {
            let tok = self.next()?;
            if tok.kind == TokenKind::HasType {
                let ty = self.run(Self::parse_type)?;
                expr = Tree::binary(AstTag::Cast, expr, ty);
            } else {
                self.unsee(tok);
                return Ok(expr);
            }
        }
    }

    /// `infixexp -> lexp [qop infixexp]`, right-nested and fixity-blind.
    pub(crate) fn parse_infixexp(&mut self) -> PResult<Tree> {
        let arg1 = self.run(Self::parse_lexp)?;
        match self.attempt(|p| {
            let op = p.run(Self::parse_qop)?;
            let arg2 = p.run(Self::parse_infixexp)?;
            Ok((op, arg2))
        })? {
            Some((op, arg2)) => Ok(Tree::ternary(AstTag::UOperator, op, arg1, arg2)),
            None => Ok(arg1),
        }
    }

    /// `lexp`: lambda, `let … in`, `if`, `case … of`, `do`, or `fexp`.
    pub(crate) fn parse_lexp(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::Lambda => {
                let mut pats = Vec::new();
                loop {
                    let tok = self.next()?;
                    if tok.kind == TokenKind::To {
                        let body = self.run(Self::parse_exp)?;
                        return Ok(Tree::binary(AstTag::Lambda, Tree::list(pats), body));
                    }
                    self.unsee(tok);
                    pats.push(self.run(Self::parse_apat)?);
                }
            }
            TokenKind::Let => {
                let decls = self.parse_block(Self::parse_decls)?;
                let tok = self.next()?;
                if tok.kind != TokenKind::In {
                    return self.no_match(tok);
                }
                let body = self.run(Self::parse_exp)?;
                Ok(Tree::binary(AstTag::Let, decls, body))
            }
            TokenKind::If => {
                let cond = self.run(Self::parse_exp)?;
                self.skip_one_semicolon()?;
                let tok = self.next()?;
                if tok.kind != TokenKind::Then {
                    return self.no_match(tok);
                }
                let then_branch = self.run(Self::parse_exp)?;
                self.skip_one_semicolon()?;
                let tok = self.next()?;
                if tok.kind != TokenKind::Else {
                    return self.no_match(tok);
                }
                let else_branch = self.run(Self::parse_exp)?;
                Ok(Tree::ternary(AstTag::If, cond, then_branch, else_branch))
            }
            TokenKind::Case => {
                let scrut = self.run(Self::parse_exp)?;
                let tok = self.next()?;
                if tok.kind != TokenKind::Of {
                    return self.no_match(tok);
                }
                let branches = self.parse_block(Self::parse_alts)?;
                Ok(Tree::binary(AstTag::Case, scrut, branches))
            }
            TokenKind::Do => {
                let stmts = self.parse_block(Self::parse_stmts)?;
                Ok(Tree::unary(AstTag::Do, stmts))
            }
            _ => {
                self.unsee(tok);
                self.run(Self::parse_fexp)
            }
        }
    }

    /// A layout-induced semicolon may precede `then`/`else` when the
    /// branches sit on their own lines; swallow at most one.
    fn skip_one_semicolon(&mut self) -> PResult<()> {
        let tok = self.next()?;
        if tok.kind != TokenKind::Semicolon && tok.kind != TokenKind::VSemicolon {
            self.unsee(tok);
        }
        Ok(())
    }

    /// `fexp -> aexp { aexp }` (application, left-associative)
    pub(crate) fn parse_fexp(&mut self) -> PResult<Tree> {
        let mut expr = self.run(Self::parse_aexp)?;
        loop {
            match self.attempt(Self::parse_aexp)? {
                None => return Ok(expr),
                Some(arg) => expr = Tree::binary(AstTag::Apply, expr, arg),
            }
        }
    }

    /// An infix operator occurrence: a symbol, or a backtick-quoted name.
    /// Produces `VAR`/`CON` over the qualified name, by constructor-ness.
    pub(crate) fn parse_qop(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::Oper => {
                let name = tok.qual_name();
                let tag = if is_con_name(name.name) {
                    AstTag::Con
                } else {
                    AstTag::Var
                };
                Ok(Tree::unary(tag, Tree::qual_name(name)))
            }
            TokenKind::Backtick => {
                let name_tok = self.next()?;
                if name_tok.kind != TokenKind::Name {
                    return self.no_match(name_tok);
                }
                let name = name_tok.qual_name();
                let close = self.next()?;
                if close.kind != TokenKind::Backtick {
                    return self.no_match(close);
                }
                let tag = if is_con_name(name.name) {
                    AstTag::Con
                } else {
                    AstTag::Var
                };
                Ok(Tree::unary(tag, Tree::qual_name(name)))
            }
            _ => self.no_match(tok),
        }
    }

    /// Section continuations after `(` when an expression prefix *did*
    /// parse: `op infixexp )` is a right section, `infixexp op )` a left
    /// section.
    fn parse_paren_cont(&mut self) -> PResult<Tree> {
        if let Some(op) = self.attempt(Self::parse_qop)? {
            let arg = self.run(Self::parse_infixexp)?;
            let close = self.next()?;
            if close.kind != TokenKind::CloseParen {
                return self.no_match(close);
            }
            Ok(Tree::binary(AstTag::RSection, op, arg))
        } else {
            let arg = self.run(Self::parse_infixexp)?;
            let op = self.run(Self::parse_qop)?;
            let close = self.next()?;
            if close.kind != TokenKind::CloseParen {
                return self.no_match(close);
            }
            Ok(Tree::binary(AstTag::LSection, op, arg))
        }
    }

    /// Section continuation when no expression can start after `(`: only a
    /// right section is possible.
    fn parse_paren_cont_right(&mut self) -> PResult<Tree> {
        let op = self.run(Self::parse_qop)?;
        let arg = self.run(Self::parse_infixexp)?;
        let close = self.next()?;
        if close.kind != TokenKind::CloseParen {
            return self.no_match(close);
        }
        Ok(Tree::binary(AstTag::RSection, op, arg))
    }

    /// `aexp`: constructors, variables, literals, and the parenthesized
    /// forms (grouping, sections, tuples).
    pub(crate) fn parse_aexp(&mut self) -> PResult<Tree> {
        if let Some(con) = self.attempt(Self::parse_gcon)? {
            return Ok(Tree::unary(AstTag::Con, con));
        }
        if let Some(var) = self.attempt(Self::parse_qvar)? {
            return Ok(Tree::unary(AstTag::Var, var));
        }
        let tok = self.next()?;
        match tok.kind {
            TokenKind::OpenParen => {
                // Try a full expression first. If none parses here, the
                // section parser cannot parse an infixexp either, so only
                // the op-first right section remains.
                let after_open = self.save();
                let first = match self.attempt(Self::parse_exp)? {
                    None => return self.run(Self::parse_paren_cont_right),
                    Some(expr) => expr,
                };
                let after_exp = self.save();
                self.restore(after_open);
                if let Some(section) = self.attempt(Self::parse_paren_cont)? {
                    return Ok(section);
                }
                self.restore(after_exp);

                let mut args = vec![first];
                loop {
                    let sep = self.next()?;
                    match sep.kind {
                        TokenKind::CloseParen => break,
                        TokenKind::Comma => args.push(self.run(Self::parse_exp)?),
                        _ => return self.no_match(sep),
                    }
                }
                if args.len() == 1 {
                    return Ok(Tree::unary(AstTag::Parens, args.pop().expect("one element")));
                }
                let arity = args.len() as u64;
                let mut expr = Tree::unary(AstTag::Con, Tree::tuple(arity));
                for arg in args {
                    expr = Tree::binary(AstTag::Apply, expr, arg);
                }
                Ok(expr)
            }
            TokenKind::Number => Ok(Tree::leaf_with(AstTag::NumLit, Payload::Int(tok.number()))),
            TokenKind::Char => Ok(Tree::leaf_with(AstTag::CharLit, Payload::Int(tok.number()))),
            TokenKind::String => {
                let bytes = tok.take_string();
                Ok(Tree::leaf_with(AstTag::StrLit, Payload::Str(bytes)))
            }
            _ => self.no_match(tok),
        }
    }
}
