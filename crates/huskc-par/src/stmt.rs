//! Statements, case alternatives, and guards.
//!
//! Do-statements are an expression, a monadic bind `pat <- exp`, or a
//! statement-level `let`. Case alternatives share the guarded-expression
//! shape with declaration right-hand sides: a `BRANCH` holds a pattern and
//! a list of `SWITCH(guard-list, expr)` nodes, where an unguarded arm gets
//! an empty guard list.

use huskc_lex::TokenKind;

use crate::ast::{AstTag, Tree};
use crate::{PResult, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn parse_stmts(&mut self) -> PResult<Tree> {
        self.parse_semicolon_list(Self::parse_stmt)
    }

    /// The `pat <-` prefix of a bind statement; matched as a unit so a
    /// failed bind backtracks cleanly into the expression-statement case.
    fn parse_bind_cont(&mut self) -> PResult<Tree> {
        let pat = self.run(Self::parse_pat)?;
        let tok = self.next()?;
        if tok.kind == TokenKind::From {
            return Ok(pat);
        }
        self.no_match(tok)
    }

    pub(crate) fn parse_stmt(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        if tok.kind == TokenKind::Let {
            let decls = self.parse_block(Self::parse_decls)?;
            return Ok(Tree::unary(AstTag::StmtLet, decls));
        }
        self.unsee(tok);
        if let Some(pat) = self.attempt(Self::parse_bind_cont)? {
            let expr = self.run(Self::parse_exp)?;
            return Ok(Tree::binary(AstTag::StmtBind, pat, expr));
        }
        let expr = self.run(Self::parse_exp)?;
        Ok(Tree::unary(AstTag::Stmt, expr))
    }

    pub(crate) fn parse_alts(&mut self) -> PResult<Tree> {
        self.parse_semicolon_list(Self::parse_alt)
    }

    /// One case alternative: `pat -> exp` or `pat` followed by guarded
    /// arms.
    pub(crate) fn parse_alt(&mut self) -> PResult<Tree> {
        let pat = self.run(Self::parse_pat)?;
        let tok = self.next()?;
        if tok.kind == TokenKind::To {
            let expr = self.run(Self::parse_exp)?;
            let arm = Tree::binary(AstTag::Switch, Tree::list(Vec::new()), expr);
            return Ok(Tree::binary(AstTag::Branch, pat, Tree::list(vec![arm])));
        }
        self.unsee(tok);
        let arms = self.run(Self::parse_gdpat)?;
        Ok(Tree::binary(AstTag::Branch, pat, arms))
    }

    /// Guarded case arms: `| g1, g2 -> exp` repeated.
    fn parse_gdpat(&mut self) -> PResult<Tree> {
        let guards = self.run(Self::parse_guards)?;
        let tok = self.next()?;
        if tok.kind != TokenKind::To {
            return self.no_match(tok);
        }
        let expr = self.run(Self::parse_exp)?;
        let rest = match self.attempt(Self::parse_gdpat)? {
            Some(rest) => rest,
            None => Tree::list(Vec::new()),
        };
        Ok(Tree::binary(
            AstTag::Cons,
            Tree::binary(AstTag::Switch, guards, expr),
            rest,
        ))
    }

    /// A `|`-introduced, comma-separated guard list.
    pub(crate) fn parse_guards(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        if tok.kind != TokenKind::Bar {
            return self.no_match(tok);
        }
        let mut guards = Vec::new();
        loop {
            let guard = self.run(Self::parse_guard)?;
            guards.push(guard);
            let sep = self.next()?;
            if sep.kind != TokenKind::Comma {
                self.unsee(sep);
                break;
            }
        }
        Ok(Tree::list(guards))
    }

    /// The `pat <-` prefix of a pattern guard.
    fn parse_guard_cont(&mut self) -> PResult<Tree> {
        let pat = self.run(Self::parse_pat)?;
        let tok = self.next()?;
        if tok.kind != TokenKind::From {
            return self.no_match(tok);
        }
        let expr = self.run(Self::parse_infixexp)?;
        Ok(Tree::binary(AstTag::GuardPat, pat, expr))
    }

    /// One guard: a pattern bind, a `let` guard, or a boolean expression.
    fn parse_guard(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        if tok.kind == TokenKind::Let {
            let decls = self.parse_block(Self::parse_decls)?;
            return Ok(Tree::unary(AstTag::GuardLet, decls));
        }
        self.unsee(tok);
        if let Some(guard) = self.attempt(Self::parse_guard_cont)? {
            return Ok(guard);
        }
        let expr = self.run(Self::parse_infixexp)?;
        Ok(Tree::unary(AstTag::GuardBool, expr))
    }
}
