//! Type grammar: `type`, `btype`, `atype`.
//!
//! The function arrow is right-associative and desugars to applications of
//! the freestanding arrow constructor, so `a -> b` becomes
//! `TYPE_APPLY(TYPE_APPLY(TYPE_ARROW, a), b)`. Tuples (both the bare
//! constructors `()`/`(,)`/`(,,)` and the applied form `(a, b)`) are
//! `TUPLE(arity)` under `TYPE_CON`, applied left-to-right.

use huskc_lex::TokenKind;

use crate::ast::{AstTag, Tree};
use crate::{is_con_name, PResult, Parser};

impl<'a> Parser<'a> {
    /// `type -> btype [-> type]`
    pub(crate) fn parse_type(&mut self) -> PResult<Tree> {
        let lhs = self.run(Self::parse_btype)?;
        let tok = self.next()?;
        if tok.kind == TokenKind::To {
            let rhs = self.run(Self::parse_type)?;
            Ok(Tree::binary(
                AstTag::TypeApply,
                Tree::binary(AstTag::TypeApply, Tree::leaf(AstTag::TypeArrow), lhs),
                rhs,
            ))
        } else {
            self.unsee(tok);
            Ok(lhs)
        }
    }

    /// `btype -> atype { atype }` (type application, left-associative)
    pub(crate) fn parse_btype(&mut self) -> PResult<Tree> {
        let mut lhs = self.run(Self::parse_atype)?;
        loop {
            match self.attempt(Self::parse_atype)? {
                None => return Ok(lhs),
                Some(rhs) => lhs = Tree::binary(AstTag::TypeApply, lhs, rhs),
            }
        }
    }

    /// `atype`: type variables, type constructors, and the parenthesized
    /// forms: `()`, `(,)`…, `(->)`, grouping, and tuple types.
    pub(crate) fn parse_atype(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::OpenParen => {
                let inner = self.next()?;
                match inner.kind {
                    TokenKind::CloseParen => {
                        Ok(Tree::unary(AstTag::TypeCon, Tree::tuple(0)))
                    }
                    TokenKind::Comma => {
                        let mut arity = 1u64;
                        let mut cur = inner;
                        while cur.kind == TokenKind::Comma {
                            arity += 1;
                            cur = self.next()?;
                        }
                        if cur.kind == TokenKind::CloseParen {
                            return Ok(Tree::unary(AstTag::TypeCon, Tree::tuple(arity)));
                        }
                        self.no_match(cur)
                    }
                    TokenKind::To => {
                        let close = self.next()?;
                        if close.kind == TokenKind::CloseParen {
                            return Ok(Tree::leaf(AstTag::TypeArrow));
                        }
                        self.no_match(close)
                    }
                    _ => {
                        self.unsee(inner);
                        let mut args = vec![self.run(Self::parse_type)?];
                        loop {
                            let sep = self.next()?;
                            match sep.kind {
                                TokenKind::CloseParen => break,
                                TokenKind::Comma => args.push(self.run(Self::parse_type)?),
                                _ => return self.no_match(sep),
                            }
                        }
                        if args.len() == 1 {
                            return Ok(args.pop().expect("one element"));
                        }
                        let arity = args.len() as u64;
                        let mut ty = Tree::unary(AstTag::TypeCon, Tree::tuple(arity));
                        for arg in args {
                            ty = Tree::binary(AstTag::TypeApply, ty, arg);
                        }
                        Ok(ty)
                    }
                }
            }
            TokenKind::Name => {
                let name = tok.qual_name();
                if is_con_name(name.name) {
                    Ok(Tree::unary(AstTag::TypeCon, Tree::qual_name(name)))
                } else if name.qualifier.is_none() {
                    Ok(Tree::unary(AstTag::TypeVar, Tree::name(name.name)))
                } else {
                    // A qualified lowercase name is not a type variable.
                    self.no_match(tok)
                }
            }
            _ => self.no_match(tok),
        }
    }
}
