//! Pattern grammar: `pat`, `apat`.
//!
//! A `pat` is either a constructor applied to argument patterns or an
//! `apat`; an `apat` is a nullary constructor, a variable, a literal, or a
//! parenthesized pattern (grouping or tuple).

use huskc_lex::TokenKind;

use crate::ast::{AstTag, Payload, Tree};
use crate::{is_con_name, PResult, Parser};

impl<'a> Parser<'a> {
    /// `pat -> gcon { apat } | apat`
    pub(crate) fn parse_pat(&mut self) -> PResult<Tree> {
        match self.attempt(Self::parse_gcon)? {
            Some(con) => {
                let mut pats = Vec::new();
                loop {
                    match self.attempt(Self::parse_apat)? {
                        None => break,
                        Some(pat) => pats.push(pat),
                    }
                }
                Ok(Tree::binary(AstTag::PatCon, con, Tree::list(pats)))
            }
            None => self.parse_apat(),
        }
    }

    /// `apat`: nullary constructor, variable, literal, or parenthesized
    /// pattern.
    pub(crate) fn parse_apat(&mut self) -> PResult<Tree> {
        if let Some(con) = self.attempt(Self::parse_gcon)? {
            return Ok(Tree::binary(AstTag::PatCon, con, Tree::list(Vec::new())));
        }
        let tok = self.next()?;
        match tok.kind {
            TokenKind::OpenParen => {
                let mut pats = Vec::new();
                loop {
                    let pat = self.run(Self::parse_pat)?;
                    pats.push(pat);
                    let sep = self.next()?;
                    match sep.kind {
                        TokenKind::CloseParen => break,
                        TokenKind::Comma => {}
                        _ => return self.no_match(sep),
                    }
                }
                if pats.len() == 1 {
                    return Ok(pats.pop().expect("one element"));
                }
                let arity = pats.len() as u64;
                Ok(Tree::binary(
                    AstTag::PatCon,
                    Tree::tuple(arity),
                    Tree::list(pats),
                ))
            }
            TokenKind::Name => {
                let name = tok.qual_name();
                if name.qualifier.is_none() && !is_con_name(name.name) {
                    Ok(Tree::unary(AstTag::PatVar, Tree::name(name.name)))
                } else {
                    self.no_match(tok)
                }
            }
            TokenKind::Number => Ok(Tree::leaf_with(
                AstTag::PatNumLit,
                Payload::Int(tok.number()),
            )),
            TokenKind::Char => Ok(Tree::leaf_with(
                AstTag::PatCharLit,
                Payload::Int(tok.number()),
            )),
            TokenKind::String => {
                let bytes = tok.take_string();
                Ok(Tree::leaf_with(AstTag::PatStrLit, Payload::Str(bytes)))
            }
            _ => self.no_match(tok),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fail;

    fn parse_pat_source(src: &str) -> Tree {
        let mut parser = Parser::new(src);
        let pat = parser
            .run(Parser::parse_pat)
            .unwrap_or_else(|_| panic!("pattern parse failed for {:?}", src));
        pat
    }

    #[test]
    fn test_variable_pattern() {
        let pat = parse_pat_source("x");
        assert_eq!(pat.tag(), AstTag::PatVar);
    }

    #[test]
    fn test_nullary_constructor_pattern() {
        let pat = parse_pat_source("Nothing");
        assert_eq!(pat.tag(), AstTag::PatCon);
        assert_eq!(pat.child(1).tag(), AstTag::Nil);
    }

    #[test]
    fn test_constructor_with_arguments() {
        let pat = parse_pat_source("Pair x y");
        assert_eq!(pat.tag(), AstTag::PatCon);
        let args: Vec<_> = pat.child(1).iter_list().collect();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].tag(), AstTag::PatVar);
    }

    #[test]
    fn test_nested_constructor_needs_parens() {
        // In `Just Nothing x`, both Nothing and x are argument patterns.
        let pat = parse_pat_source("Just (Pair a b)");
        let args: Vec<_> = pat.child(1).iter_list().collect();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].tag(), AstTag::PatCon);
        let inner: Vec<_> = args[0].child(1).iter_list().collect();
        assert_eq!(inner.len(), 2);
    }

    #[test]
    fn test_tuple_pattern() {
        let pat = parse_pat_source("(a, b)");
        assert_eq!(pat.tag(), AstTag::PatCon);
        assert_eq!(pat.child(0).tag(), AstTag::Tuple);
        assert_eq!(pat.child(0).int(), 2);
    }

    #[test]
    fn test_parenthesized_pattern_is_transparent() {
        let pat = parse_pat_source("(x)");
        assert_eq!(pat.tag(), AstTag::PatVar);
    }

    #[test]
    fn test_literal_patterns() {
        assert_eq!(parse_pat_source("0").tag(), AstTag::PatNumLit);
        assert_eq!(parse_pat_source("'a'").tag(), AstTag::PatCharLit);
        assert_eq!(parse_pat_source("\"s\"").tag(), AstTag::PatStrLit);
    }

    #[test]
    fn test_empty_list_pattern() {
        let pat = parse_pat_source("[]");
        assert_eq!(pat.tag(), AstTag::PatCon);
        assert_eq!(pat.child(0).tag(), AstTag::QualName);
    }

    #[test]
    fn test_keyword_is_not_a_pattern() {
        let mut parser = Parser::new("of");
        assert!(matches!(parser.run(Parser::parse_pat), Err(Fail::NoMatch)));
    }
}
