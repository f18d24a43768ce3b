//! Declarations: value bindings, type signatures, fixity declarations, and
//! the optional `module … where` header.
//!
//! A binding `f p1 p2 | g = e` becomes
//! `BINDING(name, pattern-list, switch-list)`; the switch list is the same
//! guarded-expression shape case alternatives use, with `= e` producing a
//! single `SWITCH` with an empty guard list.

use huskc_lex::TokenKind;

use crate::ast::{AstTag, Payload, Tree};
use crate::{PResult, Parser};

impl<'a> Parser<'a> {
    /// Top level: either `module M where { decls }` or a bare declaration
    /// list. The module header contributes no AST of its own. A module-less
    /// program is still wrapped in an implicit layout block anchored at the
    /// first token's column, so top-level declarations separate on
    /// newlines.
    pub(crate) fn parse_module(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        if tok.kind == TokenKind::Module {
            let name = self.next()?;
            if name.kind != TokenKind::Name {
                return self.no_match(name);
            }
            let wh = self.next()?;
            if wh.kind != TokenKind::Where {
                return self.no_match(wh);
            }
            return self.parse_block(Self::parse_topdecls);
        }
        self.unsee(tok);
        self.parse_block(Self::parse_topdecls)
    }

    pub(crate) fn parse_topdecls(&mut self) -> PResult<Tree> {
        self.parse_semicolon_list(Self::parse_topdecl)
    }

    fn parse_topdecl(&mut self) -> PResult<Tree> {
        self.parse_decl()
    }

    pub(crate) fn parse_decls(&mut self) -> PResult<Tree> {
        self.parse_semicolon_list(Self::parse_decl)
    }

    /// `x :: type`
    fn parse_type_signature(&mut self) -> PResult<Tree> {
        let var = self.run(Self::parse_var)?;
        let tok = self.next()?;
        if tok.kind != TokenKind::HasType {
            return self.no_match(tok);
        }
        let ty = self.run(Self::parse_type)?;
        Ok(Tree::binary(AstTag::HasType, var, ty))
    }

    /// Right-hand side of a binding: `= exp` or guarded `| gs = exp …`.
    fn parse_rhs(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        if tok.kind == TokenKind::Equals {
            let expr = self.run(Self::parse_exp)?;
            let arm = Tree::binary(AstTag::Switch, Tree::list(Vec::new()), expr);
            return Ok(Tree::list(vec![arm]));
        }
        self.unsee(tok);
        self.parse_gdrhs()
    }

    fn parse_gdrhs(&mut self) -> PResult<Tree> {
        let guards = self.run(Self::parse_guards)?;
        let tok = self.next()?;
        if tok.kind != TokenKind::Equals {
            return self.no_match(tok);
        }
        let expr = self.run(Self::parse_exp)?;
        let rest = match self.attempt(Self::parse_gdrhs)? {
            Some(rest) => rest,
            None => Tree::list(Vec::new()),
        };
        Ok(Tree::binary(
            AstTag::Cons,
            Tree::binary(AstTag::Switch, guards, expr),
            rest,
        ))
    }

    /// One declaration: a fixity declaration, a type signature, or a value
    /// binding.
    pub(crate) fn parse_decl(&mut self) -> PResult<Tree> {
        let tok = self.next()?;
        let fixity_tag = match tok.kind {
            TokenKind::Infix => Some(AstTag::Infix),
            TokenKind::Infixl => Some(AstTag::Infixl),
            TokenKind::Infixr => Some(AstTag::Infixr),
            _ => None,
        };
        if let Some(tag) = fixity_tag {
            let prec = self.next()?;
            if prec.kind != TokenKind::Number {
                return self.no_match(prec);
            }
            let fixity = prec.number();
            let op = self.next()?;
            match op.kind {
                TokenKind::Oper => {
                    let name = op.qual_name();
                    if name.qualifier.is_some() {
                        return self.no_match(op);
                    }
                    Ok(Tree::unary_with(
                        tag,
                        Tree::name(name.name),
                        Payload::Int(fixity),
                    ))
                }
                TokenKind::Backtick => {
                    let name_tok = self.next()?;
                    if name_tok.kind != TokenKind::Name {
                        return self.no_match(name_tok);
                    }
                    let name = name_tok.qual_name();
                    if name.qualifier.is_some() {
                        return self.no_match(name_tok);
                    }
                    let close = self.next()?;
                    if close.kind != TokenKind::Backtick {
                        return self.no_match(close);
                    }
                    Ok(Tree::unary_with(
                        tag,
                        Tree::name(name.name),
                        Payload::Int(fixity),
                    ))
                }
                _ => self.no_match(op),
            }
        } else {
            self.unsee(tok);
            if let Some(sig) = self.attempt(Self::parse_type_signature)? {
                return Ok(sig);
            }
            let name = self.run(Self::parse_var)?;
            let mut pats = Vec::new();
            loop {
                match self.attempt(Self::parse_pat)? {
                    None => break,
                    Some(pat) => pats.push(pat),
                }
            }
            let rhs = self.run(Self::parse_rhs)?;
            Ok(Tree::ternary(AstTag::Binding, name, Tree::list(pats), rhs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_program_source(src: &str) -> Tree {
        Parser::new(src)
            .parse_program()
            .unwrap_or_else(|e| panic!("program parse failed for {:?}: {}", src, e))
    }

    fn single_decl(src: &str) -> Tree {
        let list = parse_program_source(src);
        let decls: Vec<_> = list.iter_list().collect();
        assert_eq!(decls.len(), 1, "expected one declaration in {:?}", src);
        decls[0].clone()
    }

    fn name_of(tree: &Tree) -> &'static str {
        match tree.payload() {
            Payload::Name(sym) => sym.as_str(),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_module_header_binding() {
        // module M where { x = 1 } elaborates to one BINDING(x, [], [SWITCH(NIL, NUMLIT 1)]).
        let decl = single_decl("module M where { x = 1 }");
        assert_eq!(decl.tag(), AstTag::Binding);
        assert_eq!(name_of(decl.child(0)), "x");
        assert_eq!(decl.child(1).tag(), AstTag::Nil);
        let arms: Vec<_> = decl.child(2).iter_list().collect();
        assert_eq!(arms.len(), 1);
        assert_eq!(arms[0].tag(), AstTag::Switch);
        assert_eq!(arms[0].child(0).tag(), AstTag::Nil);
        assert_eq!(arms[0].child(1).tag(), AstTag::NumLit);
        assert_eq!(arms[0].child(1).int(), 1);
    }

    #[test]
    fn test_module_header_with_layout() {
        let list = parse_program_source("module M where\n  x = 1\n  y = 2");
        let decls: Vec<_> = list.iter_list().collect();
        assert_eq!(decls.len(), 2);
    }

    #[test]
    fn test_binding_with_patterns() {
        // f x y = x
        let decl = single_decl("f x y = x");
        assert_eq!(decl.tag(), AstTag::Binding);
        assert_eq!(name_of(decl.child(0)), "f");
        let pats: Vec<_> = decl.child(1).iter_list().collect();
        assert_eq!(pats.len(), 2);
        assert_eq!(pats[0].tag(), AstTag::PatVar);
        assert_eq!(name_of(pats[0].child(0)), "x");
        let arms: Vec<_> = decl.child(2).iter_list().collect();
        assert_eq!(arms[0].child(1).tag(), AstTag::Var);
    }

    #[test]
    fn test_do_binding_layout() {
        // main = do / x <- m / return x
        let decl = single_decl("main = do\n  x <- m\n  return x");
        let arms: Vec<_> = decl.child(2).iter_list().collect();
        let body = arms[0].child(1);
        assert_eq!(body.tag(), AstTag::Do);
        let stmts: Vec<_> = body.child(0).iter_list().collect();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].tag(), AstTag::StmtBind);
        assert_eq!(stmts[0].child(0).tag(), AstTag::PatVar);
        assert_eq!(stmts[1].tag(), AstTag::Stmt);
        let apply = stmts[1].child(0);
        assert_eq!(apply.tag(), AstTag::Apply);
    }

    #[test]
    fn test_fixity_declaration() {
        let decl = single_decl("infixl 6 +");
        assert_eq!(decl.tag(), AstTag::Infixl);
        assert_eq!(decl.int(), 6);
        assert_eq!(name_of(decl.child(0)), "+");
    }

    #[test]
    fn test_fixity_backtick() {
        let decl = single_decl("infixr 5 `cons`");
        assert_eq!(decl.tag(), AstTag::Infixr);
        assert_eq!(decl.int(), 5);
        assert_eq!(name_of(decl.child(0)), "cons");
    }

    #[test]
    fn test_type_signature() {
        let decl = single_decl("f :: a -> a");
        assert_eq!(decl.tag(), AstTag::HasType);
        assert_eq!(name_of(decl.child(0)), "f");
        assert_eq!(decl.child(1).tag(), AstTag::TypeApply);
    }

    #[test]
    fn test_guarded_binding() {
        let decl = single_decl("f x | p x = 1 | q x = 2");
        let arms: Vec<_> = decl.child(2).iter_list().collect();
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0].child(0).iter_list().count(), 1);
    }

    #[test]
    fn test_operator_binding_via_parens() {
        let decl = single_decl("(+) x y = plus x y");
        assert_eq!(decl.tag(), AstTag::Binding);
        assert_eq!(name_of(decl.child(0)), "+");
    }

    #[test]
    fn test_layout_separated_declarations() {
        let list = parse_program_source("x = 1\ny = 2\nz = 3");
        assert_eq!(list.iter_list().count(), 3);
    }

    #[test]
    fn test_semicolon_runs_are_skipped() {
        let list = parse_program_source("x = 1 ;; y = 2 ;");
        assert_eq!(list.iter_list().count(), 2);
    }

    #[test]
    fn test_empty_program() {
        let list = parse_program_source("");
        assert_eq!(list.tag(), AstTag::Nil);
    }

    #[test]
    fn test_where_block_of_module_closes() {
        // Virtual module block must close cleanly at end of input.
        let list = parse_program_source("module Main where\n  main = x");
        assert_eq!(list.iter_list().count(), 1);
    }
}
