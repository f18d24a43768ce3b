//! Human-readable AST dump.
//!
//! One node per line, children indented two spaces below their parent,
//! payloads inline after the tag label. This is what the driver prints on
//! a successful parse.
//!
//! ```text
//! BINDING
//!   NAME f
//!   CONS
//!     PAT_VAR
//!       NAME x
//!   …
//! ```

use std::fmt;

use crate::ast::{AstTag, Payload, Tree};

impl Tree {
    /// Display adapter producing the indented dump.
    pub fn dump(&self) -> Dump<'_> {
        Dump { root: self }
    }
}

/// See [`Tree::dump`].
pub struct Dump<'a> {
    root: &'a Tree,
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self.root, 0)
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, tree: &Tree, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("  ")?;
    }
    let label = tree.tag().label();
    match (tree.tag(), tree.payload()) {
        (AstTag::CharLit | AstTag::PatCharLit, Payload::Int(n)) => {
            write_char(f, label, *n)?;
        }
        (AstTag::StrLit | AstTag::PatStrLit, Payload::Str(bytes)) => {
            write!(f, "{} \"", label)?;
            for &b in bytes {
                write_byte(f, b)?;
            }
            f.write_str("\"")?;
        }
        (_, Payload::Int(n)) => write!(f, "{} {}", label, n)?,
        (_, Payload::Name(name)) => write!(f, "{} {}", label, name)?,
        (_, Payload::Qual(name)) => write!(f, "{} {}", label, name)?,
        (_, Payload::None) => f.write_str(label)?,
        (_, Payload::Str(_)) => unreachable!("string payloads only occur on literals"),
    }
    writeln!(f)?;
    for child in tree.children() {
        write_node(f, child, depth + 1)?;
    }
    Ok(())
}

fn write_char(f: &mut fmt::Formatter<'_>, label: &str, value: u64) -> fmt::Result {
    match u8::try_from(value) {
        Ok(b) if (0x20..0x7f).contains(&b) => write!(f, "{} '{}'", label, b as char),
        _ => write!(f, "{} '\\x{:02x}'", label, value),
    }
}

fn write_byte(f: &mut fmt::Formatter<'_>, b: u8) -> fmt::Result {
    match b {
        b'"' => f.write_str("\\\""),
        b'\\' => f.write_str("\\\\"),
        0x20..=0x7e => write!(f, "{}", b as char),
        b'\n' => f.write_str("\\n"),
        b'\t' => f.write_str("\\t"),
        _ => write!(f, "\\x{:02x}", b),
    }
}

#[cfg(test)]
mod tests {
    use crate::Parser;

    fn dump_of(src: &str) -> String {
        let tree = Parser::new(src).parse_program().expect("parse failure");
        tree.dump().to_string()
    }

    #[test]
    fn test_dump_binding() {
        let text = dump_of("module M where { x = 1 }");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "CONS");
        assert_eq!(lines[1], "  BINDING");
        assert_eq!(lines[2], "    NAME x");
        assert!(lines.contains(&"        NUMLIT 1"));
    }

    #[test]
    fn test_dump_two_space_indent() {
        let text = dump_of("x = y");
        for line in text.lines() {
            let leading = line.len() - line.trim_start().len();
            assert_eq!(leading % 2, 0, "odd indent in {:?}", line);
        }
    }

    #[test]
    fn test_dump_fixity_and_literals() {
        let text = dump_of("infixl 6 +");
        assert!(text.contains("INFIXL 6"));
        assert!(text.contains("NAME +"));

        let text = dump_of("s = \"a\\nb\"");
        assert!(text.contains("STRLIT \"a\\nb\""));

        let text = dump_of("c = 'q'");
        assert!(text.contains("CHARLIT 'q'"));
    }

    #[test]
    fn test_dump_qualified_name() {
        let text = dump_of("y = Data.Map.empty");
        assert!(text.contains("QUALNAME Data.Map.empty"));
    }
}
