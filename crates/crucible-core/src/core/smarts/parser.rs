use super::{AtomExpr, AtomPrimitive, PatternNode};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmartsParseError {
    #[error("empty pattern")]
    Empty,
    #[error("unexpected end of pattern")]
    UnexpectedEnd,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("invalid numeric value at position {pos}")]
    InvalidNumber { pos: usize },
}

pub(super) fn parse(input: &str) -> Result<PatternNode, SmartsParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SmartsParseError::Empty);
    }
    let mut parser = Parser {
        input: trimmed.as_bytes(),
        pos: 0,
    };
    let node = parser.parse_node()?;
    if parser.pos != parser.input.len() {
        return Err(parser.unexpected());
    }
    Ok(node)
}

/// Byte-cursor recursive-descent parser over the pattern subset.
struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, byte: u8) -> Result<(), SmartsParseError> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.unexpected()),
            None => Err(SmartsParseError::UnexpectedEnd),
        }
    }

    fn unexpected(&self) -> SmartsParseError {
        match self.peek() {
            Some(b) => SmartsParseError::UnexpectedChar {
                ch: b as char,
                pos: self.pos,
            },
            None => SmartsParseError::UnexpectedEnd,
        }
    }

    fn parse_node(&mut self) -> Result<PatternNode, SmartsParseError> {
        let expr = self.parse_atom()?;
        let mut children = Vec::new();
        loop {
            self.skip_bond_symbols();
            match self.peek() {
                Some(b'(') => {
                    self.bump();
                    self.skip_bond_symbols();
                    let child = self.parse_node()?;
                    self.expect(b')')?;
                    children.push(child);
                }
                Some(b')') | None => break,
                Some(_) if self.at_atom_start() => {
                    // Linear chain: the remainder hangs off this atom.
                    children.push(self.parse_node()?);
                    break;
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(PatternNode { expr, children })
    }

    fn parse_atom(&mut self) -> Result<AtomExpr, SmartsParseError> {
        match self.peek() {
            Some(b'[') => {
                self.bump();
                let expr = self.parse_or()?;
                self.expect(b']')?;
                Ok(expr)
            }
            Some(b'*') => {
                self.bump();
                Ok(AtomExpr::Prim(AtomPrimitive::Wildcard))
            }
            Some(b'#') if self.digit_at(1) => {
                self.bump();
                let pos = self.pos;
                let n = self.parse_number(pos)?;
                Ok(AtomExpr::Prim(AtomPrimitive::AtomicNum(n)))
            }
            Some(b) if b.is_ascii_uppercase() || b == b'_' => {
                let symbol = self.parse_element_symbol()?;
                Ok(AtomExpr::Prim(AtomPrimitive::Element(symbol)))
            }
            Some(_) => Err(self.unexpected()),
            None => Err(SmartsParseError::UnexpectedEnd),
        }
    }

    fn parse_or(&mut self) -> Result<AtomExpr, SmartsParseError> {
        let mut alternatives = vec![self.parse_and()?];
        while self.peek() == Some(b',') {
            self.bump();
            alternatives.push(self.parse_and()?);
        }
        if alternatives.len() == 1 {
            Ok(alternatives.pop().unwrap())
        } else {
            Ok(AtomExpr::Or(alternatives))
        }
    }

    fn parse_and(&mut self) -> Result<AtomExpr, SmartsParseError> {
        let mut terms = vec![self.parse_unary()?];
        loop {
            match self.peek() {
                Some(b';') | Some(b'&') => {
                    self.bump();
                    terms.push(self.parse_unary()?);
                }
                // Juxtaposition is also a conjunction inside brackets.
                Some(_) if self.at_primitive_start() => terms.push(self.parse_unary()?),
                _ => break,
            }
        }
        if terms.len() == 1 {
            Ok(terms.pop().unwrap())
        } else {
            Ok(AtomExpr::And(terms))
        }
    }

    fn parse_unary(&mut self) -> Result<AtomExpr, SmartsParseError> {
        if self.peek() == Some(b'!') {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(AtomExpr::Not(Box::new(inner)));
        }
        self.parse_primitive()
    }

    fn parse_primitive(&mut self) -> Result<AtomExpr, SmartsParseError> {
        match self.peek() {
            Some(b'*') => {
                self.bump();
                Ok(AtomExpr::Prim(AtomPrimitive::Wildcard))
            }
            Some(b'#') => {
                self.bump();
                let pos = self.pos;
                let n = self.parse_number(pos)?;
                Ok(AtomExpr::Prim(AtomPrimitive::AtomicNum(n)))
            }
            Some(b'X') if self.digit_at(1) => {
                self.bump();
                let pos = self.pos;
                let n = self.parse_number(pos)?;
                Ok(AtomExpr::Prim(AtomPrimitive::Degree(n)))
            }
            Some(b'H') if self.digit_at(1) => {
                self.bump();
                let pos = self.pos;
                let n = self.parse_number(pos)?;
                Ok(AtomExpr::Prim(AtomPrimitive::HCount(n)))
            }
            Some(b) if b.is_ascii_uppercase() || b == b'_' => {
                let symbol = self.parse_element_symbol()?;
                Ok(AtomExpr::Prim(AtomPrimitive::Element(symbol)))
            }
            Some(_) => Err(self.unexpected()),
            None => Err(SmartsParseError::UnexpectedEnd),
        }
    }

    /// An element symbol: one uppercase letter plus an optional lowercase
    /// letter, or an underscore-prefixed custom symbol (`_CH4`).
    fn parse_element_symbol(&mut self) -> Result<String, SmartsParseError> {
        match self.peek() {
            Some(b'_') => {
                let start = self.pos;
                self.bump();
                while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric()) {
                    self.bump();
                }
                if self.pos - start < 2 {
                    return Err(self.unexpected());
                }
                Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
            }
            Some(b) if b.is_ascii_uppercase() => {
                let start = self.pos;
                self.bump();
                if matches!(self.peek(), Some(c) if c.is_ascii_lowercase()) {
                    self.bump();
                }
                Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
            }
            Some(_) => Err(self.unexpected()),
            None => Err(SmartsParseError::UnexpectedEnd),
        }
    }

    fn parse_number(&mut self, start: usize) -> Result<u8, SmartsParseError> {
        let begin = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.bump();
        }
        if self.pos == begin {
            return Err(SmartsParseError::InvalidNumber { pos: start });
        }
        std::str::from_utf8(&self.input[begin..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(SmartsParseError::InvalidNumber { pos: start })
    }

    fn digit_at(&self, offset: usize) -> bool {
        matches!(self.peek_at(offset), Some(b) if b.is_ascii_digit())
    }

    fn at_atom_start(&self) -> bool {
        match self.peek() {
            Some(b'[') | Some(b'*') | Some(b'_') => true,
            Some(b'#') => self.digit_at(1),
            Some(b) => b.is_ascii_uppercase(),
            None => false,
        }
    }

    fn at_primitive_start(&self) -> bool {
        match self.peek() {
            Some(b'*') | Some(b'#') | Some(b'!') | Some(b'_') => true,
            Some(b) => b.is_ascii_uppercase(),
            None => false,
        }
    }

    /// Explicit bond symbols are accepted but carry no constraint: bonded
    /// connectivity is what the pattern tree already encodes. A `#` is a
    /// bond symbol only when no digit follows (otherwise it starts an
    /// atomic-number atom).
    fn skip_bond_symbols(&mut self) {
        loop {
            match self.peek() {
                Some(b'-') | Some(b'=') | Some(b':') | Some(b'~') => {
                    self.bump();
                }
                Some(b'#') if !self.digit_at(1) => {
                    self.bump();
                }
                _ => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prim(p: AtomPrimitive) -> AtomExpr {
        AtomExpr::Prim(p)
    }

    #[test]
    fn parses_bare_elements_and_chains() {
        let node = parse("CCO").unwrap();
        assert_eq!(node.expr, prim(AtomPrimitive::Element("C".into())));
        assert_eq!(node.children.len(), 1);
        let second = &node.children[0];
        assert_eq!(second.expr, prim(AtomPrimitive::Element("C".into())));
        assert_eq!(
            second.children[0].expr,
            prim(AtomPrimitive::Element("O".into()))
        );
    }

    #[test]
    fn parses_two_letter_elements() {
        let node = parse("Cl").unwrap();
        assert_eq!(node.expr, prim(AtomPrimitive::Element("Cl".into())));
        assert!(node.children.is_empty());
    }

    #[test]
    fn parses_bracket_conjunction() {
        let node = parse("[C;X4]").unwrap();
        assert_eq!(
            node.expr,
            AtomExpr::And(vec![
                prim(AtomPrimitive::Element("C".into())),
                prim(AtomPrimitive::Degree(4)),
            ])
        );
    }

    #[test]
    fn parses_branches() {
        let node = parse("[C;X4](C)(H)(H)H").unwrap();
        assert_eq!(node.children.len(), 4);
    }

    #[test]
    fn parses_negation_and_alternation() {
        let node = parse("[!H]").unwrap();
        assert_eq!(
            node.expr,
            AtomExpr::Not(Box::new(prim(AtomPrimitive::Element("H".into()))))
        );

        let node = parse("[C,N,O]").unwrap();
        match node.expr {
            AtomExpr::Or(items) => assert_eq!(items.len(), 3),
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn parses_atomic_number_and_counts() {
        let node = parse("[#6;H2]").unwrap();
        assert_eq!(
            node.expr,
            AtomExpr::And(vec![
                prim(AtomPrimitive::AtomicNum(6)),
                prim(AtomPrimitive::HCount(2)),
            ])
        );
    }

    #[test]
    fn hydrogen_without_digit_is_an_element() {
        let node = parse("[H]").unwrap();
        assert_eq!(node.expr, prim(AtomPrimitive::Element("H".into())));
    }

    #[test]
    fn parses_custom_elements() {
        let node = parse("[_CH4]").unwrap();
        assert_eq!(node.expr, prim(AtomPrimitive::Element("_CH4".into())));
    }

    #[test]
    fn accepts_and_ignores_bond_symbols() {
        let node = parse("C-C=O").unwrap();
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].children.len(), 1);
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert_eq!(parse(""), Err(SmartsParseError::Empty));
        assert!(matches!(parse("["), Err(SmartsParseError::UnexpectedEnd)));
        assert!(matches!(
            parse("[C"),
            Err(SmartsParseError::UnexpectedEnd)
        ));
        assert!(matches!(
            parse("C)"),
            Err(SmartsParseError::UnexpectedChar { ch: ')', .. })
        ));
        assert!(matches!(
            parse("[C;]"),
            Err(SmartsParseError::UnexpectedChar { .. })
        ));
    }

    #[test]
    fn juxtaposition_inside_brackets_is_conjunction() {
        let node = parse("[CX4]").unwrap();
        assert_eq!(
            node.expr,
            AtomExpr::And(vec![
                prim(AtomPrimitive::Element("C".into())),
                prim(AtomPrimitive::Degree(4)),
            ])
        );
    }
}
