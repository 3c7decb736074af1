use crate::ast::{Expr, Literal};
use crate::lexer::{tokenize, Token};

pub fn parse(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    parser.expect(&Token::Eof)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected {expected}, found {}", self.peek()))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        while *self.peek() == Token::Or {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_not()?;
        while *self.peek() == Token::And {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if *self.peek() == Token::Not {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, String> {
        if *self.peek() == Token::LParen {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let path = self.parse_path()?;

        match self.advance() {
            Token::Eq => {
                let literal = self.parse_literal()?;
                Ok(Expr::Eq(path, literal))
            }
            Token::Neq => {
                let literal = self.parse_literal()?;
                Ok(Expr::Neq(path, literal))
            }
            Token::In => {
                self.expect(&Token::LBracket)?;
                let mut literals = vec![self.parse_literal()?];
                while *self.peek() == Token::Comma {
                    self.advance();
                    literals.push(self.parse_literal()?);
                }
                self.expect(&Token::RBracket)?;
                Ok(Expr::In(path, literals))
            }
            other => Err(format!("expected `==`, `!=` or `in`, found {other}")),
        }
    }

    fn parse_path(&mut self) -> Result<Vec<String>, String> {
        let mut segments = vec![self.parse_ident()?];
        while *self.peek() == Token::Dot {
            self.advance();
            segments.push(self.parse_ident()?);
        }
        Ok(segments)
    }

    fn parse_ident(&mut self) -> Result<String, String> {
        match self.advance() {
            Token::Ident(name) => Ok(name),
            other => Err(format!("expected a path segment, found {other}")),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, String> {
        match self.advance() {
            Token::Str(s) => Ok(Literal::Str(s)),
            Token::Int(n) => Ok(Literal::Int(n)),
            Token::True => Ok(Literal::Bool(true)),
            Token::False => Ok(Literal::Bool(false)),
            Token::Null => Ok(Literal::Null),
            other => Err(format!("expected a literal, found {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_equality() {
        let expr = parse("source == 'orgA'").unwrap();
        assert_eq!(
            expr,
            Expr::Eq(vec!["source".into()], Literal::Str("orgA".into()))
        );
    }

    #[test]
    fn parses_nested_path() {
        let expr = parse("data.payload.Type != null").unwrap();
        assert_eq!(
            expr,
            Expr::Neq(
                vec!["data".into(), "payload".into(), "Type".into()],
                Literal::Null
            )
        );
    }

    #[test]
    fn parses_membership() {
        let expr = parse("data.payload.Type in ['Account', 'Contact']").unwrap();
        assert_eq!(
            expr,
            Expr::In(
                vec!["data".into(), "payload".into(), "Type".into()],
                vec![
                    Literal::Str("Account".into()),
                    Literal::Str("Contact".into())
                ]
            )
        );
    }

    #[test]
    fn respects_and_or_not_precedence() {
        // `not` binds tighter than `and`, which binds tighter than `or`.
        let expr = parse("a == 1 or b == 2 and not c == 3").unwrap();
        let expected = Expr::Or(
            Box::new(Expr::Eq(vec!["a".into()], Literal::Int(1))),
            Box::new(Expr::And(
                Box::new(Expr::Eq(vec!["b".into()], Literal::Int(2))),
                Box::new(Expr::Not(Box::new(Expr::Eq(
                    vec!["c".into()],
                    Literal::Int(3),
                )))),
            )),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn parens_override_precedence() {
        let expr = parse("(a == 1 or b == 2) and c == 3").unwrap();
        let expected = Expr::And(
            Box::new(Expr::Or(
                Box::new(Expr::Eq(vec!["a".into()], Literal::Int(1))),
                Box::new(Expr::Eq(vec!["b".into()], Literal::Int(2))),
            )),
            Box::new(Expr::Eq(vec!["c".into()], Literal::Int(3))),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn rejects_malformed_expression() {
        assert!(parse("source ==").is_err());
        assert!(parse("source == 'a' and").is_err());
        assert!(parse("(source == 'a'").is_err());
    }
}
