use super::{ast::*, lex, token::*, Column, Error};

type Result<T> = std::result::Result<T, Error>;

/// Parses one complete expression.
pub fn parse(s: &str) -> Result<Expression> {
    let tokens = lex(s);
    let mut parser = Parser::new(&tokens);
    let expr = match parser.expression() {
        Ok(expr) => expr,
        Err(e) => return Err(e.in_column(&parser.column())),
    };
    match parser.next() {
        None => Ok(expr),
        Some(t) => Err(error!(SyntaxError, ..&parser.column(); format!("UNEXPECTED {}", t))),
    }
}

/// Parses a comma separated list of expressions. Empty input is an empty list.
pub fn parse_list(s: &str) -> Result<Vec<Expression>> {
    let tokens = lex(s);
    let mut parser = Parser::new(&tokens);
    let mut v = vec![];
    if parser.peek().is_none() {
        return Ok(v);
    }
    loop {
        match parser.expression() {
            Ok(expr) => v.push(expr),
            Err(e) => return Err(e.in_column(&parser.column())),
        }
        match parser.next() {
            None => return Ok(v),
            Some(Token::Comma) => continue,
            Some(t) => {
                return Err(error!(SyntaxError, ..&parser.column(); format!("UNEXPECTED {}", t)))
            }
        }
    }
}

struct Parser<'a> {
    token_stream: std::slice::Iter<'a, Token>,
    peeked: Option<&'a Token>,
    col: Column,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser {
            token_stream: tokens.iter(),
            peeked: None,
            col: 0..0,
        }
    }

    fn column(&self) -> Column {
        self.col.clone()
    }

    fn next(&mut self) -> Option<&'a Token> {
        if self.peeked.is_some() {
            return self.peeked.take();
        }
        loop {
            self.col.start = self.col.end;
            let t = self.token_stream.next()?;
            self.col.end += t.to_string().chars().count();
            match t {
                Token::Whitespace(_) => continue,
                _ => return Some(t),
            }
        }
    }

    fn peek(&mut self) -> Option<&'a Token> {
        if self.peeked.is_none() {
            self.peeked = self.next();
        }
        self.peeked
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        match self.next() {
            Some(t) if t == token => Ok(()),
            _ => Err(error!(SyntaxError; format!("EXPECTED {}", token))),
        }
    }

    fn expression(&mut self) -> Result<Expression> {
        fn parse(this: &mut Parser, precedence: usize) -> Result<Expression> {
            let mut lhs = match this.next() {
                Some(Token::LParen) => {
                    let expr = this.expression()?;
                    this.expect(&Token::RParen)?;
                    expr
                }
                Some(Token::LBracket) => Expression::List(this.items(&Token::RBracket)?),
                Some(Token::Operator(Operator::Minus)) => {
                    Expression::Negate(Box::new(parse(this, 7)?))
                }
                Some(Token::Operator(Operator::Plus)) => parse(this, 7)?,
                Some(Token::Operator(Operator::Not)) => Expression::Not(Box::new(parse(this, 4)?)),
                Some(Token::Integer(s)) => match s.parse::<i64>() {
                    Ok(n) => Expression::Integer(n),
                    Err(_) => Expression::Float(this.float(s)?),
                },
                Some(Token::Float(s)) => Expression::Float(this.float(s)?),
                Some(Token::String(s)) => Expression::String(s.clone()),
                Some(Token::SysVar(s)) => Expression::SysVar(s.clone()),
                Some(Token::Ident(name)) => this.ident(name)?,
                _ => return Err(error!(SyntaxError; "EXPECTED EXPRESSION")),
            };
            while let Some(Token::Operator(op)) = this.peek() {
                let op = *op;
                if op == Operator::Not {
                    break;
                }
                let op_precedence = op.precedence();
                if op_precedence < precedence {
                    break;
                }
                this.next();
                let next_precedence = if op == Operator::Caret {
                    op_precedence
                } else {
                    op_precedence + 1
                };
                let rhs = parse(this, next_precedence)?;
                lhs = Expression::binary(op, lhs, rhs);
            }
            Ok(lhs)
        }
        parse(self, 0)
    }

    fn float(&self, s: &str) -> Result<f64> {
        match s.parse::<f64>() {
            Ok(n) => Ok(n),
            Err(_) => Err(error!(SyntaxError; format!("BAD NUMBER {}", s))),
        }
    }

    fn ident(&mut self, name: &str) -> Result<Expression> {
        let upper = name.to_ascii_uppercase();
        match self.peek() {
            Some(Token::LParen) => {
                self.next();
                Ok(Expression::Call(upper, self.items(&Token::RParen)?))
            }
            Some(Token::LBracket) => {
                self.next();
                let index = self.expression()?;
                self.expect(&Token::RBracket)?;
                Ok(Expression::Subscript(upper, Box::new(index)))
            }
            Some(Token::Dot) => {
                self.next();
                match self.next() {
                    Some(Token::Ident(key)) | Some(Token::Integer(key)) => {
                        Ok(Expression::Field(upper, key.clone()))
                    }
                    _ => Err(error!(SyntaxError; "EXPECTED KEY")),
                }
            }
            _ => Ok(Expression::Var(upper)),
        }
    }

    fn items(&mut self, close: &Token) -> Result<Vec<Expression>> {
        let mut v: Vec<Expression> = vec![];
        if self.peek() == Some(close) {
            self.next();
            return Ok(v);
        }
        loop {
            v.push(self.expression()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(t) if t == close => return Ok(v),
                _ => return Err(error!(SyntaxError; format!("EXPECTED {}", close))),
            }
        }
    }
}
