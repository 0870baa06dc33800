use super::token::*;

/// Splits one expression into tokens. Never fails; anything unrecognized
/// becomes `Token::Unknown` and the parser reports it.
pub fn lex(s: &str) -> Vec<Token> {
    ExprLexer::lex(s)
}

fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

trait Tokenizers<'a> {
    fn chars(&mut self) -> &mut std::iter::Peekable<std::str::Chars<'a>>;

    fn whitespace(&mut self) -> Token {
        let mut len = 0;
        while let Some(pk) = self.chars().peek() {
            if !is_whitespace(*pk) {
                break;
            }
            self.chars().next();
            len += 1;
        }
        Token::Whitespace(len)
    }

    fn number(&mut self) -> Token {
        let mut s = String::new();
        let mut float = false;
        while let Some(&ch) = self.chars().peek() {
            if ch.is_ascii_digit() {
                s.push(ch);
            } else if ch == '.' && !float {
                float = true;
                s.push(ch);
            } else if ch == 'e' || ch == 'E' {
                let mut ahead = self.chars().clone();
                ahead.next();
                let exp_ok = match ahead.next() {
                    Some(d) if d.is_ascii_digit() => true,
                    Some('+') | Some('-') => matches!(ahead.next(), Some(d) if d.is_ascii_digit()),
                    _ => false,
                };
                if !exp_ok {
                    break;
                }
                float = true;
                s.push('E');
                self.chars().next();
                if let Some(&sign) = self.chars().peek() {
                    if sign == '+' || sign == '-' {
                        s.push(sign);
                        self.chars().next();
                    }
                }
                continue;
            } else {
                break;
            }
            self.chars().next();
        }
        if float {
            Token::Float(s)
        } else {
            Token::Integer(s)
        }
    }

    fn string(&mut self) -> Token {
        let quote = match self.chars().next() {
            Some(q) => q,
            None => return Token::Unknown(String::new()),
        };
        let mut s = String::new();
        for ch in self.chars().by_ref() {
            if ch == quote {
                break;
            }
            s.push(ch);
        }
        Token::String(s)
    }

    fn word(&mut self) -> Token {
        let mut s = String::new();
        while let Some(&ch) = self.chars().peek() {
            if !is_ident_char(ch) {
                break;
            }
            s.push(ch);
            self.chars().next();
        }
        if let Some('$') = self.chars().peek() {
            s.push('$');
            self.chars().next();
        }
        match Token::from_word(&s) {
            Some(t) => t,
            None => Token::Ident(s),
        }
    }

    fn percent(&mut self) -> Token {
        self.chars().next();
        let mut ahead = self.chars().clone();
        let mut name = String::new();
        while let Some(&ch) = ahead.peek() {
            if !is_ident_char(ch) {
                break;
            }
            name.push(ch);
            ahead.next();
        }
        if !name.is_empty() && ahead.peek() == Some(&'%') {
            for _ in 0..=name.len() {
                self.chars().next();
            }
            return Token::SysVar(name.to_ascii_lowercase());
        }
        Token::Operator(Operator::Modulo)
    }

    fn symbol(&mut self) -> Token {
        let ch = match self.chars().next() {
            Some(c) => c,
            None => return Token::Unknown(String::new()),
        };
        let single = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ',' => Some(Token::Comma),
            '.' => Some(Token::Dot),
            ':' => Some(Token::Colon),
            _ => None,
        };
        if let Some(t) = single {
            return t;
        }
        let mut s = ch.to_string();
        if let Some(&next) = self.chars().peek() {
            let pair = format!("{}{}", ch, next);
            if Operator::from_symbol(&pair).is_some() {
                s = pair;
                self.chars().next();
            }
        }
        match Operator::from_symbol(&s) {
            Some(op) => Token::Operator(op),
            None => Token::Unknown(s),
        }
    }
}

struct ExprLexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Tokenizers<'a> for ExprLexer<'a> {
    fn chars(&mut self) -> &mut std::iter::Peekable<std::str::Chars<'a>> {
        &mut self.chars
    }
}

impl<'a> ExprLexer<'a> {
    fn lex(s: &'a str) -> Vec<Token> {
        let mut lexer = ExprLexer {
            chars: s.chars().peekable(),
        };
        let mut tokens = vec![];
        while let Some(&pk) = lexer.chars.peek() {
            let token = if is_whitespace(pk) {
                lexer.whitespace()
            } else if pk.is_ascii_digit() || (pk == '.' && lexer.digit_follows()) {
                lexer.number()
            } else if pk == '"' || pk == '\'' {
                lexer.string()
            } else if is_ident_start(pk) {
                lexer.word()
            } else if pk == '%' {
                lexer.percent()
            } else {
                lexer.symbol()
            };
            tokens.push(token);
        }
        tokens
    }

    fn digit_follows(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();
        matches!(ahead.next(), Some(d) if d.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        assert_eq!(lex("12"), vec![Token::Integer("12".into())]);
        assert_eq!(lex(".5"), vec![Token::Float(".5".into())]);
        assert_eq!(lex("1e3"), vec![Token::Float("1E3".into())]);
    }

    #[test]
    fn test_word_operators_and_idents() {
        assert_eq!(
            lex("a mod B$"),
            vec![
                Token::Ident("a".into()),
                Token::Whitespace(1),
                Token::Operator(Operator::Modulo),
                Token::Whitespace(1),
                Token::Ident("B$".into()),
            ]
        );
    }

    #[test]
    fn test_percent_is_sysvar_or_modulo() {
        assert_eq!(lex("%answer%"), vec![Token::SysVar("answer".into())]);
        assert_eq!(
            lex("7%2"),
            vec![
                Token::Integer("7".into()),
                Token::Operator(Operator::Modulo),
                Token::Integer("2".into()),
            ]
        );
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            lex("<>=="),
            vec![
                Token::Operator(Operator::NotEqual),
                Token::Operator(Operator::Equal),
            ]
        );
    }

    #[test]
    fn test_single_quoted_string() {
        assert_eq!(lex("'{\"a\":1}'"), vec![Token::String("{\"a\":1}".into())]);
    }
}
