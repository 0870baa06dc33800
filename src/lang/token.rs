#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Unknown(String),
    Whitespace(usize),
    Integer(String),
    Float(String),
    String(String),
    Ident(String),
    SysVar(String),
    Operator(Operator),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
}

impl Token {
    /// Word operators are recognized regardless of case.
    pub fn from_word(s: &str) -> Option<Token> {
        let op = match s.to_ascii_uppercase().as_str() {
            "MOD" => Operator::Modulo,
            "AND" => Operator::And,
            "OR" => Operator::Or,
            "XOR" => Operator::Xor,
            "NOT" => Operator::Not,
            _ => return None,
        };
        Some(Token::Operator(op))
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Token::*;
        match self {
            Unknown(s) => write!(f, "{}", s),
            Whitespace(u) => write!(f, "{s:>w$}", s = "", w = u),
            Integer(s) | Float(s) => write!(f, "{}", s),
            String(s) => write!(f, "\"{}\"", s),
            Ident(s) => write!(f, "{}", s),
            SysVar(s) => write!(f, "%{}%", s),
            Operator(s) => write!(f, "{}", s),
            LParen => write!(f, "("),
            RParen => write!(f, ")"),
            LBracket => write!(f, "["),
            RBracket => write!(f, "]"),
            Comma => write!(f, ","),
            Dot => write!(f, "."),
            Colon => write!(f, ":"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operator {
    Caret,
    Multiply,
    Divide,
    DivideInt,
    Modulo,
    Plus,
    Minus,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Not,
    And,
    Or,
    Xor,
}

impl Operator {
    pub fn from_symbol(s: &str) -> Option<Operator> {
        use Operator::*;
        Some(match s {
            "^" => Caret,
            "*" => Multiply,
            "/" => Divide,
            "\\" => DivideInt,
            "%" => Modulo,
            "+" => Plus,
            "-" => Minus,
            "=" | "==" => Equal,
            "<>" | "!=" => NotEqual,
            "<" => Less,
            "<=" => LessEqual,
            ">" => Greater,
            ">=" => GreaterEqual,
            _ => return None,
        })
    }

    /// Binding power for precedence climbing; unary operators bind on their own.
    pub fn precedence(&self) -> usize {
        use Operator::*;
        match self {
            Or | Xor => 1,
            And => 2,
            Not => 3,
            Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual => 4,
            Plus | Minus => 5,
            Multiply | Divide | DivideInt | Modulo => 6,
            Caret => 8,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Operator::*;
        let s = match self {
            Caret => "^",
            Multiply => "*",
            Divide => "/",
            DivideInt => "\\",
            Modulo => "MOD",
            Plus => "+",
            Minus => "-",
            Equal => "=",
            NotEqual => "<>",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Not => "NOT",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
        };
        write!(f, "{}", s)
    }
}
