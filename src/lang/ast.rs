use super::token::Operator;

/// Expression tree. Names are stored upper-cased; dictionary keys keep
/// the case they were written in.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Integer(i64),
    Float(f64),
    String(String),
    Var(String),
    SysVar(String),
    /// `NAME(args)`: built-in, user function, lambda or array element.
    Call(String, Vec<Expression>),
    /// `NAME[index]`
    Subscript(String, Box<Expression>),
    /// `NAME.key`
    Field(String, String),
    List(Vec<Expression>),
    Negate(Box<Expression>),
    Not(Box<Expression>),
    Binary(Operator, Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn binary(op: Operator, lhs: Expression, rhs: Expression) -> Expression {
        Expression::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Bare variable name, if this expression is nothing more.
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Expression::Var(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Expression::*;
        match self {
            Integer(n) => write!(f, "{}", n),
            Float(n) => write!(f, "{}", n),
            String(s) => write!(f, "\"{}\"", s),
            Var(s) => write!(f, "{}", s),
            SysVar(s) => write!(f, "%{}%", s),
            Call(name, args) => {
                let args: Vec<std::string::String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", name, args.join(", "))
            }
            Subscript(name, index) => write!(f, "{}[{}]", name, index),
            Field(name, key) => write!(f, "{}.{}", name, key),
            List(items) => {
                let items: Vec<std::string::String> = items.iter().map(|a| a.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Negate(e) => write!(f, "-{}", e),
            Not(e) => write!(f, "NOT {}", e),
            Binary(op, l, r) => write!(f, "({} {} {})", l, op, r),
        }
    }
}
