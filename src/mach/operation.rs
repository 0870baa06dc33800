use super::val::repeat_text;
use super::Val;
use crate::error;
use crate::lang::{Error, Operator};
use std::cmp::Ordering;

type Result<T> = std::result::Result<T, Error>;

/// ## Operators
///
/// Integer arithmetic that overflows falls back to floating point.
/// Comparisons and logic produce 1 or 0.

pub struct Operation {}

enum Num {
    Int(i64),
    Float(f64),
}

fn num(val: &Val) -> Result<Num> {
    match val {
        Val::Integer(n) => Ok(Num::Int(*n)),
        Val::Null => Ok(Num::Int(0)),
        _ => Ok(Num::Float(val.to_f64()?)),
    }
}

fn arith(
    lhs: &Val,
    rhs: &Val,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Val> {
    use Num::*;
    Ok(match (num(lhs)?, num(rhs)?) {
        (Int(l), Int(r)) => match int_op(l, r) {
            Some(i) => Val::Integer(i),
            None => Val::Float(float_op(l as f64, r as f64)),
        },
        (Int(l), Float(r)) => Val::Float(float_op(l as f64, r)),
        (Float(l), Int(r)) => Val::Float(float_op(l, r as f64)),
        (Float(l), Float(r)) => Val::Float(float_op(l, r)),
    })
}

impl Operation {
    pub fn binary(op: Operator, lhs: Val, rhs: Val) -> Result<Val> {
        use Operator::*;
        match op {
            Caret => Operation::power(lhs, rhs),
            Multiply => Operation::multiply(lhs, rhs),
            Divide => Operation::divide(lhs, rhs),
            DivideInt => Operation::divide_int(lhs, rhs),
            Modulo => Operation::modulo(lhs, rhs),
            Plus => Operation::sum(lhs, rhs),
            Minus => Operation::subtract(lhs, rhs),
            Equal => Ok(Val::bool(Operation::equal(&lhs, &rhs))),
            NotEqual => Ok(Val::bool(!Operation::equal(&lhs, &rhs))),
            Less => Ok(Val::bool(Operation::compare(&lhs, &rhs)? == Ordering::Less)),
            LessEqual => Ok(Val::bool(Operation::compare(&lhs, &rhs)? != Ordering::Greater)),
            Greater => Ok(Val::bool(Operation::compare(&lhs, &rhs)? == Ordering::Greater)),
            GreaterEqual => Ok(Val::bool(Operation::compare(&lhs, &rhs)? != Ordering::Less)),
            And => Ok(Val::bool(lhs.is_truthy() && rhs.is_truthy())),
            Or => Ok(Val::bool(lhs.is_truthy() || rhs.is_truthy())),
            Xor => Ok(Val::bool(lhs.is_truthy() != rhs.is_truthy())),
            Not => Err(error!(InternalError; "NOT IS UNARY")),
        }
    }

    pub fn negate(val: Val) -> Result<Val> {
        use Val::*;
        match val {
            Integer(n) => match n.checked_neg() {
                Some(i) => Ok(Integer(i)),
                None => Ok(Float(-(n as f64))),
            },
            Float(n) => Ok(Float(-n)),
            Null => Ok(Integer(0)),
            String(_) => Ok(Float(-val.to_f64()?)),
            List(_) | Dict(_) => Err(error!(TypeMismatch)),
        }
    }

    pub fn not(val: Val) -> Val {
        Val::bool(!val.is_truthy())
    }

    /// Text on either side concatenates; two lists join.
    pub fn sum(lhs: Val, rhs: Val) -> Result<Val> {
        use Val::*;
        match lhs {
            String(l) => Ok(String(l + &rhs.to_string())),
            List(mut l) => match rhs {
                List(r) => {
                    l.extend(r);
                    Ok(List(l))
                }
                _ => Err(error!(TypeMismatch)),
            },
            Dict(_) => Err(error!(TypeMismatch)),
            _ => match rhs {
                String(r) => Ok(String(lhs.to_string() + &r)),
                List(_) | Dict(_) => Err(error!(TypeMismatch)),
                _ => arith(&lhs, &rhs, i64::checked_add, |l, r| l + r),
            },
        }
    }

    pub fn subtract(lhs: Val, rhs: Val) -> Result<Val> {
        arith(&lhs, &rhs, i64::checked_sub, |l, r| l - r)
    }

    /// Text times a count repeats the text.
    pub fn multiply(lhs: Val, rhs: Val) -> Result<Val> {
        use Val::*;
        match (&lhs, &rhs) {
            (String(s), Integer(n)) | (Integer(n), String(s)) => Ok(String(repeat_text(s, *n)?)),
            _ => arith(&lhs, &rhs, i64::checked_mul, |l, r| l * r),
        }
    }

    pub fn divide(lhs: Val, rhs: Val) -> Result<Val> {
        let r = rhs.to_f64()?;
        if r == 0.0 {
            return Err(error!(DivisionByZero));
        }
        Ok(Val::Float(lhs.to_f64()? / r))
    }

    /// Floor division.
    pub fn divide_int(lhs: Val, rhs: Val) -> Result<Val> {
        if rhs.to_f64()? == 0.0 {
            return Err(error!(DivisionByZero));
        }
        arith(
            &lhs,
            &rhs,
            |l, r| {
                let q = l.checked_div(r)?;
                if l % r != 0 && ((l < 0) != (r < 0)) {
                    Some(q - 1)
                } else {
                    Some(q)
                }
            },
            |l, r| (l / r).floor(),
        )
    }

    /// Result takes the sign of the divisor.
    pub fn modulo(lhs: Val, rhs: Val) -> Result<Val> {
        if rhs.to_f64()? == 0.0 {
            return Err(error!(DivisionByZero));
        }
        arith(
            &lhs,
            &rhs,
            |l, r| {
                let m = l.checked_rem(r)?;
                if m != 0 && ((m < 0) != (r < 0)) {
                    Some(m + r)
                } else {
                    Some(m)
                }
            },
            |l, r| {
                let m = l % r;
                if m != 0.0 && ((m < 0.0) != (r < 0.0)) {
                    m + r
                } else {
                    m
                }
            },
        )
    }

    pub fn power(lhs: Val, rhs: Val) -> Result<Val> {
        arith(
            &lhs,
            &rhs,
            |l, r| l.checked_pow(u32::try_from(r).ok()?),
            f64::powf,
        )
    }

    /// Numeric when both sides read as numbers, otherwise textual.
    pub fn equal(lhs: &Val, rhs: &Val) -> bool {
        use Val::*;
        match (lhs, rhs) {
            (List(_), _) | (_, List(_)) | (Dict(_), _) | (_, Dict(_)) => lhs == rhs,
            _ => match (lhs.as_number(), rhs.as_number()) {
                (Some(l), Some(r)) => l == r,
                _ => lhs.to_string() == rhs.to_string(),
            },
        }
    }

    pub fn compare(lhs: &Val, rhs: &Val) -> Result<Ordering> {
        use Val::*;
        match (lhs, rhs) {
            (List(_), _) | (_, List(_)) | (Dict(_), _) | (_, Dict(_)) => {
                Err(error!(TypeMismatch; "CANNOT ORDER COLLECTIONS"))
            }
            _ => Ok(match (lhs.as_number(), rhs.as_number()) {
                (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
                _ => lhs.to_string().cmp(&rhs.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Val::*;

    #[test]
    fn test_integer_overflow_becomes_float() {
        let v = Operation::sum(Integer(i64::MAX), Integer(1)).unwrap();
        assert!(matches!(v, Float(_)));
    }

    #[test]
    fn test_division() {
        assert_eq!(Operation::divide(Integer(10), Integer(4)).unwrap(), Float(2.5));
        assert_eq!(Operation::divide_int(Integer(-7), Integer(2)).unwrap(), Integer(-4));
        assert_eq!(
            Operation::divide(Integer(1), Integer(0)).unwrap_err().to_string(),
            "DIVISION BY ZERO"
        );
    }

    #[test]
    fn test_modulo_sign_follows_divisor() {
        assert_eq!(Operation::modulo(Integer(-7), Integer(3)).unwrap(), Integer(2));
        assert_eq!(Operation::modulo(Integer(7), Integer(-3)).unwrap(), Integer(-2));
    }

    #[test]
    fn test_power() {
        assert_eq!(Operation::power(Integer(2), Integer(10)).unwrap(), Integer(1024));
        assert_eq!(Operation::power(Integer(2), Integer(-1)).unwrap(), Float(0.5));
    }

    #[test]
    fn test_mixed_comparisons() {
        assert!(Operation::equal(&String("10".into()), &Integer(10)));
        assert_eq!(
            Operation::compare(&String("apple".into()), &String("banana".into())).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Operation::binary(Operator::Less, Integer(9), Integer(10)).unwrap(),
            Integer(1)
        );
    }

    #[test]
    fn test_text_concatenation() {
        assert_eq!(
            Operation::sum(String("N=".into()), Integer(3)).unwrap(),
            String("N=3".into())
        );
        assert_eq!(
            Operation::multiply(String("ab".into()), Integer(2)).unwrap(),
            String("abab".into())
        );
    }
}
