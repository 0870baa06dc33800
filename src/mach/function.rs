use super::val::repeat_text;
use super::Val;
use crate::error;
use crate::lang::Error;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::Rng;
use std::ops::RangeInclusive;

type Result<T> = std::result::Result<T, Error>;

/// ## Built-in functions
///
/// Names are matched upper-cased. Several carry aliases with and without
/// the `$` suffix.

pub struct Function {}

const VARIADIC: usize = usize::MAX;

impl Function {
    pub fn arity(func_name: &str) -> Option<RangeInclusive<usize>> {
        Some(match func_name {
            "RND" => 0..=1,
            "ROUND" | "ATAN" => 1..=2,
            "MID$" | "MID" | "INSTR" | "SLICE" => 2..=3,
            "JOIN" | "SPLIT" => 1..=2,
            "MIN" | "MAX" => 1..=VARIADIC,
            "LEFT$" | "LEFT" | "RIGHT$" | "RIGHT" | "STARTSWITH" | "ENDSWITH" | "REPEAT$"
            | "REPEAT" | "FORMAT$" | "FORMAT" | "HASKEY" | "INDEXOF" | "CONTAINS" | "POWER"
            | "RANDOM" | "ATAN2" | "STRING$" => 2..=2,
            "REPLACE$" | "REPLACE" | "CLAMP" | "LERP" => 3..=3,
            "ABS" | "INT" | "SQR" | "SQRT" | "SIN" | "COS" | "TAN" | "ATN" | "LOG" | "EXP"
            | "EXP2" | "EXP10" | "LOG2" | "LOG10" | "CEIL" | "FLOOR" | "FIX" | "SGN" | "HEX"
            | "HEX$" | "BIN" | "BIN$" | "OCT" | "OCT$" | "LEN" | "CHR$" | "CHR" | "ASC"
            | "STR$" | "STR" | "TOSTR" | "VAL" | "TONUM" | "UCASE$" | "UCASE" | "UPPER"
            | "LCASE$" | "LCASE" | "LOWER" | "TRIM$" | "TRIM" | "LTRIM$" | "RTRIM$"
            | "ISNUMBER" | "ISSTRING" | "LENGTH" | "KEYS" | "VALUES" | "TYPE" | "SPACE$"
            | "FILEEXISTS" => 1..=1,
            _ => return None,
        })
    }

    pub fn is_builtin(func_name: &str) -> bool {
        Function::arity(func_name).is_some()
    }

    pub fn call(func_name: &str, args: Vec<Val>, rng: &mut StdRng) -> Result<Val> {
        let arity = match Function::arity(func_name) {
            Some(arity) => arity,
            None => return Err(error!(UndefinedUserFunction; func_name)),
        };
        if !arity.contains(&args.len()) {
            return Err(error!(IllegalFunctionCall;
                format!("WRONG NUMBER OF ARGUMENTS TO {}", func_name)));
        }
        let mut args = args.into_iter();
        let mut arg = || args.next().unwrap_or_default();
        match func_name {
            "ABS" => match arg() {
                Val::Integer(n) => Ok(Val::Integer(n.saturating_abs())),
                v => Ok(Val::number(v.to_f64()?.abs())),
            },
            "INT" | "FLOOR" => Ok(Val::number(arg().to_f64()?.floor())),
            "CEIL" => Ok(Val::number(arg().to_f64()?.ceil())),
            "FIX" => Ok(Val::number(arg().to_f64()?.trunc())),
            "SGN" => {
                let n = arg().to_f64()?;
                Ok(Val::Integer(if n > 0.0 {
                    1
                } else if n < 0.0 {
                    -1
                } else {
                    0
                }))
            }
            "SQR" | "SQRT" => {
                let n = arg().to_f64()?;
                if n < 0.0 {
                    return Err(error!(IllegalFunctionCall; "SQUARE ROOT OF NEGATIVE"));
                }
                Ok(Val::Float(n.sqrt()))
            }
            "SIN" => Ok(Val::Float(arg().to_f64()?.sin())),
            "COS" => Ok(Val::Float(arg().to_f64()?.cos())),
            "TAN" => Ok(Val::Float(arg().to_f64()?.tan())),
            "ATN" => Ok(Val::Float(arg().to_f64()?.atan())),
            "ATAN" | "ATAN2" => {
                let y = arg().to_f64()?;
                match arg() {
                    Val::Null => Ok(Val::Float(y.atan())),
                    x => Ok(Val::Float(y.atan2(x.to_f64()?))),
                }
            }
            "LOG" => {
                let n = arg().to_f64()?;
                if n <= 0.0 {
                    return Err(error!(IllegalFunctionCall; "LOG OF NON-POSITIVE"));
                }
                Ok(Val::Float(n.ln()))
            }
            "LOG2" => Ok(positive_or_zero(arg().to_f64()?, f64::log2)),
            "LOG10" => Ok(positive_or_zero(arg().to_f64()?, f64::log10)),
            "EXP" => Ok(Val::Float(arg().to_f64()?.exp())),
            "EXP2" => Ok(Val::Float(arg().to_f64()?.exp2())),
            "EXP10" => Ok(Val::Float(10f64.powf(arg().to_f64()?))),
            "POWER" => {
                let base = arg().to_f64()?;
                Ok(Val::number(base.powf(arg().to_f64()?)))
            }
            "ROUND" => {
                let n = arg().to_f64()?;
                let places = arg().to_i64()?;
                if places <= 0 {
                    Ok(Val::Integer(n.round() as i64))
                } else {
                    let scale = 10f64.powi(places.min(15) as i32);
                    Ok(Val::Float((n * scale).round() / scale))
                }
            }
            "RND" => match arg() {
                Val::Null => Ok(Val::Float(rng.gen::<f64>())),
                v => {
                    let n = v.to_f64()?;
                    if n <= 1.0 {
                        Ok(Val::Float(rng.gen::<f64>()))
                    } else {
                        Ok(Val::Integer(rng.gen_range(1..=n as i64)))
                    }
                }
            },
            "RANDOM" => {
                let lo = arg().to_i64()?;
                let hi = arg().to_i64()?;
                if lo > hi {
                    return Err(error!(IllegalFunctionCall; "RANDOM RANGE IS EMPTY"));
                }
                Ok(Val::Integer(rng.gen_range(lo..=hi)))
            }
            "MIN" | "MAX" => {
                let mut values: Vec<Val> = vec![arg()];
                values.extend(args);
                if let [Val::List(items)] = values.as_slice() {
                    values = items.clone();
                }
                let mut best: Option<f64> = None;
                for v in values {
                    let n = v.to_f64()?;
                    best = Some(match best {
                        None => n,
                        Some(b) if func_name == "MIN" => b.min(n),
                        Some(b) => b.max(n),
                    });
                }
                match best {
                    Some(n) => Ok(Val::number(n)),
                    None => Err(error!(IllegalFunctionCall; "EMPTY LIST")),
                }
            }
            "CLAMP" => {
                let v = arg().to_f64()?;
                let lo = arg().to_f64()?;
                let hi = arg().to_f64()?;
                Ok(Val::number(v.max(lo).min(hi)))
            }
            "LERP" => {
                let a = arg().to_f64()?;
                let b = arg().to_f64()?;
                let t = arg().to_f64()?;
                Ok(Val::Float(a + (b - a) * t))
            }
            "HEX" | "HEX$" => Ok(Val::String(radix(arg().to_i64()?, 16))),
            "BIN" | "BIN$" => Ok(Val::String(radix(arg().to_i64()?, 2))),
            "OCT" | "OCT$" => Ok(Val::String(radix(arg().to_i64()?, 8))),
            "LEN" => Ok(Val::Integer(match arg() {
                Val::List(l) => l.len(),
                Val::Dict(d) => d.len(),
                v => v.to_string().chars().count(),
            } as i64)),
            "LENGTH" => Ok(Val::Integer(match arg() {
                Val::List(l) => l.len(),
                Val::Dict(d) => d.len(),
                Val::String(s) => s.chars().count(),
                _ => 0,
            } as i64)),
            "MID$" | "MID" => {
                let s = arg().to_string();
                let start = (arg().to_i64()? - 1).max(0) as usize;
                let chars = s.chars().skip(start);
                Ok(Val::String(match arg() {
                    Val::Null => chars.collect(),
                    n => chars.take(n.to_i64()?.max(0) as usize).collect(),
                }))
            }
            "LEFT$" | "LEFT" => {
                let s = arg().to_string();
                let n = arg().to_i64()?.max(0) as usize;
                Ok(Val::String(s.chars().take(n).collect()))
            }
            "RIGHT$" | "RIGHT" => {
                let s = arg().to_string();
                let n = arg().to_i64()?.max(0) as usize;
                let len = s.chars().count();
                Ok(Val::String(s.chars().skip(len.saturating_sub(n)).collect()))
            }
            "CHR$" | "CHR" => match char::from_u32(arg().to_i64()? as u32) {
                Some(c) => Ok(Val::String(c.to_string())),
                None => Err(error!(IllegalFunctionCall; "BAD CHARACTER CODE")),
            },
            "ASC" => Ok(Val::Integer(
                arg().to_string().chars().next().map_or(0, |c| c as i64),
            )),
            "STR$" | "STR" | "TOSTR" => Ok(Val::String(arg().to_string())),
            "VAL" | "TONUM" => Ok(match arg() {
                v if v.is_numeric() => v,
                v => match Val::coerce(&v.to_string()) {
                    n if n.is_numeric() => n,
                    _ => Val::Integer(0),
                },
            }),
            "UCASE$" | "UCASE" | "UPPER" => Ok(Val::String(arg().to_string().to_uppercase())),
            "LCASE$" | "LCASE" | "LOWER" => Ok(Val::String(arg().to_string().to_lowercase())),
            "TRIM$" | "TRIM" => Ok(Val::String(arg().to_string().trim().to_string())),
            "LTRIM$" => Ok(Val::String(arg().to_string().trim_start().to_string())),
            "RTRIM$" => Ok(Val::String(arg().to_string().trim_end().to_string())),
            "SPACE$" => Ok(Val::String(repeat_text(" ", arg().to_i64()?)?)),
            "STRING$" | "REPEAT$" | "REPEAT" => {
                let s = arg().to_string();
                Ok(Val::String(repeat_text(&s, arg().to_i64()?)?))
            }
            "INSTR" => {
                let first = arg();
                let second = arg();
                let (start, hay, needle) = match arg() {
                    Val::Null => (1, first.to_string(), second.to_string()),
                    third => (first.to_i64()?.max(1), second.to_string(), third.to_string()),
                };
                Ok(Val::Integer(instr(&hay, &needle, start as usize)))
            }
            "REPLACE$" | "REPLACE" => {
                let s = arg().to_string();
                let old = arg().to_string();
                let new = arg().to_string();
                if old.is_empty() {
                    return Ok(Val::String(s));
                }
                Ok(Val::String(s.replace(&old, &new)))
            }
            "STARTSWITH" => {
                let s = arg().to_string();
                Ok(Val::bool(s.starts_with(&arg().to_string())))
            }
            "ENDSWITH" => {
                let s = arg().to_string();
                Ok(Val::bool(s.ends_with(&arg().to_string())))
            }
            "FORMAT$" | "FORMAT" => {
                let v = arg();
                Ok(Val::String(format_spec(&v, &arg().to_string())))
            }
            "ISNUMBER" => Ok(Val::bool(arg().is_numeric())),
            "ISSTRING" => Ok(Val::bool(matches!(arg(), Val::String(_)))),
            "TYPE" => Ok(Val::String(
                match arg() {
                    Val::String(_) => "STRING",
                    Val::Integer(_) | Val::Float(_) => "NUMBER",
                    Val::List(_) => "ARRAY",
                    Val::Dict(_) => "DICT",
                    Val::Null => "UNKNOWN",
                }
                .to_string(),
            )),
            "KEYS" => Ok(Val::List(
                dict_arg(arg())?.keys().map(|k| Val::String(k.clone())).collect(),
            )),
            "VALUES" => Ok(Val::List(dict_arg(arg())?.values().cloned().collect())),
            "HASKEY" => {
                let dict = dict_arg(arg())?;
                Ok(Val::bool(dict.contains_key(&arg().to_string())))
            }
            "INDEXOF" => {
                let haystack = arg();
                let needle = arg();
                Ok(Val::Integer(match haystack {
                    Val::List(items) => items
                        .iter()
                        .position(|v| *v == needle)
                        .map_or(-1, |i| i as i64),
                    v => {
                        let s = v.to_string();
                        match s.find(&needle.to_string()) {
                            Some(b) => s[..b].chars().count() as i64,
                            None => -1,
                        }
                    }
                }))
            }
            "CONTAINS" => {
                let haystack = arg();
                let needle = arg();
                Ok(Val::bool(match haystack {
                    Val::List(items) => items.contains(&needle),
                    Val::Dict(d) => d.contains_key(&needle.to_string()),
                    v => v.to_string().contains(&needle.to_string()),
                }))
            }
            "SLICE" => {
                let target = arg();
                let start = arg().to_i64()?;
                let end = match arg() {
                    Val::Null => None,
                    v => Some(v.to_i64()?),
                };
                Ok(match target {
                    Val::List(items) => {
                        let (s, e) = bounds(items.len(), start, end);
                        Val::List(items[s..e].to_vec())
                    }
                    v => {
                        let chars: Vec<char> = v.to_string().chars().collect();
                        let (s, e) = bounds(chars.len(), start, end);
                        Val::String(chars[s..e].iter().collect())
                    }
                })
            }
            "JOIN" => {
                let items = match arg() {
                    Val::List(items) => items,
                    _ => return Err(error!(TypeMismatch; "JOIN NEEDS A LIST")),
                };
                let delim = match arg() {
                    Val::Null => ",".to_string(),
                    d => d.to_string(),
                };
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                Ok(Val::String(parts.join(&delim)))
            }
            "SPLIT" => {
                let s = arg().to_string();
                Ok(Val::List(match arg() {
                    Val::Null => s.split_whitespace().map(Val::from).collect(),
                    d => split_text(&s, &d.to_string()),
                }))
            }
            "FILEEXISTS" => Ok(Val::bool(std::path::Path::new(&arg().to_string()).exists())),
            _ => Err(error!(InternalError; format!("NO HANDLER FOR {}", func_name))),
        }
    }
}

fn positive_or_zero(n: f64, f: fn(f64) -> f64) -> Val {
    if n > 0.0 {
        Val::Float(f(n))
    } else {
        Val::Integer(0)
    }
}

fn radix(n: i64, base: u32) -> String {
    let magnitude = n.unsigned_abs();
    let digits = match base {
        16 => format!("{:x}", magnitude),
        8 => format!("{:o}", magnitude),
        _ => format!("{:b}", magnitude),
    };
    if n < 0 {
        format!("-{}", digits)
    } else {
        digits
    }
}

/// One-based character position of `needle` at or after `start`, or 0.
fn instr(hay: &str, needle: &str, start: usize) -> i64 {
    let skip: usize = hay.chars().take(start - 1).map(char::len_utf8).sum();
    if skip > hay.len() {
        return 0;
    }
    match hay[skip..].find(needle) {
        Some(b) => (hay[..skip + b].chars().count() + 1) as i64,
        None => 0,
    }
}

/// Python-style slice bounds: negatives count from the end, then clamp.
fn bounds(len: usize, start: i64, end: Option<i64>) -> (usize, usize) {
    let fix = |i: i64| -> usize {
        let i = if i < 0 { len as i64 + i } else { i };
        i.clamp(0, len as i64) as usize
    };
    let s = fix(start);
    let e = end.map_or(len, fix);
    (s, e.max(s))
}

pub fn split_text(s: &str, delim: &str) -> Vec<Val> {
    if delim.is_empty() {
        return s.chars().map(|c| Val::String(c.to_string())).collect();
    }
    s.split(delim).map(Val::from).collect()
}

fn dict_arg(val: Val) -> Result<IndexMap<String, Val>> {
    match val {
        Val::Dict(d) => Ok(d),
        _ => Err(error!(TypeMismatch; "EXPECTED A DICT")),
    }
}

/// Format spec subset: `[width][,][.precision][f|d|e|%|x|s]`.
pub fn format_spec(val: &Val, spec: &str) -> String {
    let mut rest = spec;
    let width_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let width: usize = rest[..width_len].parse::<usize>().unwrap_or(0).min(256);
    rest = &rest[width_len..];
    let grouping = rest.starts_with(',');
    if grouping {
        rest = &rest[1..];
    }
    let mut precision: Option<usize> = None;
    if let Some(p) = rest.strip_prefix('.') {
        let digits = p.chars().take_while(|c| c.is_ascii_digit()).count();
        precision = p[..digits].parse::<usize>().ok().map(|p| p.min(64));
        rest = &p[digits..];
    }
    let n = val.as_number();
    let body = match (rest, n) {
        ("f", Some(n)) | ("", Some(n)) if precision.is_some() => {
            format!("{:.*}", precision.unwrap_or(6), n)
        }
        ("f", Some(n)) => format!("{:.6}", n),
        ("d", Some(n)) => format!("{}", n.round() as i64),
        ("e", Some(n)) => format!("{:.*e}", precision.unwrap_or(6), n),
        ("%", Some(n)) => format!("{:.*}%", precision.unwrap_or(6), n * 100.0),
        ("x", Some(n)) => radix(n as i64, 16),
        _ => val.to_string(),
    };
    let body = if grouping { group_thousands(&body) } else { body };
    if body.chars().count() < width {
        let pad = " ".repeat(width - body.chars().count());
        if n.is_some() {
            format!("{}{}", pad, body)
        } else {
            format!("{}{}", body, pad)
        }
    } else {
        body
    }
}

fn group_thousands(s: &str) -> String {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(d) => ("-", d),
        None => ("", s),
    };
    let (int, frac) = match digits.find('.') {
        Some(i) => (&digits[..i], &digits[i..]),
        None => (digits, ""),
    };
    let mut out = String::new();
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{}{}{}", sign, out, frac)
}
