use super::eval::dict_get;
use super::runtime::Signal;
use super::{Runtime, Val};
use crate::error;
use crate::lang::{first_word, split_keyword, Error};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Number, Value};

type Result<T> = std::result::Result<T, Error>;

/// JSON objects become dicts and arrays become lists. Booleans read as 1 and 0.
pub fn from_json(value: Value) -> Val {
    match value {
        Value::Null => Val::Null,
        Value::Bool(b) => Val::Integer(b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Val::Integer(i),
            None => Val::Float(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => Val::String(s),
        Value::Array(items) => Val::List(items.into_iter().map(from_json).collect()),
        Value::Object(map) => {
            let dict: IndexMap<String, Val> =
                map.into_iter().map(|(k, v)| (k, from_json(v))).collect();
            Val::Dict(dict)
        }
    }
}

pub fn to_json(val: &Val) -> Value {
    match val {
        Val::Null => Value::Null,
        Val::Integer(n) => Value::from(*n),
        Val::Float(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        Val::String(s) => Value::String(s.clone()),
        Val::List(items) => Value::Array(items.iter().map(to_json).collect()),
        Val::Dict(dict) => {
            let map: Map<String, Value> = dict.iter().map(|(k, v)| (k.clone(), to_json(v))).collect();
            Value::Object(map)
        }
    }
}

/// `\1` in a replacement means the first group.
fn replacement(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(d) if c == '\\' && d.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    digits.push(*d);
                    chars.next();
                }
                out.push_str(&format!("${{{}}}", digits));
            }
            _ => out.push(c),
        }
    }
    out
}

fn usage(text: &str) -> Error {
    error!(SyntaxError; format!("USAGE: {}", text))
}

impl Runtime {
    /// `JSON PARSE text INTO var`, `JSON STRINGIFY expr INTO var`,
    /// `JSON GET dict.key.key INTO var`
    pub(super) fn json_statement(&mut self, args: &str) -> Result<Signal> {
        let op = first_word(args);
        let rest = args[op.len().min(args.len())..].trim();
        let (source, target) = split_keyword(rest, "INTO")
            .ok_or_else(|| usage("JSON PARSE|STRINGIFY|GET source INTO var"))?;
        let value = match op.as_str() {
            "PARSE" => {
                let text = self.eval(source)?.to_string();
                match serde_json::from_str::<Value>(&text) {
                    Ok(json) => from_json(json),
                    Err(e) => return Err(error!(IllegalFunctionCall; format!("INVALID JSON: {}", e))),
                }
            }
            "STRINGIFY" => {
                let val = self.eval(source)?;
                Val::String(to_json(&val).to_string())
            }
            "GET" => self.json_path(source)?,
            _ => return Err(usage("JSON PARSE|STRINGIFY|GET source INTO var")),
        };
        let target = target.trim().to_ascii_uppercase();
        self.vars.store(&target, value)?;
        self.sync_length(&target);
        Ok(Signal::Continue)
    }

    /// Walks `NAME.key.key` through nested dicts; a numeric key indexes a list.
    fn json_path(&mut self, source: &str) -> Result<Val> {
        let mut keys = source.split('.').map(str::trim);
        let name = keys.next().unwrap_or("").to_ascii_uppercase();
        let mut current = self.vars.fetch_or_default(&name);
        for key in keys {
            current = match &current {
                Val::Dict(dict) => dict_get(dict, key).cloned().unwrap_or_default(),
                Val::List(items) => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default(),
                _ => Val::Null,
            };
        }
        Ok(match current {
            Val::Null => Val::String(String::new()),
            val => val,
        })
    }

    /// `REGEX MATCH|FIND|SPLIT "pattern" IN text INTO var` and
    /// `REGEX REPLACE "pattern" WITH "replacement" IN text INTO var`
    pub(super) fn regex_statement(&mut self, args: &str) -> Result<Signal> {
        let op = first_word(args);
        let rest = args[op.len().min(args.len())..].trim();
        let bad = || usage("REGEX MATCH|FIND|SPLIT|REPLACE \"pattern\" IN text INTO var");
        let (head, rest) = split_keyword(rest, "IN").ok_or_else(bad)?;
        let (source, target) = split_keyword(rest, "INTO").ok_or_else(bad)?;
        let (pattern, with) = match op.as_str() {
            "REPLACE" => {
                let (pattern, with) = split_keyword(head, "WITH").ok_or_else(bad)?;
                (pattern, Some(with))
            }
            _ => (head, None),
        };
        let pattern = self.eval(pattern)?.to_string();
        let re = Regex::new(&pattern)
            .map_err(|e| error!(IllegalFunctionCall; format!("BAD PATTERN {}: {}", pattern, e)))?;
        let text = self.eval(source)?.to_string();
        let target = target.trim().to_ascii_uppercase();
        match op.as_str() {
            "MATCH" => {
                let (found, pos) = match re.find(&text) {
                    Some(m) => (m.as_str().to_string(), text[..m.start()].chars().count() as i64),
                    None => (String::new(), -1),
                };
                self.match_flag = pos >= 0;
                self.status = self.match_flag as i64;
                self.vars.store(&target, Val::String(found))?;
                self.vars.store(&format!("{}_POS", target), Val::Integer(pos))?;
            }
            "FIND" | "SPLIT" => {
                let items: Vec<Val> = if op == "FIND" {
                    re.find_iter(&text).map(|m| Val::from(m.as_str())).collect()
                } else {
                    re.split(&text).map(Val::from).collect()
                };
                self.vars.store(&target, Val::List(items))?;
                self.sync_length(&target);
            }
            "REPLACE" => {
                let with = match with {
                    Some(with) => self.eval(with)?.to_string(),
                    None => String::new(),
                };
                let replaced = re.replace_all(&text, replacement(&with).as_str());
                self.vars.store(&target, Val::String(replaced.into_owned()))?;
            }
            _ => return Err(bad()),
        }
        Ok(Signal::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacement() {
        assert_eq!(replacement(r"\2-\1"), "${2}-${1}");
        assert_eq!(replacement(r"a\b"), r"a\b");
    }

    #[test]
    fn test_json_values() {
        let json: Value = serde_json::from_str(r#"{"b": [1, 2.5, true], "a": "x"}"#).unwrap();
        let val = from_json(json);
        assert_eq!(val.to_string(), "{\"b\": [1, 2.5, 1], \"a\": \"x\"}");
        assert_eq!(to_json(&val).to_string(), r#"{"b":[1,2.5,1],"a":"x"}"#);
    }

    #[test]
    fn test_json_statements() {
        let mut rt = Runtime::default();
        rt.execute_line("DICT P = name: \"Ada\"").unwrap();
        rt.execute_line("SET P.tags = 2").unwrap();
        rt.execute_line("JSON STRINGIFY P INTO S").unwrap();
        assert_eq!(rt.var("S"), Some(Val::from(r#"{"name":"Ada","tags":2}"#)));
        rt.execute_line("JSON PARSE S INTO Q").unwrap();
        rt.execute_line("JSON GET Q.name INTO WHO").unwrap();
        assert_eq!(rt.var("WHO"), Some(Val::from("Ada")));
        assert!(rt.execute_line("JSON PARSE \"{oops\" INTO Z").is_err());
    }

    #[test]
    fn test_regex_statements() {
        let mut rt = Runtime::default();
        rt.execute_line("S = \"call 555-1234 or 555-9876\"").unwrap();
        rt.execute_line("REGEX MATCH \"[0-9]+-[0-9]+\" IN S INTO M").unwrap();
        assert_eq!(rt.var("M"), Some(Val::from("555-1234")));
        assert_eq!(rt.var("M_POS"), Some(Val::Integer(5)));
        rt.execute_line("REGEX FIND \"[0-9]{4}\" IN S INTO ALL").unwrap();
        assert_eq!(rt.var("ALL_LENGTH"), Some(Val::Integer(2)));
        rt.execute_line("REGEX REPLACE \"([0-9]+)-([0-9]+)\" WITH \"\\2\" IN S INTO R").unwrap();
        assert_eq!(rt.var("R"), Some(Val::from("call 1234 or 9876")));
        rt.execute_line("REGEX SPLIT \" +\" IN S INTO W").unwrap();
        assert_eq!(rt.var("W_LENGTH"), Some(Val::Integer(4)));
        rt.execute_line("REGEX MATCH \"xyz\" IN S INTO NONE").unwrap();
        assert_eq!(rt.var("NONE_POS"), Some(Val::Integer(-1)));
    }
}
