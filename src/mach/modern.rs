use super::eval::dict_put;
use super::file::{read_file, write_file, FileMode};
use super::function::split_text;
use super::program::routine_header;
use super::runtime::{Lambda, LoopFrame, Signal, TryFrame};
use super::{Runtime, Val};
use crate::error;
use crate::lang::{find_assign, parse, split_keyword, split_top, Error};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::path::PathBuf;

type Result<T> = std::result::Result<T, Error>;

fn name_of(text: &str) -> String {
    text.trim().to_ascii_uppercase()
}

/// `#1` or `1`
fn file_number(text: &str) -> &str {
    text.trim().trim_start_matches('#').trim()
}

/// Numbers sort before strings.
fn sort_order(a: &Val, b: &Val) -> Ordering {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.to_string().cmp(&b.to_string()),
    }
}

fn expect_parts(parts: &[String], count: usize, usage: &str) -> Result<()> {
    if parts.len() < count {
        return Err(error!(SyntaxError; format!("USAGE: {}", usage)));
    }
    Ok(())
}

/// Expands `{0}`, `{NAME}`, `%d %s %f %.Nf` and `\n` `\t` escapes.
fn format_printf(fmt: &str, args: &[Val], lookup: &dyn Fn(&str) -> Option<Val>) -> String {
    let chars: Vec<char> = fmt.chars().collect();
    let mut out = String::with_capacity(fmt.len());
    let mut next_arg = 0;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' => {
                let close = chars[i + 1..].iter().position(|&c| c == '}');
                let inner: Option<String> = close.map(|n| chars[i + 1..i + 1 + n].iter().collect());
                let value = match &inner {
                    Some(inner) if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) => {
                        inner.parse::<usize>().ok().and_then(|n| args.get(n).cloned())
                    }
                    Some(inner) if !inner.is_empty() => lookup(&inner.to_ascii_uppercase()),
                    _ => None,
                };
                match (value, close) {
                    (Some(value), Some(n)) => {
                        out.push_str(&value.to_string());
                        i += n + 2;
                    }
                    _ => {
                        out.push(c);
                        i += 1;
                    }
                }
            }
            '%' if chars.get(i + 1) == Some(&'%') => {
                out.push('%');
                i += 2;
            }
            '%' if next_arg < args.len() => {
                let mut j = i + 1;
                let mut precision = None;
                if chars.get(j) == Some(&'.') {
                    let digits: String = chars[j + 1..]
                        .iter()
                        .take_while(|c| c.is_ascii_digit())
                        .collect();
                    precision = digits.parse::<usize>().ok();
                    j += 1 + digits.len();
                }
                let arg = &args[next_arg];
                let text = match chars.get(j) {
                    Some('d') | Some('i') => Some(match arg.as_number() {
                        Some(n) => format!("{}", n.trunc() as i64),
                        None => arg.to_string(),
                    }),
                    Some('s') => Some(arg.to_string()),
                    Some('f') => Some(match arg.as_number() {
                        Some(n) => format!("{:.*}", precision.unwrap_or(6), n),
                        None => arg.to_string(),
                    }),
                    _ => None,
                };
                match text {
                    Some(text) => {
                        out.push_str(&text);
                        next_arg += 1;
                        i = j + 1;
                    }
                    None => {
                        out.push(c);
                        i += 1;
                    }
                }
            }
            '\\' if chars.get(i + 1) == Some(&'n') => {
                out.push('\n');
                i += 2;
            }
            '\\' if chars.get(i + 1) == Some(&'t') => {
                out.push('\t');
                i += 2;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

impl Runtime {
    /// `LIST name [= v1, v2, ...]`
    pub(super) fn list_statement(&mut self, args: &str) -> Result<Signal> {
        let (name, items) = match find_assign(args) {
            Some(eq) => (name_of(&args[..eq]), args[eq + 1..].trim()),
            None => (name_of(args), ""),
        };
        if name.is_empty() {
            return Err(error!(SyntaxError; "USAGE: LIST name = v1, v2"));
        }
        let mut list = vec![];
        for item in split_top(items, ',') {
            list.push(self.eval(&item)?);
        }
        if let [Val::List(inner)] = list.as_slice() {
            list = inner.clone();
        }
        self.vars.store(&name, Val::List(list))?;
        self.sync_length(&name);
        Ok(Signal::Continue)
    }

    /// `SPLIT text, delim INTO list`
    pub(super) fn split_statement(&mut self, args: &str) -> Result<Signal> {
        let (source, target) = match split_keyword(args, "INTO") {
            Some(pair) => pair,
            None => return Err(error!(SyntaxError; "USAGE: SPLIT text, delim INTO list")),
        };
        let parts = split_top(source, ',');
        expect_parts(&parts, 2, "SPLIT text, delim INTO list")?;
        let text = self.eval(&parts[0])?.to_string();
        let delim = self.eval(&parts[1])?.to_string();
        let name = name_of(target);
        self.vars.store(&name, Val::List(split_text(&text, &delim)))?;
        self.sync_length(&name);
        Ok(Signal::Continue)
    }

    /// `JOIN list, delim INTO var`
    pub(super) fn join_statement(&mut self, args: &str) -> Result<Signal> {
        let (source, target) = match split_keyword(args, "INTO") {
            Some(pair) => pair,
            None => return Err(error!(SyntaxError; "USAGE: JOIN list, delim INTO var")),
        };
        let parts = split_top(source, ',');
        expect_parts(&parts, 1, "JOIN list, delim INTO var")?;
        let items = match self.eval(&parts[0])? {
            Val::List(items) => items,
            other => return Err(error!(TypeMismatch; format!("CANNOT JOIN {}", other.type_name()))),
        };
        let delim = match parts.get(1) {
            Some(delim) => self.eval(delim)?.to_string(),
            None => String::new(),
        };
        let joined: Vec<String> = items.iter().map(|v| v.to_string()).collect();
        self.assign(target, Val::String(joined.join(&delim)))?;
        Ok(Signal::Continue)
    }

    /// PUSH, POP, SHIFT, UNSHIFT, SPLICE, SORT and REVERSE.
    pub(super) fn list_operation(&mut self, word: &str, args: &str) -> Result<Signal> {
        let parts = split_top(args, ',');
        let first = parts.first().map(String::as_str).unwrap_or("");
        let (name, flag) = match word {
            "SORT" | "REVERSE" => {
                let mut words = first.split_whitespace();
                let name = name_of(words.next().unwrap_or(""));
                (name, words.next().map(name_of))
            }
            _ => (name_of(first), None),
        };
        if name.is_empty() {
            return Err(error!(SyntaxError; format!("{} NEEDS A LIST NAME", word)));
        }
        if self.vars.is_const(&name) {
            return Err(error!(ConstantReassigned; format!("CANNOT REASSIGN CONSTANT {}", name)));
        }
        let mut values = vec![];
        if matches!(word, "PUSH" | "UNSHIFT" | "SPLICE") {
            for part in &parts[1..] {
                values.push(self.eval(part)?);
            }
        }
        let mut list = match self.vars.list(&name) {
            Some(list) => list.clone(),
            None if matches!(word, "PUSH" | "UNSHIFT") && !self.vars.contains(&name) => vec![],
            None => return Err(error!(TypeMismatch; format!("{} IS NOT A LIST", name))),
        };
        match word {
            "PUSH" => list.extend(values),
            "UNSHIFT" => {
                list.splice(0..0, values);
            }
            "POP" | "SHIFT" => {
                if list.is_empty() {
                    return Err(error!(IllegalFunctionCall; format!("{} FROM EMPTY LIST {}", word, name)));
                }
                let item = if word == "POP" {
                    list.pop().unwrap_or_default()
                } else {
                    list.remove(0)
                };
                if let Some(target) = parts.get(1) {
                    self.assign(target, item)?;
                }
            }
            "SPLICE" => {
                if values.len() < 2 {
                    return Err(error!(SyntaxError; "USAGE: SPLICE list, start, count[, items]"));
                }
                let inserts = values.split_off(2);
                let len = list.len() as i64;
                let mut start = values[0].to_i64()?;
                if start < 0 {
                    start += len;
                }
                let start = start.clamp(0, len) as usize;
                let count = values[1].to_i64()?.clamp(0, len - start as i64) as usize;
                list.splice(start..start + count, inserts);
            }
            "SORT" => {
                list.sort_by(sort_order);
                if flag.as_deref() == Some("DESC") {
                    list.reverse();
                }
            }
            _ => list.reverse(),
        }
        self.vars.set_list(&name, list);
        self.sync_length(&name);
        Ok(Signal::Continue)
    }

    /// `DICT name [= key: value, ...]`
    pub(super) fn dict_statement(&mut self, args: &str) -> Result<Signal> {
        let (name, pairs) = match find_assign(args) {
            Some(eq) => (name_of(&args[..eq]), args[eq + 1..].trim()),
            None => (name_of(args), ""),
        };
        if name.is_empty() {
            return Err(error!(SyntaxError; "USAGE: DICT name = key: value"));
        }
        let mut dict = IndexMap::new();
        for pair in split_top(pairs, ',') {
            let pieces = split_top(&pair, ':');
            if pieces.len() < 2 {
                return Err(error!(SyntaxError; format!("EXPECTED key: value IN {}", pair)));
            }
            let key = self.dict_key(&pieces[0])?;
            let value = self.eval(&pieces[1..].join(":"))?;
            dict_put(&mut dict, &key, value);
        }
        self.vars.store(&name, Val::Dict(dict))?;
        Ok(Signal::Continue)
    }

    /// A bare word names itself; anything else is evaluated.
    fn dict_key(&mut self, text: &str) -> Result<String> {
        let text = text.trim();
        let bare = text.chars().next().map_or(false, |c| c.is_ascii_alphabetic())
            && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if bare && !self.vars.contains(&text.to_ascii_uppercase()) {
            return Ok(text.to_string());
        }
        Ok(self.eval(text)?.to_string())
    }

    /// `SET d.key = value` or `SET d, key, value`
    pub(super) fn set_statement(&mut self, args: &str) -> Result<Signal> {
        if find_assign(args).is_some() {
            return self.let_statement(args);
        }
        let parts = split_top(args, ',');
        expect_parts(&parts, 3, "SET dict, key, value")?;
        let key = self.dict_key(&parts[1])?;
        let value = self.eval(&parts[2])?;
        self.store_field(&name_of(&parts[0]), &key, value)?;
        Ok(Signal::Continue)
    }

    /// `GET d.key INTO var` or `GET d, key, var`. Missing keys read as "".
    pub(super) fn get_statement(&mut self, args: &str) -> Result<Signal> {
        let (value, target) = match split_keyword(args, "INTO") {
            Some((source, target)) => (self.eval(source)?, target.to_string()),
            None => {
                let parts = split_top(args, ',');
                expect_parts(&parts, 3, "GET dict, key, var")?;
                let name = name_of(&parts[0]);
                let key = self.dict_key(&parts[1])?;
                let value = match self.vars.dict(&name) {
                    Some(dict) => super::eval::dict_get(dict, &key).cloned().unwrap_or_default(),
                    None => return Err(error!(TypeMismatch; format!("{} IS NOT A DICT", name))),
                };
                (value, parts[2].clone())
            }
        };
        let value = match value {
            Val::Null => Val::String(String::new()),
            value => value,
        };
        self.assign(&target, value)?;
        Ok(Signal::Continue)
    }

    /// `DELETE d.key` or `DELETE d, key`
    pub(super) fn delete_statement(&mut self, args: &str) -> Result<Signal> {
        let parts = split_top(args, ',');
        let (name, key) = match parts.as_slice() {
            [field] => match field.split_once('.') {
                Some((name, key)) => (name_of(name), key.trim().to_string()),
                None => return Err(error!(SyntaxError; "USAGE: DELETE dict.key")),
            },
            [name, key, ..] => (name_of(name), self.dict_key(key)?),
            [] => return Err(error!(SyntaxError; "USAGE: DELETE dict.key")),
        };
        if self.vars.is_const(&name) {
            return Err(error!(ConstantReassigned; format!("CANNOT REASSIGN CONSTANT {}", name)));
        }
        match self.vars.dict_mut(&name) {
            Some(dict) => {
                let found = dict
                    .keys()
                    .find(|k| k.as_str() == key || k.eq_ignore_ascii_case(&key))
                    .cloned();
                if let Some(found) = found {
                    dict.shift_remove(&found);
                }
                Ok(Signal::Continue)
            }
            None => Err(error!(TypeMismatch; format!("{} IS NOT A DICT", name))),
        }
    }

    /// `OPEN "file" FOR INPUT|OUTPUT|APPEND AS #n`
    pub(super) fn open_statement(&mut self, args: &str) -> Result<Signal> {
        let usage = || error!(SyntaxError; "USAGE: OPEN \"file\" FOR INPUT|OUTPUT|APPEND AS #n");
        let (path, rest) = split_keyword(args, "FOR").ok_or_else(usage)?;
        let (mode, number) = split_keyword(rest, "AS").ok_or_else(usage)?;
        let mode = match FileMode::parse(mode) {
            Some(mode) => mode,
            None => return Err(error!(BadFileMode; mode)),
        };
        let path = self.eval(path)?.to_string();
        let number = self.eval_int(file_number(number))?;
        self.files.open(number, &path, mode)?;
        Ok(Signal::Continue)
    }

    /// `CLOSE #n[, #m]`, or every file with `CLOSE` or `CLOSE ALL`.
    pub(super) fn close_statement(&mut self, args: &str) -> Result<Signal> {
        if args.is_empty() || args.eq_ignore_ascii_case("ALL") {
            self.files.close_all();
            return Ok(Signal::Continue);
        }
        for part in split_top(args, ',') {
            let number = self.eval_int(file_number(&part))?;
            self.files.close(number)?;
        }
        Ok(Signal::Continue)
    }

    /// `READLINE #n, var` sets EOF to 1 once the file is exhausted.
    pub(super) fn readline_statement(&mut self, args: &str) -> Result<Signal> {
        let parts = split_top(args, ',');
        expect_parts(&parts, 2, "READLINE #n, var")?;
        let number = self.eval_int(file_number(&parts[0]))?;
        let (line, eof) = match self.files.read_line(number)? {
            Some(line) => (line, 0),
            None => (String::new(), 1),
        };
        self.assign(&parts[1], Val::String(line))?;
        self.vars.store_unchecked("EOF", Val::Integer(eof));
        Ok(Signal::Continue)
    }

    /// `WRITELINE #n, expr`
    pub(super) fn writeline_statement(&mut self, args: &str) -> Result<Signal> {
        let parts = split_top(args, ',');
        expect_parts(&parts, 2, "WRITELINE #n, expr")?;
        let number = self.eval_int(file_number(&parts[0]))?;
        let text = self.eval(&parts[1..].join(","))?.to_string();
        self.files.write_line(number, &text)?;
        Ok(Signal::Continue)
    }

    /// `READFILE "file", var`
    pub(super) fn readfile_statement(&mut self, args: &str) -> Result<Signal> {
        let parts = split_top(args, ',');
        expect_parts(&parts, 2, "READFILE \"file\", var")?;
        let path = self.eval(&parts[0])?.to_string();
        let text = read_file(&path)?;
        self.assign(&parts[1], Val::String(text))?;
        Ok(Signal::Continue)
    }

    /// `WRITEFILE "file", expr` and `APPENDFILE "file", expr`
    pub(super) fn writefile_statement(&mut self, args: &str, append: bool) -> Result<Signal> {
        let parts = split_top(args, ',');
        expect_parts(&parts, 2, "WRITEFILE \"file\", expr")?;
        let path = self.eval(&parts[0])?.to_string();
        let text = self.eval(&parts[1..].join(","))?.to_string();
        write_file(&path, &text, append)?;
        Ok(Signal::Continue)
    }

    pub(super) fn try_statement(&mut self) -> Result<Signal> {
        let (catch, end) = match self.program.blocks().get(self.pc) {
            Some(block) => (block.interior.first().copied(), block.closer),
            None => (None, None),
        };
        let end = match end {
            Some(end) => end,
            None => return Err(error!(MissingEnd; "TRY WITHOUT END TRY")),
        };
        let frame = TryFrame {
            catch,
            end,
            depth: self.calls.len(),
            bases: self.bases(),
        };
        self.tries.push(frame)?;
        Ok(Signal::Continue)
    }

    /// Reached only when the TRY body finished without a fault.
    pub(super) fn catch_statement(&mut self) -> Result<Signal> {
        if matches!(self.tries.last(), Some(frame) if frame.catch == Some(self.pc)) {
            self.tries.pop();
        }
        let opener = match self.program.blocks().opener(self.pc) {
            Some(opener) => opener,
            None => return Err(error!(MissingEnd; "CATCH WITHOUT TRY")),
        };
        Ok(Signal::JumpTo(self.closer_after(opener)?))
    }

    /// `ASSERT cond[, "message"]`
    pub(super) fn assert_statement(&mut self, args: &str) -> Result<Signal> {
        let mut parts = split_top(args, ',');
        let message = match parts.last() {
            Some(last) if parts.len() > 1 && last.starts_with('"') => {
                let last = parts.pop().unwrap_or_default();
                self.eval(&last)?.to_string()
            }
            _ => String::from("Assertion failed"),
        };
        if !self.eval_bool(&parts.join(","))? {
            return Err(error!(AssertionFailed; message));
        }
        Ok(Signal::Continue)
    }

    /// `FOREACH item IN coll` or `FOREACH key, value IN coll`, closed by NEXT.
    pub(super) fn foreach_statement(&mut self, args: &str) -> Result<Signal> {
        let (head, source) = match split_keyword(args, "IN") {
            Some(pair) => pair,
            None => return Err(error!(SyntaxError; "USAGE: FOREACH var IN collection")),
        };
        let vars: Vec<String> = split_top(head, ',').iter().map(|v| name_of(v)).collect();
        if vars.is_empty() || vars.len() > 2 {
            return Err(error!(SyntaxError; "FOREACH TAKES ONE OR TWO VARIABLES"));
        }
        let pair = vars.len() == 2;
        let items: Vec<Vec<Val>> = match self.eval(source)? {
            Val::List(list) => list
                .into_iter()
                .enumerate()
                .map(|(i, v)| if pair { vec![Val::Integer(i as i64), v] } else { vec![v] })
                .collect(),
            Val::Dict(dict) => dict
                .into_iter()
                .map(|(k, v)| if pair { vec![Val::String(k), v] } else { vec![Val::String(k)] })
                .collect(),
            Val::String(s) => s
                .chars()
                .enumerate()
                .map(|(i, c)| {
                    let c = Val::String(c.to_string());
                    if pair { vec![Val::Integer(i as i64), c] } else { vec![c] }
                })
                .collect(),
            other => {
                return Err(error!(TypeMismatch; format!("CANNOT ITERATE {}", other.type_name())))
            }
        };
        let opener = self.pc;
        if let Some(depth) = self.loops.iter().position(|f| f.opener() == opener) {
            self.loops.truncate(depth);
        }
        let closer = match self.program.blocks().closer(opener) {
            Some(closer) => closer,
            None => return Err(error!(ForWithoutNext; "FOREACH WITHOUT NEXT")),
        };
        let first = match items.first() {
            Some(first) => first.clone(),
            None => return Ok(Signal::JumpTo(closer + 1)),
        };
        for (var, val) in vars.iter().zip(first) {
            self.vars.store(var, val)?;
        }
        self.loops.push(LoopFrame::Foreach {
            vars,
            items,
            index: 0,
            opener,
        })?;
        Ok(Signal::Continue)
    }

    /// `CONST name = value`
    pub(super) fn const_statement(&mut self, args: &str) -> Result<Signal> {
        let eq = match find_assign(args) {
            Some(eq) => eq,
            None => return Err(error!(SyntaxError; "USAGE: CONST name = value")),
        };
        let value = self.eval(&args[eq + 1..])?;
        self.vars.store_const(&name_of(&args[..eq]), value)?;
        Ok(Signal::Continue)
    }

    /// `TYPEOF expr [INTO var]`
    pub(super) fn typeof_statement(&mut self, args: &str) -> Result<Signal> {
        let (source, target) = match split_keyword(args, "INTO") {
            Some((source, target)) => (source, Some(target)),
            None => (args, None),
        };
        let name = Val::from(self.eval(source)?.type_name());
        match target {
            Some(target) => self.assign(target, name)?,
            None => self.print(&format!("{}\n", name)),
        }
        Ok(Signal::Continue)
    }

    /// `IMPORT "file"` appends the file once and runs its top level.
    pub(super) fn import_statement(&mut self, args: &str) -> Result<Signal> {
        let path = self.eval(args)?.to_string();
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| PathBuf::from(&path));
        if self.imported.contains(&key) {
            return Ok(Signal::Continue);
        }
        let source = read_file(&path)?;
        self.imported.insert(key);
        let range = self.program.append(&source);
        let back = self.pc;
        self.pc = range.start;
        let outcome = self.execute_range(range.end);
        self.pc = back;
        match outcome? {
            Signal::End => Ok(Signal::End),
            _ => Ok(Signal::Continue),
        }
    }

    /// `PRINTF "format", args...`
    pub(super) fn printf_statement(&mut self, args: &str) -> Result<Signal> {
        let parts = split_top(args, ',');
        let fmt = match parts.first() {
            Some(fmt) => self.eval(fmt)?.to_string(),
            None => return Err(error!(SyntaxError; "USAGE: PRINTF \"format\", args")),
        };
        let mut values = vec![];
        for part in &parts[1..] {
            values.push(self.eval(part)?);
        }
        let vars = &self.vars;
        let text = format_printf(&fmt, &values, &|name| vars.fetch(name));
        self.print(&format!("{}\n", text));
        Ok(Signal::Continue)
    }

    /// `ENUM COLOR = RED, GREEN` makes constants COLOR_RED=0, COLOR_GREEN=1
    /// and COLOR_COUNT.
    pub(super) fn enum_statement(&mut self, args: &str) -> Result<Signal> {
        let eq = match find_assign(args) {
            Some(eq) => eq,
            None => return Err(error!(SyntaxError; "USAGE: ENUM name = A, B, C")),
        };
        let name = name_of(&args[..eq]);
        let members = split_top(&args[eq + 1..], ',');
        for (i, member) in members.iter().enumerate() {
            let constant = format!("{}_{}", name, name_of(member));
            self.vars.store_const(&constant, Val::Integer(i as i64))?;
        }
        self.vars.store(&format!("{}_COUNT", name), Val::Integer(members.len() as i64))?;
        Ok(Signal::Continue)
    }

    /// `STRUCT name = field1, field2`
    pub(super) fn struct_statement(&mut self, args: &str) -> Result<Signal> {
        let eq = match find_assign(args) {
            Some(eq) => eq,
            None => return Err(error!(SyntaxError; "USAGE: STRUCT name = field1, field2")),
        };
        let fields = split_top(&args[eq + 1..], ',').iter().map(|f| name_of(f)).collect();
        self.structs.insert(name_of(&args[..eq]), fields);
        Ok(Signal::Continue)
    }

    /// `NEW struct AS var` makes a dict with every field set to 0.
    pub(super) fn new_statement(&mut self, args: &str) -> Result<Signal> {
        let (kind, target) = match split_keyword(args, "AS") {
            Some((kind, target)) => (name_of(kind), name_of(target)),
            None => return Err(error!(SyntaxError; "USAGE: NEW struct AS var")),
        };
        let fields = match self.structs.get(&kind) {
            Some(fields) => fields,
            None => return Err(error!(IllegalFunctionCall; format!("UNDEFINED STRUCT {}", kind))),
        };
        let dict = fields
            .iter()
            .map(|f| (f.clone(), Val::Integer(0)))
            .collect();
        self.vars.store(&target, Val::Dict(dict))?;
        Ok(Signal::Continue)
    }

    /// `LAMBDA name(params) = expr`
    pub(super) fn lambda_statement(&mut self, args: &str) -> Result<Signal> {
        let eq = match find_assign(args) {
            Some(eq) => eq,
            None => return Err(error!(SyntaxError; "USAGE: LAMBDA name(params) = expr")),
        };
        let (name, params) = routine_header(&args[..eq]);
        let body = parse(args[eq + 1..].trim())?;
        self.lambdas.insert(name, Lambda { params, body });
        Ok(Signal::Continue)
    }

    /// `MAP f ON list INTO result` and `FILTER f ON list INTO result`
    pub(super) fn map_statement(&mut self, word: &str, args: &str) -> Result<Signal> {
        let (func, source, target) = self.functional_args(word, args)?;
        let items = self.list_value(source)?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let value = self.apply(&func, vec![item.clone()])?;
            match word {
                "MAP" if value == Val::Null => out.push(item),
                "MAP" => out.push(value),
                _ if value.is_truthy() => out.push(item),
                _ => {}
            }
        }
        let target = name_of(target);
        self.vars.store(&target, Val::List(out))?;
        self.sync_length(&target);
        Ok(Signal::Continue)
    }

    /// `REDUCE f ON list INTO var [FROM init]`
    pub(super) fn reduce_statement(&mut self, args: &str) -> Result<Signal> {
        let (func, source, target) = self.functional_args("REDUCE", args)?;
        let (target, init) = match split_keyword(target, "FROM") {
            Some((target, init)) => (target, Some(self.eval(init)?)),
            None => (target, None),
        };
        let mut items = self.list_value(source)?.into_iter();
        let seed = match init {
            Some(init) => Some(init),
            None => items.next(),
        };
        let mut acc = seed.unwrap_or(Val::Integer(0));
        for item in items {
            acc = self.apply(&func, vec![acc, item])?;
        }
        self.assign(target, acc)?;
        Ok(Signal::Continue)
    }

    fn functional_args<'a>(&self, word: &str, args: &'a str) -> Result<(String, &'a str, &'a str)> {
        let usage = || error!(SyntaxError; format!("USAGE: {} function ON list INTO var", word));
        let (func, rest) = split_keyword(args, "ON").ok_or_else(usage)?;
        let (source, target) = split_keyword(rest, "INTO").ok_or_else(usage)?;
        Ok((name_of(func), source, target))
    }

    fn list_value(&mut self, source: &str) -> Result<Vec<Val>> {
        match self.eval(source)? {
            Val::List(items) => Ok(items),
            other => Err(error!(TypeMismatch; format!("EXPECTED A LIST, GOT {}", other.type_name()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::BufferOutput;

    fn runtime() -> (Runtime, BufferOutput) {
        let out = BufferOutput::new();
        (Runtime::default().with_output(out.clone()), out)
    }

    #[test]
    fn test_format_printf() {
        let args = vec![Val::from("Ada"), Val::Integer(36), Val::Float(3.14159)];
        let none = |_: &str| None;
        assert_eq!(format_printf("{0} is {1}", &args, &none), "Ada is 36");
        assert_eq!(format_printf("%s is %d", &args, &none), "Ada is 36");
        assert_eq!(format_printf("pi %.2f", &args[2..], &none), "pi 3.14");
        assert_eq!(format_printf("100%% a\\tb", &[], &none), "100% a\tb");
        let lookup = |name: &str| (name == "X").then(|| Val::Integer(9));
        assert_eq!(format_printf("x={x} y={y}", &[], &lookup), "x=9 y={y}");
    }

    #[test]
    fn test_list_operations() {
        let (mut rt, _) = runtime();
        rt.execute_line("LIST NUMS = 3, \"b\", 1, \"a\"").unwrap();
        rt.execute_line("SORT NUMS").unwrap();
        assert_eq!(rt.var("NUMS").unwrap().to_string(), "[1, 3, \"a\", \"b\"]");
        rt.execute_line("PUSH NUMS, 7, 8").unwrap();
        rt.execute_line("POP NUMS, LAST").unwrap();
        rt.execute_line("SHIFT NUMS, HEAD").unwrap();
        assert_eq!(rt.var("LAST"), Some(Val::Integer(8)));
        assert_eq!(rt.var("HEAD"), Some(Val::Integer(1)));
        assert_eq!(rt.var("NUMS_LENGTH"), Some(Val::Integer(4)));
        rt.execute_line("SPLICE NUMS, 1, 2, 0").unwrap();
        assert_eq!(rt.var("NUMS").unwrap().to_string(), "[3, 0, 7]");
        rt.execute_line("REVERSE NUMS").unwrap();
        assert_eq!(rt.var("NUMS").unwrap().to_string(), "[7, 0, 3]");
        rt.execute_line("LIST EMPTY").unwrap();
        assert!(rt.execute_line("POP EMPTY").is_err());
    }

    #[test]
    fn test_dicts() {
        let (mut rt, _) = runtime();
        rt.execute_line("DICT P = name: \"Ada\", \"age\": 36").unwrap();
        rt.execute_line("SET P.city = \"London\"").unwrap();
        rt.execute_line("SET P, zip, 12345").unwrap();
        rt.execute_line("GET P.name INTO WHO").unwrap();
        rt.execute_line("GET P, missing, NOPE").unwrap();
        rt.execute_line("DELETE P.age").unwrap();
        assert_eq!(rt.var("WHO"), Some(Val::from("Ada")));
        assert_eq!(rt.var("NOPE"), Some(Val::from("")));
        let keys: Vec<&String> = rt.dict("P").unwrap().keys().collect();
        assert_eq!(keys, ["name", "city", "zip"]);
    }

    #[test]
    fn test_functional() {
        let (mut rt, _) = runtime();
        rt.execute_line("LAMBDA DOUBLE(X) = X * 2").unwrap();
        rt.execute_line("LAMBDA ADD(A, B) = A + B").unwrap();
        rt.execute_line("LAMBDA ODD(X) = X MOD 2 = 1").unwrap();
        rt.execute_line("LIST NUMS = 1, 2, 3, 4").unwrap();
        rt.execute_line("MAP DOUBLE ON NUMS INTO DOUBLED").unwrap();
        rt.execute_line("FILTER ODD ON NUMS INTO ODDS").unwrap();
        rt.execute_line("REDUCE ADD ON NUMS INTO TOTAL FROM 10").unwrap();
        assert_eq!(rt.var("DOUBLED").unwrap().to_string(), "[2, 4, 6, 8]");
        assert_eq!(rt.var("ODDS").unwrap().to_string(), "[1, 3]");
        assert_eq!(rt.var("ODDS_LENGTH"), Some(Val::Integer(2)));
        assert_eq!(rt.var("TOTAL"), Some(Val::Integer(20)));
    }

    #[test]
    fn test_enum_struct_typeof() {
        let (mut rt, out) = runtime();
        rt.execute_line("ENUM COLOR = RED, GREEN, BLUE").unwrap();
        assert_eq!(rt.var("COLOR_BLUE"), Some(Val::Integer(2)));
        assert_eq!(rt.var("COLOR_COUNT"), Some(Val::Integer(3)));
        assert!(rt.execute_line("COLOR_RED = 5").is_err());
        rt.execute_line("STRUCT POINT = x, y").unwrap();
        rt.execute_line("NEW POINT AS P").unwrap();
        rt.execute_line("TYPEOF P").unwrap();
        rt.execute_line("TYPEOF 1.5 INTO T").unwrap();
        assert_eq!(out.contents(), "DICT\n");
        assert_eq!(rt.var("T"), Some(Val::from("FLOAT")));
        assert!(rt.execute_line("NEW SHAPE AS S").is_err());
    }

    #[test]
    fn test_try_and_foreach() {
        let (mut rt, out) = runtime();
        let source = "\
TRY
  X = 1 / 0
  PRINT \"unreached\"
CATCH E
  PRINT \"caught\"
END TRY
DICT D = a: 1, b: 2
FOREACH K, V IN D
  PRINT K; V
NEXT";
        let result = rt.run(source);
        assert!(result.error_history.is_empty());
        assert_eq!(out.contents(), "caught\na1\nb2\n");
        assert!(!rt.var("E").unwrap().to_string().is_empty());
    }
}
