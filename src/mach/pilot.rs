use super::runtime::Signal;
use super::{Runtime, Val};
use crate::error;
use crate::lang::{find_assign, first_word, Error};
use regex::Regex;

type Result<T> = std::result::Result<T, Error>;

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn word_at(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() && is_word_char(chars[end]) {
        end += 1;
    }
    end
}

impl Runtime {
    /// One PILOT colon command.
    pub(super) fn pilot(&mut self, letter: char, arg: &str) -> Result<Signal> {
        let arg = arg.trim();
        match letter {
            'T' => {
                let text = self.interpolate(arg);
                self.print(&format!("{}\n", text));
                Ok(Signal::Continue)
            }
            'A' => self.accept(arg),
            'M' => {
                self.match_answer(arg);
                Ok(Signal::Continue)
            }
            'Y' if self.match_flag && !arg.is_empty() => self.dispatch(arg),
            'N' if !self.match_flag && !arg.is_empty() => self.dispatch(arg),
            'Y' | 'N' | 'R' | 'L' => Ok(Signal::Continue),
            'J' => Ok(Signal::JumpTo(self.resolve_target(arg)?)),
            'C' if arg.starts_with('*') => {
                let target = self.resolve_target(arg)?;
                self.pilot_calls.push(self.pc + 1)?;
                Ok(Signal::JumpTo(target))
            }
            'C' | 'U' => self.compute(arg),
            'E' => match self.pilot_calls.pop() {
                Some(back) => Ok(Signal::JumpTo(back)),
                None => Ok(Signal::End),
            },
            'S' => self.string_operation(arg),
            'D' => self.dim_statement(arg),
            'P' => {
                let ms = self.eval_number(arg)?.max(0.0);
                self.pause(ms as u64);
                Ok(Signal::Continue)
            }
            'X' => self.dispatch(arg),
            'G' => self.logo(arg),
            _ => Err(error!(UnknownCommand; format!("{}:", letter))),
        }
    }

    /// Expands `$VAR`, `*VAR*` and `%name%` inside PILOT text.
    pub(super) fn interpolate(&mut self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let end = word_at(&chars, i + 1);
            let name: String = chars[i + 1..end].iter().collect();
            match c {
                '$' if !name.is_empty() => {
                    let upper = name.to_ascii_uppercase();
                    let val = match self.vars.fetch(&upper) {
                        Some(val) => val,
                        None => self.system_var(&name),
                    };
                    out.push_str(&val.to_string());
                    i = end;
                }
                '*' | '%' if !name.is_empty() && chars.get(end) == Some(&c) => {
                    let val = if c == '*' {
                        self.vars
                            .fetch(&name.to_ascii_uppercase())
                            .unwrap_or(Val::String(String::new()))
                    } else {
                        self.system_var(&name)
                    };
                    out.push_str(&val.to_string());
                    i = end + 1;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        out
    }

    /// `A:` with an optional target variable or prompt text.
    fn accept(&mut self, arg: &str) -> Result<Signal> {
        let target = !arg.is_empty() && arg.chars().all(is_word_char);
        let prompt = if target || arg.is_empty() {
            String::new()
        } else {
            self.interpolate(arg)
        };
        let answer = Val::coerce(&self.request(&prompt)?);
        self.answer = answer.clone();
        self.vars.store_unchecked("INPUT", answer.clone());
        self.vars.store_unchecked("ANSWER", answer.clone());
        if target {
            self.vars.store(&arg.to_ascii_uppercase(), answer)?;
        }
        Ok(Signal::Continue)
    }

    /// `M:` sets the match flag and the match registers.
    fn match_answer(&mut self, arg: &str) {
        let answer = self.answer.to_string();
        let hit = arg
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .find_map(|p| {
                let found = Regex::new(&format!("(?i){}", regex::escape(p))).ok()?.find(&answer)?;
                Some((p, found.start(), found.end()))
            });
        match hit {
            Some((pattern, at, end)) => {
                self.match_flag = true;
                self.status = 1;
                self.matched = pattern.to_string();
                self.left = answer.get(..at).unwrap_or("").to_string();
                self.right = answer.get(end..).unwrap_or("").to_string();
            }
            None => {
                self.match_flag = false;
                self.status = 0;
                self.left.clear();
                self.right.clear();
            }
        }
    }

    /// `C:var=expr` and `U:var=expr`
    fn compute(&mut self, arg: &str) -> Result<Signal> {
        if arg.is_empty() {
            return Ok(Signal::Continue);
        }
        if find_assign(arg).is_none() {
            return Err(error!(SyntaxError; format!("EXPECTED = IN {}", arg)));
        }
        self.let_statement(arg)
    }

    /// `S:UPPER NAME` and friends modify the variable in place.
    fn string_operation(&mut self, arg: &str) -> Result<Signal> {
        let op = first_word(arg);
        let name = arg[op.len().min(arg.len())..].trim().to_ascii_uppercase();
        if name.is_empty() {
            return Err(error!(SyntaxError; "S: NEEDS AN OPERATION AND A VARIABLE"));
        }
        let text = self.vars.fetch_or_default(&name).to_string();
        let value = match op.as_str() {
            "UPPER" => text.to_uppercase(),
            "LOWER" => text.to_lowercase(),
            "REVERSE" => text.chars().rev().collect(),
            "TRIM" => text.trim().to_string(),
            "LEN" => {
                let len = Val::Integer(text.chars().count() as i64);
                self.vars.store(&format!("{}_LEN", name), len)?;
                return Ok(Signal::Continue);
            }
            _ => return Err(error!(SyntaxError; format!("UNKNOWN STRING OPERATION {}", op))),
        };
        self.vars.store(&name, Val::String(value))?;
        Ok(Signal::Continue)
    }
}

#[cfg(test)]
mod tests {
    use crate::mach::{BufferOutput, Runtime, ScriptedInput};

    #[test]
    fn test_interpolate() {
        let mut rt = Runtime::default();
        rt.execute_line("NAME = \"Ada\"").unwrap();
        rt.execute_line("SCORE = 7").unwrap();
        assert_eq!(rt.interpolate("Hi $NAME!"), "Hi Ada!");
        assert_eq!(rt.interpolate("Score *SCORE* of 10"), "Score 7 of 10");
        assert_eq!(rt.interpolate("5 * 3 = 15"), "5 * 3 = 15");
        assert_eq!(rt.interpolate("100%"), "100%");
    }

    #[test]
    fn test_match_registers() {
        let out = BufferOutput::new();
        let mut rt = Runtime::default()
            .with_output(out.clone())
            .with_input(ScriptedInput::new(["I like green tea"]));
        let result = rt.run("A:\nM:red,green\nT:%left%|%matched%|%right%\nT:$STATUS");
        assert!(result.error_history.is_empty());
        assert_eq!(out.contents(), "I like |green| tea\n1\n");
    }

    #[test]
    fn test_match_registers_keep_original_offsets() {
        let out = BufferOutput::new();
        let mut rt = Runtime::default()
            .with_output(out.clone())
            .with_input(ScriptedInput::new(["İÉ x"]));
        rt.run("A:\nM:é\nT:%left%|%right%");
        assert_eq!(out.contents(), "İ| x\n");
    }
}
