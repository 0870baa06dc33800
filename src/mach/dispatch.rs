use super::logo::is_logo_keyword;
use super::program::label_of;
use super::runtime::Signal;
use super::{Function, Runtime};
use crate::error;
use crate::lang::{find_assign, first_word, Error};

type Result<T> = std::result::Result<T, Error>;

fn is_comment(text: &str) -> bool {
    text.starts_with('\'')
        || text.starts_with(';')
        || text.starts_with('#')
        || (text.starts_with('*') && label_of(text).is_none())
        || first_word(text) == "REM"
}

/// `T:hello` style command letter and argument.
pub(super) fn pilot_command(text: &str) -> Option<(char, &str)> {
    let mut chars = text.chars();
    let letter = chars.next()?;
    if letter.is_ascii_alphabetic() && chars.next() == Some(':') {
        Some((letter.to_ascii_uppercase(), &text[2..]))
    } else {
        None
    }
}

impl Runtime {
    /// Routes one statement to PILOT, Logo, BASIC or the extensions.
    pub(super) fn dispatch(&mut self, text: &str) -> Result<Signal> {
        let text = text.trim();
        if text.is_empty() || is_comment(text) {
            return Ok(Signal::Continue);
        }
        if let Some((letter, arg)) = pilot_command(text) {
            return self.pilot(letter, arg);
        }
        if label_of(text).is_some() {
            return Ok(Signal::Continue);
        }
        let word = first_word(text);
        if word == "TO" {
            return Ok(Signal::Continue);
        }
        if is_logo_keyword(&word) && find_assign(text).is_none() {
            return self.logo(text);
        }
        if self
            .program
            .procedures()
            .contains_key(&word.to_ascii_lowercase())
        {
            return self.call_procedure(text);
        }
        if let Some(signal) = self.statement(&word, text)? {
            return Ok(signal);
        }
        if find_assign(text).is_some() {
            return self.let_statement(text);
        }
        if self.program.routines().contains_key(&word) {
            return self.call_statement(text);
        }
        if Function::is_builtin(&word) && text.contains('(') {
            let val = self.eval(text)?;
            self.print(&format!("{}\n", val));
            return Ok(Signal::Continue);
        }
        Err(error!(UnknownCommand; text))
    }

    /// Keyword statements. `None` when `word` is not a keyword.
    fn statement(&mut self, word: &str, text: &str) -> Result<Option<Signal>> {
        let args = rest_after(text, word);
        let signal = match word {
            "PRINT" | "?" => self.print_statement(args)?,
            "LET" => self.let_statement(args)?,
            "INPUT" => self.input_statement(args)?,
            "IF" => self.if_statement(text)?,
            "ELSEIF" | "ELSE" => self.else_statement()?,
            "ENDIF" => Signal::Continue,
            "END" => self.end_statement(args)?,
            "STOP" if self.logo_depth > 0 => Signal::Return,
            "STOP" => Signal::End,
            "FOR" => self.for_statement(args)?,
            "NEXT" => self.next_statement(args)?,
            "WHILE" => self.while_statement(args)?,
            "WEND" => self.wend_statement()?,
            "DO" => self.do_statement(args)?,
            "LOOP" => self.loop_statement(args)?,
            "EXIT" => self.exit_statement(args)?,
            "BREAK" => Signal::Break,
            "GOTO" => Signal::JumpTo(self.resolve_target(args)?),
            "GOSUB" => self.gosub(args)?,
            "RETURN" => self.return_statement(args)?,
            "ON" => self.on_statement(args)?,
            "SELECT" => self.select_statement(args)?,
            "CASE" => self.case_statement(args)?,
            "DIM" => self.dim_statement(args)?,
            "DATA" => Signal::Continue,
            "READ" => self.read_statement(args)?,
            "RESTORE" => {
                self.data_pos = 0;
                Signal::Continue
            }
            "RANDOMIZE" => self.randomize(args)?,
            "DELAY" => {
                let ms = self.eval_number(args)?.max(0.0);
                self.pause(ms as u64);
                Signal::Continue
            }
            "SLEEP" => {
                let secs = self.eval_number(args)?.max(0.0);
                self.pause((secs * 1000.0) as u64);
                Signal::Continue
            }
            "SWAP" => self.swap(args)?,
            "INCR" => self.step_var(args, 1)?,
            "DECR" => self.step_var(args, -1)?,
            "COLOR" | "COLOUR" => {
                let color = self.color_arg(args)?;
                self.turtle.set_pen_color(&color);
                Signal::Continue
            }
            "BEEP" => {
                self.print("\x07");
                Signal::Continue
            }
            "TAB" | "SPC" => self.spacing(word, args)?,
            "CLS" => {
                self.output.clear();
                Signal::Continue
            }
            "SUB" | "FUNCTION" => Signal::JumpTo(self.closer_after(self.pc)?),
            "CALL" => self.call_statement(args)?,
            "LIST" => self.list_statement(args)?,
            "SPLIT" => self.split_statement(args)?,
            "JOIN" => self.join_statement(args)?,
            "PUSH" | "POP" | "SHIFT" | "UNSHIFT" | "SPLICE" | "SORT" | "REVERSE" => {
                self.list_operation(word, args)?
            }
            "DICT" => self.dict_statement(args)?,
            "SET" => self.set_statement(args)?,
            "GET" => self.get_statement(args)?,
            "DELETE" => self.delete_statement(args)?,
            "OPEN" => self.open_statement(args)?,
            "CLOSE" => self.close_statement(args)?,
            "READLINE" => self.readline_statement(args)?,
            "WRITELINE" => self.writeline_statement(args)?,
            "READFILE" => self.readfile_statement(args)?,
            "WRITEFILE" => self.writefile_statement(args, false)?,
            "APPENDFILE" => self.writefile_statement(args, true)?,
            "TRY" => self.try_statement()?,
            "CATCH" => self.catch_statement()?,
            "THROW" => {
                let message = self.eval(args)?.to_string();
                return Err(error!(UnhandledError; message));
            }
            "ASSERT" => self.assert_statement(args)?,
            "FOREACH" => self.foreach_statement(args)?,
            "CONST" => self.const_statement(args)?,
            "TYPEOF" => self.typeof_statement(args)?,
            "IMPORT" => self.import_statement(args)?,
            "PRINTF" => self.printf_statement(args)?,
            "JSON" => self.json_statement(args)?,
            "REGEX" => self.regex_statement(args)?,
            "ENUM" => self.enum_statement(args)?,
            "STRUCT" => self.struct_statement(args)?,
            "NEW" => self.new_statement(args)?,
            "LAMBDA" => self.lambda_statement(args)?,
            "MAP" | "FILTER" => self.map_statement(word, args)?,
            "REDUCE" => self.reduce_statement(args)?,
            _ => return Ok(None),
        };
        Ok(Some(signal))
    }
}

/// Text after the leading keyword, trimmed.
pub(super) fn rest_after<'a>(text: &'a str, word: &str) -> &'a str {
    let text = text.trim_start();
    match text.get(..word.len()) {
        Some(head) if head.eq_ignore_ascii_case(word) => text[word.len()..].trim(),
        _ => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pilot_command() {
        assert_eq!(pilot_command("T:hello"), Some(('T', "hello")));
        assert_eq!(pilot_command("a:NAME"), Some(('A', "NAME")));
        assert_eq!(pilot_command("TO square"), None);
        assert_eq!(pilot_command("done:"), None);
    }

    #[test]
    fn test_comments() {
        assert!(is_comment("REM hello"));
        assert!(is_comment("' note"));
        assert!(is_comment("* a remark"));
        assert!(!is_comment("*loop"));
        assert!(!is_comment("REMAINDER = 1"));
    }

    #[test]
    fn test_rest_after() {
        assert_eq!(rest_after("print  1; 2", "PRINT"), "1; 2");
        assert_eq!(rest_after("? X", "?"), "X");
    }
}
