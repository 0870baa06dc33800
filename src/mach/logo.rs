use super::dispatch::rest_after;
use super::runtime::{grow_stack, Signal};
use super::{Boundary, Runtime, Val};
use crate::error;
use crate::lang::{first_word, matching_bracket, split_top, Error};

type Result<T> = std::result::Result<T, Error>;

const LOGO_KEYWORDS: &[&str] = &[
    "FORWARD", "FD", "BACK", "BK", "BACKWARD", "LEFT", "LT", "RIGHT", "RT", "PENUP", "PU",
    "PENDOWN", "PD", "HOME", "CLEARSCREEN", "CS", "CLEAN", "SETXY", "SETPOS", "SETX", "SETY",
    "SETHEADING", "SETH", "TOWARDS", "SHOWTURTLE", "ST", "HIDETURTLE", "HT", "SETCOLOR",
    "SETCOLOUR", "SETPENCOLOR", "SETPC", "SETPENSIZE", "SETWIDTH", "SETFILLCOLOR", "SETFC",
    "SETBACKGROUND", "SETBG", "SETSCREENCOLOR", "SETSCREENCOLOUR", "CIRCLE", "ARC", "DOT",
    "RECT", "RECTANGLE", "SQUARE", "TRIANGLE", "POLYGON", "STAR", "FILL", "FILLED", "REPEAT",
    "MAKE", "HEADING", "POS", "POSITION", "XCOR", "YCOR", "TRACE", "NOTRACE", "LABEL", "STAMP",
    "PENCOLOR?", "PENSIZE?", "WRAP", "WINDOW", "FENCE",
];

/// BASIC words that also start a new command inside a REPEAT block.
const BLOCK_KEYWORDS: &[&str] = &[
    "PRINT", "LET", "IF", "FOR", "GOTO", "GOSUB", "REM", "END", "STOP",
];

pub(super) fn is_logo_keyword(word: &str) -> bool {
    LOGO_KEYWORDS.contains(&word)
}

/// `:NAME` reads as `NAME`. Colons inside strings or after a word
/// character (as in `T:`) stay.
pub(super) fn strip_colons(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quoted = false;
    let mut prev = ' ';
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            quoted = !quoted;
        }
        let drop = !quoted
            && c == ':'
            && !(prev.is_ascii_alphanumeric() || prev == '_' || prev == '$')
            && matches!(chars.peek(), Some(n) if n.is_ascii_alphabetic() || *n == '_');
        if !drop {
            out.push(c);
        }
        prev = c;
    }
    out
}

/// Arguments separated by commas when present, otherwise by spaces.
fn logo_args(text: &str) -> Vec<String> {
    let text = text.trim().trim_start_matches('[').trim_end_matches(']');
    let pieces = split_top(text, ',');
    if pieces.len() > 1 {
        return pieces;
    }
    let mut args: Vec<String> = vec![];
    for piece in split_top(text, ' ').into_iter().filter(|p| !p.is_empty()) {
        match args.last_mut() {
            Some(prev) if joins(prev, &piece) => {
                prev.push(' ');
                prev.push_str(&piece);
            }
            _ => args.push(piece),
        }
    }
    args
}

/// `N + 10` stays one argument; `10 -5` is two.
fn joins(prev: &str, next: &str) -> bool {
    const OPS: &[char] = &['+', '-', '*', '/', '^', '<', '>', '='];
    prev.ends_with(OPS) || (next.starts_with(OPS) && !(next.starts_with('-') && next.len() > 1))
}

/// Two decimals at most, whole numbers without a fraction.
fn show(n: f64) -> String {
    Val::number((n * 100.0).round() / 100.0).to_string()
}

impl Runtime {
    /// One turtle command, REPEAT or MAKE.
    pub(super) fn logo(&mut self, text: &str) -> Result<Signal> {
        let text = strip_colons(text.trim());
        let word = first_word(&text);
        let rest = rest_after(&text, &word);
        match word.as_str() {
            "REPEAT" => return self.repeat(rest),
            "MAKE" => return self.make(rest),
            _ => {}
        }
        if !is_logo_keyword(&word) {
            if self
                .program
                .procedures()
                .contains_key(&word.to_ascii_lowercase())
            {
                return self.call_procedure(&text);
            }
            return Err(error!(UnknownCommand; text));
        }
        self.turtle_command(&word, rest)?;
        self.mirror_turtle();
        Ok(Signal::Continue)
    }

    fn turtle_command(&mut self, word: &str, rest: &str) -> Result<()> {
        match word {
            "FORWARD" | "FD" => {
                let n = self.eval_number(rest)?;
                self.turtle.forward(n);
            }
            "BACK" | "BK" | "BACKWARD" => {
                let n = self.eval_number(rest)?;
                self.turtle.forward(-n);
            }
            "LEFT" | "LT" => {
                let n = self.eval_number(rest)?;
                self.turtle.turn(-n);
            }
            "RIGHT" | "RT" => {
                let n = self.eval_number(rest)?;
                self.turtle.turn(n);
            }
            "PENUP" | "PU" => self.turtle.set_pen_down(false),
            "PENDOWN" | "PD" => self.turtle.set_pen_down(true),
            "HOME" => self.turtle.home(),
            "CLEARSCREEN" | "CS" | "CLEAN" => self.turtle.clear_screen(),
            "SETXY" | "SETPOS" => {
                let (x, y) = self.point(rest)?;
                self.turtle.set_pos(x, y);
            }
            "SETX" => {
                let x = self.eval_number(rest)?;
                let y = self.turtle.y();
                self.turtle.set_pos(x, y);
            }
            "SETY" => {
                let y = self.eval_number(rest)?;
                let x = self.turtle.x();
                self.turtle.set_pos(x, y);
            }
            "SETHEADING" | "SETH" => {
                let h = self.eval_number(rest)?;
                self.turtle.set_heading(h);
            }
            "TOWARDS" => {
                let (x, y) = self.point(rest)?;
                self.turtle.towards(x, y);
            }
            "SHOWTURTLE" | "ST" => self.turtle.set_visible(true),
            "HIDETURTLE" | "HT" => self.turtle.set_visible(false),
            "SETCOLOR" | "SETCOLOUR" | "SETPENCOLOR" | "SETPC" => {
                let color = self.color_arg(rest)?;
                self.turtle.set_pen_color(&color);
            }
            "SETFILLCOLOR" | "SETFC" => {
                let color = self.color_arg(rest)?;
                self.turtle.set_fill_color(&color);
            }
            "SETBACKGROUND" | "SETBG" | "SETSCREENCOLOR" | "SETSCREENCOLOUR" => {
                let color = self.color_arg(rest)?;
                self.turtle.set_background(&color);
            }
            "SETPENSIZE" | "SETWIDTH" => {
                let n = self.eval_number(rest)?;
                self.turtle.set_pen_width(n);
            }
            "CIRCLE" => {
                let r = self.eval_number(rest)?;
                self.turtle.circle(r);
            }
            "ARC" => {
                let args = logo_args(rest);
                let angle = self.arg(&args, 0, 90.0)?;
                let radius = self.arg(&args, 1, 50.0)?;
                self.turtle.arc(angle, radius);
            }
            "DOT" => {
                let args = logo_args(rest);
                let size = self.arg(&args, 0, 3.0)?;
                self.turtle.dot(size);
            }
            "RECT" | "RECTANGLE" => {
                let args = logo_args(rest);
                let w = self.arg(&args, 0, 50.0)?;
                let h = self.arg(&args, 1, w)?;
                self.turtle.rect(w, h);
            }
            "SQUARE" | "TRIANGLE" => {
                let args = logo_args(rest);
                let len = self.arg(&args, 0, 50.0)?;
                self.turtle.polygon(if word == "SQUARE" { 4 } else { 3 }, len);
            }
            "POLYGON" | "STAR" => {
                let args = logo_args(rest);
                let default = if word == "STAR" { 5.0 } else { 6.0 };
                let n = self.arg(&args, 0, default)?.max(0.0) as usize;
                let len = self.arg(&args, 1, 50.0)?;
                self.charge(n)?;
                if word == "STAR" {
                    self.turtle.star(n, len);
                } else {
                    self.turtle.polygon(n, len);
                }
            }
            "FILL" | "FILLED" => self.print("FILL: (visual fill not supported in vector canvas)\n"),
            "HEADING" => {
                let line = format!("Heading: {}\n", show(self.turtle.heading()));
                self.print(&line);
            }
            "POS" | "POSITION" => {
                let line = format!(
                    "Position: [{}, {}]\n",
                    show(self.turtle.x()),
                    show(self.turtle.y())
                );
                self.print(&line);
            }
            "XCOR" => {
                let line = format!("{}\n", show(self.turtle.x()));
                self.print(&line);
            }
            "YCOR" => {
                let line = format!("{}\n", show(self.turtle.y()));
                self.print(&line);
            }
            "PENCOLOR?" => {
                let line = format!("Pen color: {}\n", self.turtle.pen_color());
                self.print(&line);
            }
            "PENSIZE?" => {
                let line = format!("Pen size: {}\n", show(self.turtle.pen_width()));
                self.print(&line);
            }
            "TRACE" => self.turtle.set_trace(true),
            "NOTRACE" => self.turtle.set_trace(false),
            "WRAP" => self.turtle.set_boundary(Boundary::Wrap),
            "WINDOW" => self.turtle.set_boundary(Boundary::Window),
            "FENCE" => self.turtle.set_boundary(Boundary::Fence),
            "STAMP" if rest.is_empty() => self.turtle.stamp(),
            "LABEL" | "STAMP" => self.label(rest)?,
            _ => return Err(error!(UnknownCommand; word)),
        }
        Ok(())
    }

    fn arg(&mut self, args: &[String], index: usize, default: f64) -> Result<f64> {
        match args.get(index) {
            Some(arg) => self.eval_number(arg),
            None => Ok(default),
        }
    }

    fn point(&mut self, rest: &str) -> Result<(f64, f64)> {
        let args = logo_args(rest);
        if args.len() != 2 {
            return Err(error!(SyntaxError; "EXPECTED X AND Y"));
        }
        Ok((self.eval_number(&args[0])?, self.eval_number(&args[1])?))
    }

    /// `LABEL "text" [size]` or `LABEL expr [size]`
    fn label(&mut self, rest: &str) -> Result<()> {
        let mut raw = rest.trim();
        let mut size = 12.0;
        if let Some((head, tail)) = raw.rsplit_once(' ') {
            if let Ok(n) = tail.parse::<f64>() {
                size = n;
                raw = head.trim();
            }
        }
        let text = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            raw[1..raw.len() - 1].to_string()
        } else {
            self.eval(raw)?.to_string()
        };
        self.turtle.text(&text, size);
        Ok(())
    }

    /// Mirrors the pose into variables and prints it when tracing.
    fn mirror_turtle(&mut self) {
        let pose = [
            ("TURTLE_X", self.turtle.x()),
            ("TURTLE_Y", self.turtle.y()),
            ("TURTLE_HEADING", self.turtle.heading()),
        ];
        for (name, value) in pose {
            self.vars.store_unchecked(name, Val::number(value));
        }
        if self.turtle.is_tracing() {
            let line = format!("{}\n", self.turtle.describe());
            self.print(&line);
        }
    }

    /// `MAKE "name value`
    fn make(&mut self, rest: &str) -> Result<Signal> {
        let (name, value) = match rest.split_once(char::is_whitespace) {
            Some((name, value)) => (name, value.trim()),
            None => return Err(error!(SyntaxError; "MAKE \"NAME VALUE")),
        };
        let name = name.trim_matches('"').to_ascii_uppercase();
        let is_word = value.starts_with('"') && (value.len() == 1 || !value.ends_with('"'));
        let value = if is_word {
            Val::String(value[1..].to_string())
        } else {
            self.eval(value)?
        };
        self.vars.store(&name, value)?;
        Ok(Signal::Continue)
    }

    /// `REPEAT n [ commands ]` with REPCOUNT counting from 1.
    fn repeat(&mut self, rest: &str) -> Result<Signal> {
        let open = match rest.find('[') {
            Some(open) => open,
            None => return Err(error!(SyntaxError; "REPEAT n [ commands ]")),
        };
        let close = match matching_bracket(rest, open) {
            Some(close) => close,
            None => return Err(error!(SyntaxError; "REPEAT WITHOUT ]")),
        };
        let count = self.eval_int(&rest[..open])?;
        let commands = self.split_commands(&rest[open + 1..close]);
        let outer = self.vars.fetch("REPCOUNT");
        let mut outcome = Ok(None);
        for n in 1..=count.max(0) {
            self.vars.store_unchecked("REPCOUNT", Val::Integer(n));
            outcome = self.tick().and_then(|_| self.run_commands(&commands));
            if !matches!(outcome, Ok(None)) {
                break;
            }
        }
        match outer {
            Some(val) => self.vars.store_unchecked("REPCOUNT", val),
            None => {
                self.vars.unset("REPCOUNT");
            }
        }
        Ok(outcome?.unwrap_or(Signal::Continue))
    }

    /// Runs block commands in order. `Some` carries a signal that ends
    /// the block early; STOP inside a procedure is `Return`.
    fn run_commands(&mut self, commands: &[String]) -> Result<Option<Signal>> {
        for command in commands {
            let command = strip_colons(command);
            if self.logo_depth > 0 && first_word(&command) == "STOP" {
                return Ok(Some(Signal::Return));
            }
            self.tick()?;
            match self.dispatch(&command)? {
                Signal::Continue => {}
                signal => return Ok(Some(signal)),
            }
        }
        Ok(None)
    }

    fn starts_command(&self, word: &str) -> bool {
        is_logo_keyword(word)
            || BLOCK_KEYWORDS.contains(&word)
            || self
                .program
                .procedures()
                .contains_key(&word.to_ascii_lowercase())
    }

    /// Cuts a block into commands at newlines, at a closing `]` and
    /// before each command word. An IF keeps the rest of its line.
    pub(super) fn split_commands(&self, block: &str) -> Vec<String> {
        let mut commands = vec![];
        let mut push = |piece: &str| {
            let piece = piece.trim();
            if !piece.is_empty() {
                commands.push(piece.to_string());
            }
        };
        let mut depth = 0i32;
        let mut quoted = false;
        let mut start = 0;
        for (i, c) in block.char_indices() {
            match c {
                '"' => quoted = !quoted,
                _ if quoted => {}
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        push(&block[start..=i]);
                        start = i + 1;
                    }
                }
                '\n' if depth == 0 => {
                    push(&block[start..i]);
                    start = i + 1;
                }
                ' ' | '\t' if depth == 0 => {
                    let current = &block[start..i];
                    let next = first_word(&block[i + 1..]);
                    if !current.trim().is_empty()
                        && first_word(current) != "IF"
                        && self.starts_command(&next)
                    {
                        push(current);
                        start = i + 1;
                    }
                }
                _ => {}
            }
        }
        push(&block[start..]);
        commands
    }

    /// Runs a `TO` procedure with its arguments bound to the parameters.
    pub(super) fn call_procedure(&mut self, text: &str) -> Result<Signal> {
        let text = strip_colons(text);
        let word = first_word(&text);
        let procedure = match self.program.procedures().get(&word.to_ascii_lowercase()) {
            Some(procedure) => procedure.clone(),
            None => return Err(error!(UndefinedUserFunction; word)),
        };
        let mut args = vec![];
        for arg in logo_args(rest_after(&text, &word)) {
            args.push(self.eval(&arg)?);
        }
        if self.logo_depth >= self.config.max_call_depth {
            return Err(error!(OutOfMemory; format!("{} NESTED TOO DEEPLY", word)));
        }
        let commands: Vec<String> = procedure
            .body
            .iter()
            .flat_map(|line| self.split_commands(line))
            .collect();
        let saved = self.bind(&procedure.params, args);
        self.logo_depth += 1;
        let outcome = grow_stack(|| self.run_commands(&commands));
        self.logo_depth -= 1;
        self.restore(saved);
        match outcome? {
            None | Some(Signal::Return) => Ok(Signal::Continue),
            Some(signal) => Ok(signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_colons() {
        assert_eq!(strip_colons("FD :SIZE * 2"), "FD SIZE * 2");
        assert_eq!(strip_colons("T:hello"), "T:hello");
        assert_eq!(strip_colons("PRINT \"a :b\""), "PRINT \"a :b\"");
    }

    #[test]
    fn test_logo_args() {
        assert_eq!(logo_args("10 20"), vec!["10", "20"]);
        assert_eq!(logo_args("X + 1, Y"), vec!["X + 1", "Y"]);
        assert_eq!(logo_args("[10 20]"), vec!["10", "20"]);
        assert_eq!(logo_args("N + 10"), vec!["N + 10"]);
        assert_eq!(logo_args("10 -5"), vec!["10", "-5"]);
    }

    #[test]
    fn test_split_commands() {
        let rt = Runtime::default();
        assert_eq!(
            rt.split_commands("FD 10 RT 90 REPEAT 2 [FD 5 LT 45] PRINT REPCOUNT"),
            vec!["FD 10", "RT 90", "REPEAT 2 [FD 5 LT 45]", "PRINT REPCOUNT"]
        );
        assert_eq!(
            rt.split_commands("IF N > 1 THEN FD N\nRT 90"),
            vec!["IF N > 1 THEN FD N", "RT 90"]
        );
    }
}
