use super::dispatch::rest_after;
use super::runtime::{Clause, DoFrame, LoopFrame, SelectFrame, Signal};
use super::val::{repeat_text, MAX_ELEMENTS};
use super::{color_name, Operation, Runtime, Val};
use crate::error;
use crate::lang::{
    find_assign, find_keyword, first_word, parse, split_keyword, split_print, split_top,
    strip_keyword, Error,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;

type Result<T> = std::result::Result<T, Error>;

/// `WHILE cond` or `UNTIL cond` after DO or LOOP.
fn clause(text: &str) -> Option<(Clause, String)> {
    if let Some(cond) = strip_keyword(text, "WHILE") {
        return Some((Clause::While, cond.to_string()));
    }
    strip_keyword(text, "UNTIL").map(|cond| (Clause::Until, cond.to_string()))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Runtime {
    pub(super) fn print_statement(&mut self, args: &str) -> Result<Signal> {
        let mut out = String::new();
        let mut newline = true;
        for (expr, sep) in split_print(args) {
            if !expr.is_empty() {
                out.push_str(&self.eval(&expr)?.to_string());
            }
            if sep == Some(',') {
                out.push('\t');
            }
            newline = sep.is_none();
        }
        if newline {
            out.push('\n');
        }
        self.print(&out);
        Ok(Signal::Continue)
    }

    pub(super) fn let_statement(&mut self, args: &str) -> Result<Signal> {
        let eq = match find_assign(args) {
            Some(eq) => eq,
            None => return Err(error!(SyntaxError; "EXPECTED =")),
        };
        let value = self.eval(&args[eq + 1..])?;
        self.assign(&args[..eq], value)?;
        Ok(Signal::Continue)
    }

    /// `INPUT ["prompt";] var [, var...]`
    pub(super) fn input_statement(&mut self, args: &str) -> Result<Signal> {
        let (prompt, targets) = match split_top(args, ';').as_slice() {
            [prompt, targets] if prompt.starts_with('"') => {
                (Some(self.eval(prompt)?.to_string()), targets.clone())
            }
            _ => match split_top(args, ',').as_slice() {
                [prompt, rest @ ..] if prompt.starts_with('"') && !rest.is_empty() => {
                    (Some(self.eval(prompt)?.to_string()), rest.join(","))
                }
                _ => (None, args.to_string()),
            },
        };
        let prompt = match prompt {
            Some(p) => format!("{} ", p.trim_end()),
            None => "? ".to_string(),
        };
        for target in split_top(&targets, ',') {
            let answer = self.request(&prompt)?;
            self.assign(&target, Val::coerce(&answer))?;
        }
        Ok(Signal::Continue)
    }

    pub(super) fn if_statement(&mut self, text: &str) -> Result<Signal> {
        let body = rest_after(text, "IF");
        let (cond, rest) = match split_keyword(body, "THEN") {
            Some(pair) => pair,
            None => match find_keyword(body, "GOTO") {
                Some(i) => (body[..i].trim(), &body[i..]),
                None => return Err(error!(SyntaxError; "IF WITHOUT THEN")),
            },
        };
        if rest.is_empty() {
            return if self.eval_bool(cond)? {
                Ok(Signal::Continue)
            } else {
                self.skip_if_chain(self.pc, self.pc)
            };
        }
        let (then_part, else_part) = match split_keyword(rest, "ELSE") {
            Some((t, e)) => (t, Some(e)),
            None => (rest, None),
        };
        let branch = if self.eval_bool(cond)? {
            Some(then_part)
        } else {
            else_part
        };
        match branch {
            Some(branch) => self.inline_branch(branch),
            None => Ok(Signal::Continue),
        }
    }

    /// A bare line number after THEN or ELSE is a GOTO.
    fn inline_branch(&mut self, branch: &str) -> Result<Signal> {
        if !branch.is_empty() && branch.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Signal::JumpTo(self.resolve_target(branch)?));
        }
        self.dispatch(branch)
    }

    /// Moves to the first satisfied ELSEIF, the ELSE, or past END IF.
    fn skip_if_chain(&mut self, opener: usize, from: usize) -> Result<Signal> {
        let mut line = from;
        loop {
            let marker = match self.program.blocks().next_marker(opener, line) {
                Some(marker) => marker,
                None => return Err(error!(MissingEnd; "IF WITHOUT END IF")),
            };
            let text = self
                .program
                .line(marker)
                .map(|l| l.text().to_string())
                .unwrap_or_default();
            let cond = match first_word(&text).as_str() {
                "ELSEIF" => Some(rest_after(&text, "ELSEIF").to_string()),
                "ELSE" => {
                    let rest = rest_after(&text, "ELSE");
                    strip_keyword(rest, "IF").map(str::to_string)
                }
                _ => return Ok(Signal::JumpTo(marker + 1)),
            };
            match cond {
                None => return Ok(Signal::JumpTo(marker + 1)),
                Some(cond) => {
                    let cond = match split_keyword(&cond, "THEN") {
                        Some((c, _)) => c.to_string(),
                        None => cond,
                    };
                    if self.eval_bool(&cond)? {
                        return Ok(Signal::JumpTo(marker + 1));
                    }
                    line = marker;
                }
            }
        }
    }

    /// ELSE or ELSEIF reached from a branch that ran: leave the IF.
    pub(super) fn else_statement(&mut self) -> Result<Signal> {
        match self.program.blocks().opener(self.pc) {
            Some(opener) => Ok(Signal::JumpTo(self.closer_after(opener)?)),
            None => Err(error!(SyntaxError; "ELSE WITHOUT IF")),
        }
    }

    pub(super) fn end_statement(&mut self, args: &str) -> Result<Signal> {
        match first_word(args).as_str() {
            "" => Ok(Signal::End),
            "IF" => Ok(Signal::Continue),
            "SELECT" => {
                let opener = self.program.blocks().opener(self.pc);
                if opener.is_some() && self.selects.last().map(|f| f.opener) == opener {
                    self.selects.pop();
                }
                Ok(Signal::Continue)
            }
            "SUB" | "FUNCTION" => {
                if self.calls.is_empty() {
                    Ok(Signal::Continue)
                } else {
                    Ok(Signal::Return)
                }
            }
            "TRY" => {
                if self.tries.last().map(|f| f.end) == Some(self.pc) {
                    self.tries.pop();
                }
                Ok(Signal::Continue)
            }
            _ => Err(error!(SyntaxError; format!("END {}", args))),
        }
    }

    /// `FOR var = start TO limit [STEP step]`
    pub(super) fn for_statement(&mut self, args: &str) -> Result<Signal> {
        let (assign, rest) = match split_keyword(args, "TO") {
            Some(pair) => pair,
            None => return Err(error!(SyntaxError; "FOR WITHOUT TO")),
        };
        let (limit, step) = match split_keyword(rest, "STEP") {
            Some((limit, step)) => (limit, Some(step)),
            None => (rest, None),
        };
        let eq = match find_assign(assign) {
            Some(eq) => eq,
            None => return Err(error!(SyntaxError; "FOR WITHOUT =")),
        };
        let var = assign[..eq].trim().to_ascii_uppercase();
        let start = self.eval(&assign[eq + 1..])?;
        let limit = self.eval_number(limit)?;
        let step = match step {
            Some(step) => self.eval(step)?,
            None => Val::Integer(1),
        };
        let step_n = step.to_f64()?;
        if step_n == 0.0 {
            return Err(error!(IllegalFunctionCall; "FOR STEP CANNOT BE 0"));
        }
        self.vars.store(&var, start.clone())?;
        let opener = self.pc;
        if let Some(pos) = self.loops.iter().position(|f| match f {
            LoopFrame::For { var: v, .. } => *v == var,
            LoopFrame::Foreach { opener: o, .. } => *o == opener,
        }) {
            self.loops.truncate(pos);
        }
        let start = start.to_f64()?;
        if (step_n > 0.0 && start > limit) || (step_n < 0.0 && start < limit) {
            return match self.program.blocks().closer(opener) {
                Some(closer) => Ok(Signal::JumpTo(closer + 1)),
                None => Err(error!(ForWithoutNext)),
            };
        }
        self.loops.push(LoopFrame::For {
            var,
            limit,
            step,
            opener,
        })?;
        Ok(Signal::Continue)
    }

    /// `NEXT [var]` closes FOR and FOREACH alike.
    pub(super) fn next_statement(&mut self, args: &str) -> Result<Signal> {
        let name = args.split(',').next().unwrap_or("").trim().to_ascii_uppercase();
        let pos = if name.is_empty() {
            self.loops.len().checked_sub(1)
        } else {
            self.loops.iter().rposition(|f| match f {
                LoopFrame::For { var, .. } => *var == name,
                LoopFrame::Foreach { vars, .. } => vars.contains(&name),
            })
        };
        let pos = match pos {
            Some(pos) => pos,
            None => return Err(error!(NextWithoutFor)),
        };
        self.loops.truncate(pos + 1);
        let mut bind = None;
        let again = match self.loops.last_mut() {
            Some(LoopFrame::For {
                var,
                limit,
                step,
                opener,
            }) => {
                let value = self.vars.fetch_or_default(var);
                let value = Operation::sum(value, step.clone())?;
                let n = value.to_f64()?;
                let again = if step.to_f64()? > 0.0 {
                    n <= *limit
                } else {
                    n >= *limit
                };
                bind = Some((vec![var.clone()], vec![value]));
                again.then_some(*opener)
            }
            Some(LoopFrame::Foreach {
                vars,
                items,
                index,
                opener,
            }) => {
                *index += 1;
                match items.get(*index) {
                    Some(item) => {
                        bind = Some((vars.clone(), item.clone()));
                        Some(*opener)
                    }
                    None => None,
                }
            }
            None => return Err(error!(NextWithoutFor)),
        };
        if let Some((names, values)) = bind {
            for (name, value) in names.iter().zip(values) {
                self.vars.store(name, value)?;
            }
        }
        match again {
            Some(opener) => Ok(Signal::JumpTo(opener + 1)),
            None => {
                self.loops.pop();
                Ok(Signal::Continue)
            }
        }
    }

    pub(super) fn while_statement(&mut self, cond: &str) -> Result<Signal> {
        let opener = self.pc;
        if self.eval_bool(cond)? {
            if self.whiles.last() != Some(&opener) {
                self.whiles.push(opener)?;
            }
            return Ok(Signal::Continue);
        }
        if self.whiles.last() == Some(&opener) {
            self.whiles.pop();
        }
        match self.program.blocks().closer(opener) {
            Some(closer) => Ok(Signal::JumpTo(closer + 1)),
            None => Err(error!(WhileWithoutWend)),
        }
    }

    pub(super) fn wend_statement(&mut self) -> Result<Signal> {
        let opener = match self.whiles.last() {
            Some(&opener) => opener,
            None => return Err(error!(WendWithoutWhile)),
        };
        let text = self
            .program
            .line(opener)
            .map(|l| l.text().to_string())
            .unwrap_or_default();
        if self.eval_bool(rest_after(&text, "WHILE"))? {
            Ok(Signal::JumpTo(opener + 1))
        } else {
            self.whiles.pop();
            Ok(Signal::Continue)
        }
    }

    pub(super) fn do_statement(&mut self, args: &str) -> Result<Signal> {
        let opener = self.pc;
        let clause = clause(args);
        let enter = match &clause {
            Some((kind, cond)) => self.clause_holds(*kind, cond)?,
            None => true,
        };
        if let Some(pos) = self.dos.iter().position(|f| f.opener == opener) {
            self.dos.truncate(pos);
        }
        if !enter {
            return match self.program.blocks().closer(opener) {
                Some(closer) => Ok(Signal::JumpTo(closer + 1)),
                None => Err(error!(DoWithoutLoop)),
            };
        }
        self.dos.push(DoFrame { opener, clause })?;
        Ok(Signal::Continue)
    }

    /// A LOOP without its own clause re-tests the one given on DO.
    pub(super) fn loop_statement(&mut self, args: &str) -> Result<Signal> {
        let (opener, own) = match self.dos.last() {
            Some(frame) => (frame.opener, clause(args).or_else(|| frame.clause.clone())),
            None => return Err(error!(LoopWithoutDo)),
        };
        let again = match own {
            Some((kind, cond)) => self.clause_holds(kind, &cond)?,
            None => true,
        };
        if again {
            Ok(Signal::JumpTo(opener + 1))
        } else {
            self.dos.pop();
            Ok(Signal::Continue)
        }
    }

    fn clause_holds(&mut self, kind: Clause, cond: &str) -> Result<bool> {
        let value = self.eval_bool(cond)?;
        Ok(match kind {
            Clause::While => value,
            Clause::Until => !value,
        })
    }

    /// `EXIT FOR|DO|WHILE|SUB|FUNCTION`
    pub(super) fn exit_statement(&mut self, args: &str) -> Result<Signal> {
        let opener = match first_word(args).as_str() {
            "FOR" | "FOREACH" => self.loops.pop().map(|f| f.opener()),
            "WHILE" => self.whiles.pop(),
            "DO" => self.dos.pop().map(|f| f.opener),
            "SUB" | "FUNCTION" if !self.calls.is_empty() => return Ok(Signal::Return),
            "SUB" | "FUNCTION" => return Ok(Signal::Continue),
            _ => return Err(error!(SyntaxError; format!("EXIT {}", args))),
        };
        match opener {
            Some(opener) => Ok(Signal::JumpTo(self.closer_after(opener)?)),
            None => Err(error!(SyntaxError; format!("EXIT {} OUTSIDE LOOP", args.trim()))),
        }
    }

    /// Label first, then line tag.
    pub(super) fn resolve_target(&self, target: &str) -> Result<usize> {
        let target = target.trim().trim_start_matches('*').trim();
        if let Some(index) = self.program.label(target) {
            return Ok(index);
        }
        if let Ok(tag) = target.parse::<u32>() {
            if let Some(index) = self.program.tag(tag) {
                return Ok(index);
            }
        }
        Err(error!(UndefinedLine; target))
    }

    pub(super) fn gosub(&mut self, target: &str) -> Result<Signal> {
        let index = self.resolve_target(target)?;
        self.gosubs.push(self.pc + 1)?;
        Ok(Signal::JumpTo(index))
    }

    /// GOSUB frames opened inside the active call win over the call itself.
    pub(super) fn return_statement(&mut self, args: &str) -> Result<Signal> {
        if self.gosubs.len() > self.gosub_base() {
            if let Some(back) = self.gosubs.pop() {
                return Ok(Signal::JumpTo(back));
            }
        }
        if !self.calls.is_empty() {
            self.return_value = if args.is_empty() {
                None
            } else {
                Some(self.eval(args)?)
            };
            return Ok(Signal::Return);
        }
        Err(error!(ReturnWithoutGosub))
    }

    /// `ON expr GOTO|GOSUB t1, t2, ...`
    pub(super) fn on_statement(&mut self, args: &str) -> Result<Signal> {
        let (expr, targets, is_gosub) = match split_keyword(args, "GOSUB") {
            Some((expr, targets)) => (expr, targets, true),
            None => match split_keyword(args, "GOTO") {
                Some((expr, targets)) => (expr, targets, false),
                None => return Err(error!(SyntaxError; "ON WITHOUT GOTO OR GOSUB")),
            },
        };
        let n = self.eval_int(expr)?;
        let targets = split_top(targets, ',');
        let target = match usize::try_from(n).ok().and_then(|n| n.checked_sub(1)) {
            Some(i) if i < targets.len() => targets[i].clone(),
            _ => return Ok(Signal::Continue),
        };
        if is_gosub {
            self.gosub(&target)
        } else {
            Ok(Signal::JumpTo(self.resolve_target(&target)?))
        }
    }

    pub(super) fn select_statement(&mut self, args: &str) -> Result<Signal> {
        let expr = strip_keyword(args, "CASE").unwrap_or(args);
        let value = self.eval(expr)?;
        let opener = self.pc;
        if let Some(pos) = self.selects.iter().position(|f| f.opener == opener) {
            self.selects.truncate(pos);
        }
        self.selects.push(SelectFrame {
            opener,
            value,
            matched: false,
        })?;
        Ok(Signal::Continue)
    }

    /// Tests a CASE while nothing has matched; afterwards skips to END SELECT.
    pub(super) fn case_statement(&mut self, args: &str) -> Result<Signal> {
        let opener = match self.program.blocks().opener(self.pc) {
            Some(opener) => opener,
            None => return Err(error!(SyntaxError; "CASE WITHOUT SELECT")),
        };
        let (matched, value) = match self.selects.last() {
            Some(frame) if frame.opener == opener => (frame.matched, frame.value.clone()),
            _ => return Err(error!(SyntaxError; "CASE WITHOUT SELECT")),
        };
        if matched {
            return match self.program.blocks().closer(opener) {
                Some(closer) => Ok(Signal::JumpTo(closer)),
                None => Err(error!(MissingEnd; "SELECT WITHOUT END SELECT")),
            };
        }
        let hit = if first_word(args) == "ELSE" {
            true
        } else {
            self.case_matches(&value, args)?
        };
        if hit {
            if let Some(frame) = self.selects.last_mut() {
                frame.matched = true;
            }
            return Ok(Signal::Continue);
        }
        match self.program.blocks().next_marker(opener, self.pc) {
            Some(next) => Ok(Signal::JumpTo(next)),
            None => Err(error!(MissingEnd; "SELECT WITHOUT END SELECT")),
        }
    }

    /// Comma list of values, `a TO b` ranges and `IS op value` tests.
    fn case_matches(&mut self, value: &Val, args: &str) -> Result<bool> {
        for item in split_top(args, ',') {
            if let Some(test) = strip_keyword(&item, "IS") {
                let probe = format!("{} {}", "SELECT_CASE_", test);
                self.vars.store_unchecked("SELECT_CASE_", value.clone());
                let result = self.eval_bool(&probe);
                self.vars.unset("SELECT_CASE_");
                if result? {
                    return Ok(true);
                }
                continue;
            }
            if let Some((low, high)) = split_keyword(&item, "TO") {
                let low = self.eval(low)?;
                let high = self.eval(high)?;
                if Operation::compare(value, &low)? != Ordering::Less
                    && Operation::compare(value, &high)? != Ordering::Greater
                {
                    return Ok(true);
                }
                continue;
            }
            let candidate = self.eval(&item)?;
            if Operation::equal(value, &candidate) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `DIM A(10), B$(5)`
    pub(super) fn dim_statement(&mut self, args: &str) -> Result<Signal> {
        for item in split_top(args, ',') {
            match parse(&item)? {
                crate::lang::ast::Expression::Call(name, sizes) if sizes.len() == 1 => {
                    let size = self.evaluate(&sizes[0])?.to_i64()?;
                    if size < 0 {
                        return Err(error!(IllegalFunctionCall; format!("DIM {}", item)));
                    }
                    if size as u64 >= MAX_ELEMENTS as u64 {
                        return Err(error!(OutOfMemory; format!("DIM {}", item)));
                    }
                    self.vars.dimension_array(&name, size as usize);
                }
                _ => return Err(error!(SyntaxError; format!("DIM {}", item))),
            }
        }
        Ok(Signal::Continue)
    }

    pub(super) fn read_statement(&mut self, args: &str) -> Result<Signal> {
        for target in split_top(args, ',') {
            let value = match self.program.data().get(self.data_pos) {
                Some(value) => value.clone(),
                None => return Err(error!(OutOfData)),
            };
            self.data_pos += 1;
            self.assign(&target, value)?;
        }
        Ok(Signal::Continue)
    }

    /// `RANDOMIZE`, `RANDOMIZE TIMER` or `RANDOMIZE seed`
    pub(super) fn randomize(&mut self, args: &str) -> Result<Signal> {
        if args.is_empty() || args.eq_ignore_ascii_case("TIMER") {
            self.rng = StdRng::from_entropy();
        } else {
            let seed = self.eval_int(args)?;
            self.rng = StdRng::seed_from_u64(seed as u64);
        }
        Ok(Signal::Continue)
    }

    pub(super) fn swap(&mut self, args: &str) -> Result<Signal> {
        let names = split_top(args, ',');
        if names.len() != 2 {
            return Err(error!(SyntaxError; "SWAP NEEDS TWO VARIABLES"));
        }
        let a = self.eval(&names[0])?;
        let b = self.eval(&names[1])?;
        self.assign(&names[0], b)?;
        self.assign(&names[1], a)?;
        Ok(Signal::Continue)
    }

    /// INCR and DECR, with an optional amount.
    pub(super) fn step_var(&mut self, args: &str, sign: i64) -> Result<Signal> {
        let parts = split_top(args, ',');
        let target = match parts.first() {
            Some(target) if !target.is_empty() => target.clone(),
            _ => return Err(error!(SyntaxError; "MISSING VARIABLE")),
        };
        let amount = match parts.get(1) {
            Some(amount) => self.eval(amount)?,
            None => Val::Integer(1),
        };
        let current = self.eval(&target)?;
        let value = if sign < 0 {
            Operation::subtract(current, amount)?
        } else {
            Operation::sum(current, amount)?
        };
        self.assign(&target, value)?;
        Ok(Signal::Continue)
    }

    /// Color by palette number, quoted name, bare word or expression.
    pub(super) fn color_arg(&mut self, raw: &str) -> Result<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(error!(SyntaxError; "MISSING COLOR"));
        }
        if is_identifier(raw) && !self.vars.contains(&raw.to_ascii_uppercase()) {
            return Ok(color_name(raw));
        }
        let value = self.eval(raw)?;
        Ok(color_name(&value.to_string()))
    }

    /// `TAB n` and `SPC n` print spaces without a newline.
    pub(super) fn spacing(&mut self, word: &str, args: &str) -> Result<Signal> {
        let n = if args.is_empty() {
            if word == "TAB" {
                8
            } else {
                1
            }
        } else {
            self.eval_int(args)?.max(0)
        };
        self.print(&repeat_text(" ", n)?);
        Ok(Signal::Continue)
    }

    /// `CALL name(args)`, `CALL name args` or a bare `name(args)`.
    pub(super) fn call_statement(&mut self, args: &str) -> Result<Signal> {
        let name = first_word(args);
        let rest = args.trim_start()[name.len()..].trim();
        let rest = match rest.strip_prefix('(') {
            Some(inner) => inner.strip_suffix(')').unwrap_or(inner),
            None => rest,
        };
        let mut values = vec![];
        for arg in split_top(rest, ',') {
            values.push(self.eval(&arg)?);
        }
        self.call_routine(&name, values)?;
        if self.halted {
            return Ok(Signal::End);
        }
        Ok(Signal::Continue)
    }
}
