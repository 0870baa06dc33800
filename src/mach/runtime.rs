use super::file::FileTable;
use super::{
    Canvas, Config, Input, Output, Profiler, Program, Stack, StdInput, StdOutput, StopHandle,
    Turtle, Val, Var,
};
use crate::error;
use crate::lang::ast::Expression;
use crate::lang::{Error, Fault, LineNumber};
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

type Result<T> = std::result::Result<T, Error>;

const STACK_RED_ZONE: usize = 256 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Runs a user call body, moving to a fresh stack segment when the native
/// stack is low so `max_call_depth` trips before the thread overflows.
pub(super) fn grow_stack<R>(body: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, body)
}

/// What a statement asks of the fetch-execute loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Advance to the next line.
    Continue,
    /// The handler already moved `pc`.
    Jump,
    JumpTo(usize),
    End,
    /// Leave the active SUB or FUNCTION.
    Return,
    /// Leave the innermost loop.
    Break,
}

#[derive(Debug)]
pub(super) enum LoopFrame {
    For {
        var: String,
        limit: f64,
        step: Val,
        opener: usize,
    },
    Foreach {
        vars: Vec<String>,
        items: Vec<Vec<Val>>,
        index: usize,
        opener: usize,
    },
}

impl LoopFrame {
    pub(super) fn opener(&self) -> usize {
        match self {
            LoopFrame::For { opener, .. } | LoopFrame::Foreach { opener, .. } => *opener,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Clause {
    While,
    Until,
}

#[derive(Debug)]
pub(super) struct DoFrame {
    pub opener: usize,
    pub clause: Option<(Clause, String)>,
}

#[derive(Debug)]
pub(super) struct SelectFrame {
    pub opener: usize,
    pub value: Val,
    pub matched: bool,
}

#[derive(Debug)]
pub(super) struct TryFrame {
    pub catch: Option<usize>,
    pub end: usize,
    /// Call depth at TRY; only faults at this depth are caught here.
    pub depth: usize,
    pub bases: Bases,
}

#[derive(Debug)]
pub(super) struct CallFrame {
    pub return_pc: usize,
    pub saved: Vec<(String, Option<Val>)>,
    pub bases: Bases,
}

/// Stack heights to unwind to when a call returns or a fault is caught.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Bases {
    gosubs: usize,
    pilot_calls: usize,
    loops: usize,
    whiles: usize,
    dos: usize,
    selects: usize,
    tries: usize,
}

#[derive(Debug, Clone)]
pub(super) struct Lambda {
    pub params: Vec<String>,
    pub body: Expression,
}

/// One recorded fault.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub error: Error,
    pub timestamp: DateTime<Local>,
}

impl ErrorRecord {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
    pub fn line(&self) -> LineNumber {
        self.error.line_number()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub error_history: Vec<ErrorRecord>,
    /// False when a fatal fault, stop request or breakpoint ended the run early.
    pub completed: bool,
}

/// ## Interpreter instance
///
/// Owns the loaded program, every variable and control stack, the turtle
/// and the host collaborators. One `run` at a time; independent instances
/// share nothing.

pub struct Runtime {
    pub(super) config: Config,
    pub(super) debug: bool,
    pub(super) program: Program,
    pub(super) pc: usize,
    pub(super) halted: bool,
    pub(super) fatal: bool,
    pub(super) iterations: usize,
    pub(super) vars: Var,
    pub(super) gosubs: Stack<usize>,
    pub(super) pilot_calls: Stack<usize>,
    pub(super) loops: Stack<LoopFrame>,
    pub(super) whiles: Stack<usize>,
    pub(super) dos: Stack<DoFrame>,
    pub(super) selects: Stack<SelectFrame>,
    pub(super) tries: Stack<TryFrame>,
    pub(super) calls: Stack<CallFrame>,
    pub(super) logo_depth: usize,
    pub(super) return_value: Option<Val>,
    pub(super) result: Val,
    pub(super) last_error: String,
    pub(super) data_pos: usize,
    pub(super) lambdas: HashMap<String, Lambda>,
    pub(super) structs: HashMap<String, Vec<String>>,
    pub(super) files: FileTable,
    pub(super) imported: HashSet<PathBuf>,
    pub(super) answer: Val,
    pub(super) matched: String,
    pub(super) status: i64,
    pub(super) left: String,
    pub(super) right: String,
    pub(super) match_flag: bool,
    pub(super) turtle: Turtle,
    pub(super) rng: StdRng,
    pub(super) started: Instant,
    pub(super) output: Box<dyn Output>,
    pub(super) input: Box<dyn Input>,
    pub(super) stop: StopHandle,
    pub(super) profiler: Profiler,
    pub(super) breakpoints: BTreeSet<usize>,
    pub(super) paused_at: Option<usize>,
    pub(super) watches: Vec<String>,
    pub(super) history: Vec<ErrorRecord>,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(Config::default())
    }
}

impl Runtime {
    pub fn new(config: Config) -> Runtime {
        let depth = config.max_call_depth;
        Runtime {
            config,
            debug: false,
            program: Program::default(),
            pc: 0,
            halted: false,
            fatal: false,
            iterations: 0,
            vars: Var::new(),
            gosubs: Stack::new("GOSUB STACK FULL"),
            pilot_calls: Stack::new("PILOT CALL STACK FULL"),
            loops: Stack::new("LOOP STACK FULL"),
            whiles: Stack::new("WHILE STACK FULL"),
            dos: Stack::new("DO STACK FULL"),
            selects: Stack::new("SELECT STACK FULL"),
            tries: Stack::new("TRY STACK FULL"),
            calls: Stack::with_limit("CALL STACK OVERFLOW", depth),
            logo_depth: 0,
            return_value: None,
            result: Val::Integer(0),
            last_error: String::new(),
            data_pos: 0,
            lambdas: HashMap::new(),
            structs: HashMap::new(),
            files: FileTable::default(),
            imported: HashSet::new(),
            answer: Val::String(String::new()),
            matched: String::new(),
            status: 0,
            left: String::new(),
            right: String::new(),
            match_flag: false,
            turtle: Turtle::default(),
            rng: StdRng::from_entropy(),
            started: Instant::now(),
            output: Box::new(StdOutput),
            input: Box::new(StdInput),
            stop: StopHandle::default(),
            profiler: Profiler::default(),
            breakpoints: BTreeSet::new(),
            paused_at: None,
            watches: vec![],
            history: vec![],
        }
    }

    pub fn with_output<O: Output + 'static>(mut self, output: O) -> Runtime {
        self.output = Box::new(output);
        self
    }

    pub fn with_input<I: Input + 'static>(mut self, input: I) -> Runtime {
        self.input = Box::new(input);
        self
    }

    pub fn with_canvas<C: Canvas + 'static>(mut self, canvas: C) -> Runtime {
        self.turtle = Turtle::new(Box::new(canvas));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Parses source without touching this instance.
    pub fn load(&self, source: &str) -> Program {
        Program::load(source)
    }

    pub fn run(&mut self, source: &str) -> RunResult {
        self.start(source);
        self.resume()
    }

    /// Loads a program and readies it for `resume` or `step`.
    pub fn start(&mut self, source: &str) {
        self.clear_state();
        self.program = Program::load(source);
        for diagnostic in self.program.diagnostics().to_vec() {
            self.record(diagnostic);
        }
    }

    /// Runs from the current line until the end, a fatal fault or a breakpoint.
    pub fn resume(&mut self) -> RunResult {
        self.stop.reset();
        self.fatal = false;
        let end = self.program.len();
        if let Err(error) = self.execute_range(end) {
            self.fatal = true;
            self.halted = true;
            self.record(error);
        }
        if self.profiler.is_enabled() && !self.profiler.is_empty() {
            let report = self.profiler.report(20);
            self.output.append(&format!("\n{}\n", report));
        }
        RunResult {
            error_history: self.history.clone(),
            completed: !self.fatal && self.paused_at.is_none(),
        }
    }

    /// Executes one line of the loaded program. False once nothing is left.
    pub fn step(&mut self) -> bool {
        if self.halted || self.pc >= self.program.len() {
            self.output.append("Program finished - nothing to step.\n");
            return false;
        }
        self.paused_at = None;
        match self.execute_one() {
            Ok(Some(Signal::End)) => self.halted = true,
            Ok(_) => {}
            Err(error) => {
                self.fatal = true;
                self.halted = true;
                self.record(error);
            }
        }
        !self.halted && self.pc < self.program.len()
    }

    /// Runs an immediate statement. State carries over between calls.
    pub fn execute_line(&mut self, text: &str) -> Result<()> {
        self.stop.reset();
        self.halted = false;
        self.iterations = 0;
        match self.dispatch(text)? {
            Signal::JumpTo(index) => {
                self.pc = index;
                let end = self.program.len();
                self.execute_range(end).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    pub fn reset(&mut self) {
        self.clear_state();
        self.program = Program::default();
        self.turtle.reset();
    }

    fn clear_state(&mut self) {
        self.pc = 0;
        self.halted = false;
        self.fatal = false;
        self.iterations = 0;
        self.vars.clear();
        self.gosubs.clear();
        self.pilot_calls.clear();
        self.loops.clear();
        self.whiles.clear();
        self.dos.clear();
        self.selects.clear();
        self.tries.clear();
        self.calls.clear();
        self.logo_depth = 0;
        self.return_value = None;
        self.result = Val::Integer(0);
        self.last_error.clear();
        self.data_pos = 0;
        self.lambdas.clear();
        self.structs.clear();
        self.files.close_all();
        self.imported.clear();
        self.answer = Val::String(String::new());
        self.matched.clear();
        self.status = 0;
        self.left.clear();
        self.right.clear();
        self.match_flag = false;
        self.started = Instant::now();
        self.paused_at = None;
        self.history.clear();
        self.profiler.reset();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    pub fn is_debug_mode(&self) -> bool {
        self.debug
    }

    /// One-based line. Returns true when the breakpoint is now set.
    pub fn toggle_breakpoint(&mut self, line: usize) -> bool {
        if self.breakpoints.remove(&line) {
            false
        } else {
            self.breakpoints.insert(line);
            true
        }
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &usize> {
        self.breakpoints.iter()
    }

    pub fn add_watch(&mut self, expr: &str) {
        let expr = expr.trim().to_string();
        if !expr.is_empty() && !self.watches.contains(&expr) {
            self.watches.push(expr);
        }
    }

    pub fn remove_watch(&mut self, expr: &str) -> bool {
        let before = self.watches.len();
        self.watches.retain(|w| w != expr.trim());
        before != self.watches.len()
    }

    pub fn watch_report(&mut self) -> String {
        if self.watches.is_empty() {
            return "  (no watches)\n".to_string();
        }
        let mut report = String::new();
        for expr in self.watches.clone() {
            let value = match self.eval(&expr) {
                Ok(val) => val.to_string(),
                Err(error) => format!("?{}", error),
            };
            report.push_str(&format!("  {} = {}\n", expr, value));
        }
        report
    }

    pub fn enable_profiler(&mut self, enabled: bool) {
        self.profiler.set_enabled(enabled);
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn var(&self, name: &str) -> Option<Val> {
        self.vars.fetch(&name.to_ascii_uppercase())
    }

    pub fn list(&self, name: &str) -> Option<&Vec<Val>> {
        self.vars.list(&name.to_ascii_uppercase())
    }

    pub fn dict(&self, name: &str) -> Option<&IndexMap<String, Val>> {
        self.vars.dict(&name.to_ascii_uppercase())
    }

    pub fn variables(&self) -> Vec<(String, Val)> {
        self.vars.snapshot()
    }

    pub fn turtle(&self) -> &Turtle {
        &self.turtle
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Zero-based index of the next line to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn error_history(&self) -> &[ErrorRecord] {
        &self.history
    }

    pub(super) fn record(&mut self, error: Error) {
        self.output.append(&format!("?{}\n", error));
        self.history.push(ErrorRecord {
            error,
            timestamp: Local::now(),
        });
    }

    /// Runs lines until `pc` reaches `end`. Returns `End` when the program
    /// stopped or paused and `Return` when a call body returned.
    pub(super) fn execute_range(&mut self, end: usize) -> Result<Signal> {
        while self.pc < end && !self.halted {
            let index = self.pc;
            if self.debug
                && self.calls.is_empty()
                && self.breakpoints.contains(&(index + 1))
                && self.paused_at != Some(index)
            {
                self.paused_at = Some(index);
                let report = self.watch_report();
                self.output
                    .append(&format!("BREAK IN {}\n{}", index + 1, report));
                return Ok(Signal::End);
            }
            self.paused_at = None;
            match self.execute_one()? {
                Some(Signal::End) => return Ok(Signal::End),
                Some(Signal::Return) => return Ok(Signal::Return),
                _ => {}
            }
            if self.config.exec_delay_ms > 0 && self.calls.is_empty() {
                self.pause(self.config.exec_delay_ms);
            }
        }
        Ok(if self.halted {
            Signal::End
        } else {
            Signal::Continue
        })
    }

    /// Fetches, dispatches and applies one line. `Some` carries a signal
    /// that must leave the current range.
    pub(super) fn execute_one(&mut self) -> Result<Option<Signal>> {
        let index = self.pc;
        self.tick().map_err(|e| e.in_line_number(Some(index + 1)))?;
        let text = match self.program.line(index) {
            Some(line) => line.text().to_string(),
            None => {
                self.halted = true;
                return Ok(Some(Signal::End));
            }
        };
        if text.is_empty() {
            self.pc += 1;
            return Ok(None);
        }
        if self.debug {
            self.output.append(&format!("[{}] {}\n", index + 1, text));
        }
        let started = Instant::now();
        let outcome = self.dispatch(&text);
        self.profiler.record(index + 1, &text, started.elapsed());
        let signal = match outcome {
            Ok(signal) => signal,
            Err(error) => {
                self.handle_fault(error)?;
                return Ok(None);
            }
        };
        match signal {
            Signal::Continue => self.pc += 1,
            Signal::Jump => {}
            Signal::JumpTo(target) => self.pc = target,
            Signal::End => {
                self.halted = true;
                return Ok(Some(Signal::End));
            }
            Signal::Return => return Ok(Some(Signal::Return)),
            Signal::Break => {
                if let Err(error) = self.break_loop() {
                    self.handle_fault(error)?;
                }
            }
        }
        Ok(None)
    }

    pub(super) fn tick(&mut self) -> Result<()> {
        if self.stop.is_stopped() {
            return Err(error!(Break));
        }
        self.charge(1)
    }

    /// Counts `steps` dispatched statements against the iteration guard.
    pub(super) fn charge(&mut self, steps: usize) -> Result<()> {
        self.iterations = self.iterations.saturating_add(steps);
        if self.iterations > self.config.max_iterations {
            return Err(error!(IterationLimit; "Maximum iterations reached (possible infinite loop)"));
        }
        Ok(())
    }

    /// Routes a fault raised by the line at `pc`. `Ok` means execution
    /// goes on with `pc` already moved.
    fn handle_fault(&mut self, error: Error) -> Result<()> {
        let error = error.in_line_number(Some(self.pc + 1));
        let fault = error.fault();
        if fault == Fault::Guard {
            return Err(error);
        }
        if matches!(fault, Fault::Dispatch | Fault::Load) {
            self.record(error);
            self.pc += 1;
            return Ok(());
        }
        let caught = matches!(self.tries.last(), Some(frame) if frame.depth == self.calls.len());
        if caught {
            if let Some(frame) = self.tries.pop() {
                self.unwind(frame.bases);
                let text = error.caught_text();
                self.last_error = text.clone();
                self.pc = match frame.catch {
                    Some(catch) => {
                        let name = self
                            .program
                            .line(catch)
                            .map(|l| l.text()[5..].trim().to_ascii_uppercase())
                            .unwrap_or_default();
                        if !name.is_empty() {
                            self.vars.store_unchecked(&name, Val::String(text));
                        }
                        catch + 1
                    }
                    None => frame.end + 1,
                };
                return Ok(());
            }
        }
        if self.config.continue_on_error || self.debug {
            self.record(error);
            self.pc += 1;
            return Ok(());
        }
        Err(error)
    }

    pub(super) fn bases(&self) -> Bases {
        Bases {
            gosubs: self.gosubs.len(),
            pilot_calls: self.pilot_calls.len(),
            loops: self.loops.len(),
            whiles: self.whiles.len(),
            dos: self.dos.len(),
            selects: self.selects.len(),
            tries: self.tries.len(),
        }
    }

    pub(super) fn unwind(&mut self, bases: Bases) {
        self.gosubs.truncate(bases.gosubs);
        self.pilot_calls.truncate(bases.pilot_calls);
        self.loops.truncate(bases.loops);
        self.whiles.truncate(bases.whiles);
        self.dos.truncate(bases.dos);
        self.selects.truncate(bases.selects);
        self.tries.truncate(bases.tries);
    }

    /// GOSUB frames pushed inside the active call.
    pub(super) fn gosub_base(&self) -> usize {
        self.calls.last().map_or(0, |frame| frame.bases.gosubs)
    }

    /// Leaves whichever FOR, FOREACH, WHILE or DO was entered last.
    fn break_loop(&mut self) -> Result<()> {
        let candidates = [
            self.loops.last().map(|f| f.opener()),
            self.whiles.last().copied(),
            self.dos.last().map(|f| f.opener),
        ];
        let innermost = candidates.iter().flatten().copied().max();
        let opener = match innermost {
            Some(opener) => opener,
            None => {
                self.pc += 1;
                return Ok(());
            }
        };
        if self.loops.last().map(|f| f.opener()) == Some(opener) {
            self.loops.pop();
        } else if self.whiles.last().copied() == Some(opener) {
            self.whiles.pop();
        } else {
            self.dos.pop();
        }
        self.pc = self.closer_after(opener)?;
        Ok(())
    }

    /// Line after the closer of the block opened at `opener`.
    pub(super) fn closer_after(&self, opener: usize) -> Result<usize> {
        match self.program.blocks().closer(opener) {
            Some(closer) => Ok(closer + 1),
            None => {
                let text = self.program.line(opener).map(|l| l.text()).unwrap_or("");
                Err(error!(MissingEnd, Some(opener + 1); format!("NO CLOSER FOR {}", text)))
            }
        }
    }

    /// Runs SUB or FUNCTION `name` to completion and returns its value.
    pub(super) fn call_routine(&mut self, name: &str, args: Vec<Val>) -> Result<Val> {
        let routine = match self.program.routines().get(name) {
            Some(routine) => routine.clone(),
            None => return Err(error!(UndefinedUserFunction; name)),
        };
        if args.len() != routine.params.len() {
            return Err(error!(IllegalFunctionCall;
                format!("{} EXPECTS {} ARGUMENTS", name, routine.params.len())));
        }
        let saved = self.bind(&routine.params, args);
        let frame = CallFrame {
            return_pc: self.pc,
            saved,
            bases: self.bases(),
        };
        if let Err(error) = self.calls.push(frame) {
            if let Some(frame) = self.calls.pop() {
                self.restore(frame.saved);
            }
            return Err(error);
        }
        self.return_value = None;
        self.pc = routine.body_start;
        let outcome = grow_stack(|| self.execute_range(routine.body_end));
        if let Some(frame) = self.calls.pop() {
            self.unwind(frame.bases);
            self.restore(frame.saved);
            self.pc = frame.return_pc;
        }
        outcome?;
        let value = self.return_value.take().unwrap_or(Val::Integer(0));
        self.result = value.clone();
        Ok(value)
    }

    /// Binds parameters, returning what they shadowed.
    pub(super) fn bind(&mut self, params: &[String], args: Vec<Val>) -> Vec<(String, Option<Val>)> {
        let mut saved = vec![];
        let mut args = args.into_iter();
        for param in params {
            saved.push((param.clone(), self.vars.unset(param)));
            let value = args.next().unwrap_or(Val::Integer(0));
            self.vars.store_unchecked(param, value);
        }
        saved
    }

    pub(super) fn restore(&mut self, saved: Vec<(String, Option<Val>)>) {
        for (name, old) in saved.into_iter().rev() {
            match old {
                Some(val) => self.vars.store_unchecked(&name, val),
                None => {
                    self.vars.unset(&name);
                }
            }
        }
    }

    /// Blocks on the input collaborator. A stop request during the wait
    /// ends the run.
    pub(super) fn request(&mut self, prompt: &str) -> Result<String> {
        let answer = self.input.request(prompt);
        if self.stop.is_stopped() {
            return Err(error!(Break));
        }
        if self.config.echo_input {
            self.output.append(&format!(">> {}\n", answer));
        }
        Ok(answer)
    }

    /// Sleeps in short slices so a stop request is noticed.
    pub(super) fn pause(&self, ms: u64) {
        let deadline = Instant::now() + Duration::from_millis(ms);
        while !self.stop.is_stopped() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(Duration::from_millis(50)));
        }
    }

    pub(super) fn print(&mut self, text: &str) {
        self.output.append(text);
    }
}
