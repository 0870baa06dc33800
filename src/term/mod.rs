/*!
## Rust Terminal Module

Runs TempleCode programs from files and hosts the interactive prompt.
Programs execute on a worker thread with a large stack so deep Logo
recursion does not overflow the main thread.

*/

extern crate ansi_term;
extern crate ctrlc;
extern crate linefeed;
use crate::lang::{check_blocks, format_source, Error};
use crate::mach::{
    ChannelInput, Config, InputHandle, Listing, Output, Runtime, StdInput, StopHandle,
};
use crate::error;
use ansi_term::{Colour, Style};
use crossbeam_channel as chan;
use linefeed::{Completer, Completion, Interface, Prompter, ReadResult, Signal, Terminal};
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::sync::Arc;
use std::time::Instant;

const STACK_SIZE: usize = 64 * 1024 * 1024;

const HELP: &str = "\
Numbered lines are stored; anything else runs immediately.
  RUN            run the stored program
  LIST           show the stored program
  CLEAR          forget the program and every variable
  LOAD \"file\"    replace the stored program with a file
  SAVE \"file\"    write the stored program to a file
  VARS           show variables
  DEBUG ON|OFF   trace lines and keep going after errors
  QUIT           leave (also EXIT, BYE or CTRL-D)";

/// Stdout with errors in bold and debug traces dimmed.
#[derive(Debug, Default)]
struct TermOutput {
    debug: bool,
}

impl Output for TermOutput {
    fn append(&mut self, text: &str) {
        let styled = if text.starts_with('?') && text.ends_with('\n') {
            Style::new().bold().paint(text).to_string()
        } else if self.debug && is_trace(text) {
            Style::new().dimmed().paint(text).to_string()
        } else {
            text.to_string()
        };
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(styled.as_bytes());
        let _ = stdout.flush();
    }
}

/// `[12] PRINT X`
fn is_trace(text: &str) -> bool {
    match text.strip_prefix('[').and_then(|t| t.split_once("] ")) {
        Some((n, _)) => !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

fn stop_on_interrupt(stop: StopHandle, input: Option<InputHandle>) {
    let outcome = ctrlc::set_handler(move || {
        stop.stop();
        if let Some(input) = &input {
            input.cancel();
        }
    });
    if let Err(error) = outcome {
        eprintln!("Error setting Ctrl-C handler: {}", error);
    }
}

pub struct RunOptions {
    pub config: Config,
    pub debug: bool,
    pub time: bool,
    pub profile: bool,
}

/// Runs a program file to completion. Returns the error history length.
pub fn run(filename: &str, options: RunOptions) -> Result<usize, Error> {
    let source = load(filename)?;
    let mut runtime = Runtime::new(options.config)
        .with_output(TermOutput {
            debug: options.debug,
        })
        .with_input(StdInput);
    runtime.set_debug_mode(options.debug);
    runtime.enable_profiler(options.profile);
    stop_on_interrupt(runtime.stop_handle(), None);
    let started = Instant::now();
    let (_, result) = on_worker(runtime, None, move |rt| rt.run(&source))?;
    let errors = result.error_history.len();
    if errors > 0 {
        let noun = if errors == 1 { "error" } else { "errors" };
        eprintln!("{}", Style::new().bold().paint(format!("{} {}", errors, noun)));
    }
    if options.time {
        let elapsed = format!("Finished in {:.3}s", started.elapsed().as_secs_f64());
        eprintln!("{}", Style::new().dimmed().paint(elapsed));
    }
    Ok(errors)
}

/// Prints block-balance problems. Returns how many were found.
pub fn check(filename: &str) -> Result<usize, Error> {
    let source = load(filename)?;
    let issues = check_blocks(&source);
    for issue in &issues {
        println!("{}", issue);
    }
    if issues.is_empty() {
        println!("{}", Colour::Green.paint("OK"));
    }
    Ok(issues.len())
}

/// Re-indents a file to stdout, or in place with `write`.
pub fn format(filename: &str, write: bool) -> Result<(), Error> {
    let formatted = format_source(&load(filename)?, 4);
    if !write {
        print!("{}", formatted);
        return Ok(());
    }
    std::fs::write(filename, formatted).map_err(|e| io_error(filename, e))
}

/// Moves `runtime` to a worker thread, runs `job`, and answers INPUT
/// prompts from the terminal until the job finishes.
fn on_worker<T, F>(
    mut runtime: Runtime,
    input: Option<(&InputHandle, &Interface<linefeed::DefaultTerminal>)>,
    job: F,
) -> Result<(Runtime, T), Error>
where
    T: Send + 'static,
    F: FnOnce(&mut Runtime) -> T + Send + 'static,
{
    let (done_tx, done_rx) = chan::bounded(1);
    let worker = std::thread::Builder::new()
        .name("templecode".into())
        .stack_size(STACK_SIZE)
        .spawn(move || {
            let value = job(&mut runtime);
            let _ = done_tx.send((runtime, value));
        })
        .map_err(|e| error!(InternalError; e.to_string()))?;
    let lost = || error!(InternalError; "INTERPRETER THREAD FAILED");
    let (handle, reader) = match input {
        Some(input) => input,
        None => {
            let done = done_rx.recv().map_err(|_| lost());
            let _ = worker.join();
            return done;
        }
    };
    loop {
        chan::select! {
            recv(done_rx) -> done => {
                let _ = worker.join();
                return done.map_err(|_| lost());
            }
            recv(handle.prompts()) -> prompt => {
                let prompt = prompt.unwrap_or_default();
                match read_answer(reader, &prompt) {
                    Ok(Some(answer)) => {
                        handle.reply(answer);
                    }
                    Ok(None) | Err(_) => handle.cancel(),
                }
            }
        }
    }
}

/// `None` when the user interrupted or closed the input.
fn read_answer<T: Terminal>(reader: &Interface<T>, prompt: &str) -> std::io::Result<Option<String>> {
    reader.set_prompt(prompt)?;
    match reader.read_line()? {
        ReadResult::Input(answer) => {
            reader.add_history_unique(answer.clone());
            Ok(Some(answer))
        }
        ReadResult::Signal(Signal::Interrupt) => {
            reader.set_buffer("")?;
            reader.lock_reader().cancel_read_line()?;
            Ok(None)
        }
        ReadResult::Signal(_) | ReadResult::Eof => Ok(None),
    }
}

/// The interactive prompt.
pub fn repl(debug: bool) -> std::io::Result<()> {
    let (channel, handle) = ChannelInput::pair();
    let mut runtime = Runtime::default()
        .with_output(TermOutput { debug })
        .with_input(channel);
    runtime.set_debug_mode(debug);
    stop_on_interrupt(runtime.stop_handle(), Some(handle.clone()));

    let command = Interface::new("templecode")?;
    command.set_prompt("tc> ")?;
    let input = Interface::new("input")?;
    input.set_report_signal(Signal::Interrupt, true);
    let mut listing = Listing::default();
    println!(
        "{}",
        Style::new()
            .bold()
            .paint(format!("TempleCode {}", env!("CARGO_PKG_VERSION")))
    );

    loop {
        command.set_completer(Arc::new(LineCompleter::new(listing.clone())));
        let text = match command.read_line()? {
            ReadResult::Input(text) => text,
            ReadResult::Signal(_) | ReadResult::Eof => break,
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        command.add_history_unique(trimmed.to_string());
        if listing.enter(trimmed) {
            continue;
        }
        let upper = trimmed.to_ascii_uppercase();
        let mut words = upper.split_whitespace();
        let word = words.next().unwrap_or("");
        match word {
            "QUIT" | "EXIT" | "BYE" => break,
            "HELP" => println!("{}", HELP),
            "LIST" if words.next().is_none() => {
                for line in listing.lines() {
                    println!("{}", line);
                }
            }
            "CLEAR" => {
                listing.clear();
                runtime.reset();
            }
            "DEBUG" => {
                let on = match words.next() {
                    Some("ON") => true,
                    Some("OFF") => false,
                    _ => !runtime.is_debug_mode(),
                };
                runtime.set_debug_mode(on);
                runtime = runtime.with_output(TermOutput { debug: on });
                println!("Debug mode {}", if on { "ON" } else { "OFF" });
            }
            "VARS" => {
                for (name, val) in runtime.variables() {
                    println!("{} = {}", name, val);
                }
            }
            "LOAD" | "SAVE" => {
                let filename = trimmed[word.len()..].trim().trim_matches('"');
                let outcome = if word == "LOAD" {
                    load(filename).map(|source| {
                        listing.clear();
                        for line in source.lines() {
                            listing.enter(line);
                        }
                    })
                } else {
                    save(&listing, filename)
                };
                if let Err(error) = outcome {
                    report(&command, &error)?;
                }
            }
            "RUN" => {
                let source = listing.source();
                let (back, _) = match on_worker(runtime, Some((&handle, &input)), move |rt| {
                    rt.run(&source)
                }) {
                    Ok(done) => done,
                    Err(error) => {
                        report(&command, &error)?;
                        break;
                    }
                };
                runtime = back;
            }
            _ => {
                let line = trimmed.to_string();
                let (back, outcome) = match on_worker(runtime, Some((&handle, &input)), move |rt| {
                    rt.execute_line(&line)
                }) {
                    Ok(done) => done,
                    Err(error) => {
                        report(&command, &error)?;
                        break;
                    }
                };
                runtime = back;
                if let Err(error) = outcome {
                    report(&command, &error)?;
                }
            }
        }
    }
    Ok(())
}

fn report<T: Terminal>(command: &Interface<T>, error: &Error) -> std::io::Result<()> {
    command.write_fmt(format_args!(
        "{}\n",
        Style::new().bold().paint(format!("?{}", error))
    ))
}

/// Typing a stored line number then TAB brings the line back for editing.
struct LineCompleter {
    listing: Listing,
}

impl LineCompleter {
    fn new(listing: Listing) -> LineCompleter {
        LineCompleter { listing }
    }
}

impl<Term: Terminal> Completer<Term> for LineCompleter {
    fn complete(
        &self,
        _word: &str,
        prompter: &Prompter<Term>,
        _start: usize,
        _end: usize,
    ) -> Option<Vec<Completion>> {
        let tag = prompter.buffer().trim().parse::<u32>().ok()?;
        let line = self.listing.line(tag)?;
        let mut comp = Completion::simple(line.to_string());
        comp.suffix = linefeed::complete::Suffix::None;
        Some(vec![comp])
    }
}

fn io_error(filename: &str, error: std::io::Error) -> Error {
    let msg = format!("{}: {}", filename, error);
    match error.kind() {
        ErrorKind::NotFound => error!(FileNotFound; msg),
        _ => error!(DiskIoError; msg),
    }
}

fn load(filename: &str) -> Result<String, Error> {
    if filename.is_empty() {
        return Err(error!(BadFileName));
    }
    std::fs::read_to_string(filename).map_err(|e| io_error(filename, e))
}

fn save(listing: &Listing, filename: &str) -> Result<(), Error> {
    if filename.is_empty() {
        return Err(error!(BadFileName));
    }
    if listing.is_empty() {
        return Err(error!(InternalError; "NOTHING TO SAVE"));
    }
    let mut file = File::create(filename).map_err(|e| io_error(filename, e))?;
    for line in listing.lines() {
        writeln!(file, "{}", line).map_err(|e| io_error(filename, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_trace() {
        assert!(is_trace("[12] PRINT X\n"));
        assert!(!is_trace("[1, 2]\n"));
        assert!(!is_trace("plain"));
    }

    #[test]
    fn test_missing_file() {
        assert_eq!(load("").unwrap_err().code(), 64);
        let err = load("/no/such/templecode/file.tc").unwrap_err();
        assert_eq!(err.code(), 53);
    }
}
