//! Host surfaces the runtime talks to: text output, line input, the
//! drawing canvas and the stop flag. Each comes with a stock
//! implementation for terminals and one for embedding or tests.

use crossbeam_channel as chan;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type Point = (f64, f64);

pub trait Output: Send {
    fn append(&mut self, text: &str);

    fn clear(&mut self) {
        self.append(&"\n".repeat(25));
    }
}

/// Writes to the process stdout.
#[derive(Debug, Default)]
pub struct StdOutput;

impl Output for StdOutput {
    fn append(&mut self, text: &str) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Collects output in a shared buffer; clones see the same text.
#[derive(Debug, Default, Clone)]
pub struct BufferOutput {
    buffer: Arc<Mutex<String>>,
}

impl BufferOutput {
    pub fn new() -> BufferOutput {
        BufferOutput::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock())
    }
}

impl Output for BufferOutput {
    fn append(&mut self, text: &str) {
        self.buffer.lock().push_str(text);
    }
}

pub trait Input: Send {
    /// Blocks for one line of input. An empty string comes back when the
    /// source ran dry or the request was cancelled.
    fn request(&mut self, prompt: &str) -> String;
}

/// Reads lines from stdin after printing the prompt.
#[derive(Debug, Default)]
pub struct StdInput;

impl Input for StdInput {
    fn request(&mut self, prompt: &str) -> String {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(prompt.as_bytes());
        let _ = stdout.flush();
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => String::new(),
            Ok(_) => line.trim_end_matches(['\r', '\n']).to_string(),
        }
    }
}

/// Answers requests from a fixed list; records every prompt it was shown.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    lines: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> ScriptedInput
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedInput {
            lines: Arc::new(Mutex::new(lines.into_iter().map(Into::into).collect())),
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl Input for ScriptedInput {
    fn request(&mut self, prompt: &str) -> String {
        self.prompts.lock().push(prompt.to_string());
        self.lines.lock().pop_front().unwrap_or_default()
    }
}

/// Input delivered over channels from another thread, typically a UI.
/// Pair it with the [`InputHandle`] returned by [`ChannelInput::pair`].
pub struct ChannelInput {
    prompts: Sender<String>,
    replies: Receiver<String>,
    cancel: Receiver<()>,
}

/// The host side of a [`ChannelInput`].
#[derive(Clone)]
pub struct InputHandle {
    prompts: Receiver<String>,
    replies: Sender<String>,
    cancel: Sender<()>,
}

impl ChannelInput {
    pub fn pair() -> (ChannelInput, InputHandle) {
        let (tx_prompt, rx_prompt) = chan::unbounded::<String>();
        let (tx_reply, rx_reply) = chan::unbounded::<String>();
        let (tx_cancel, rx_cancel) = chan::bounded::<()>(1);
        (
            ChannelInput {
                prompts: tx_prompt,
                replies: rx_reply,
                cancel: rx_cancel,
            },
            InputHandle {
                prompts: rx_prompt,
                replies: tx_reply,
                cancel: tx_cancel,
            },
        )
    }
}

impl Input for ChannelInput {
    fn request(&mut self, prompt: &str) -> String {
        // Cancels and replies sent while nothing was waiting are stale.
        while self.cancel.try_recv().is_ok() {}
        while self.replies.try_recv().is_ok() {}
        if self.prompts.send(prompt.to_string()).is_err() {
            return String::new();
        }
        chan::select! {
            recv(self.replies) -> reply => reply.unwrap_or_default(),
            recv(self.cancel) -> _ => String::new(),
        }
    }
}

impl InputHandle {
    /// Prompts arrive here each time the program asks for input.
    pub fn prompts(&self) -> &Receiver<String> {
        &self.prompts
    }

    pub fn reply<S: Into<String>>(&self, text: S) -> bool {
        self.replies.send(text.into()).is_ok()
    }

    /// Unblocks a pending request. Used together with [`StopHandle::stop`].
    /// With nothing pending it has no effect on later requests.
    pub fn cancel(&self) {
        let _ = self.cancel.try_send(());
    }
}

/// Identifies one drawn primitive so it can be deleted later.
pub type Handle = u64;

/// Vector drawing surface. Coordinates are canvas pixels with y down;
/// ovals and arcs take their bounding box.
pub trait Canvas: Send {
    fn size(&self) -> (f64, f64);
    fn draw_line(&mut self, from: Point, to: Point, color: &str, width: f64) -> Handle;
    fn draw_oval(&mut self, from: Point, to: Point, outline: &str, fill: Option<&str>) -> Handle;
    fn draw_rect(&mut self, from: Point, to: Point, outline: &str, fill: Option<&str>) -> Handle;
    fn draw_polygon(&mut self, points: &[Point], outline: &str, fill: Option<&str>) -> Handle;
    fn draw_text(&mut self, at: Point, text: &str, color: &str, size: f64) -> Handle;
    /// `start` and `extent` are degrees, counter-clockwise from east.
    fn draw_arc(&mut self, from: Point, to: Point, start: f64, extent: f64, color: &str, width: f64)
        -> Handle;
    fn delete(&mut self, handle: Handle);
    fn clear(&mut self);
    fn set_background(&mut self, color: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line {
        from: Point,
        to: Point,
        color: String,
        width: f64,
    },
    Oval {
        from: Point,
        to: Point,
        outline: String,
        fill: Option<String>,
    },
    Rect {
        from: Point,
        to: Point,
        outline: String,
        fill: Option<String>,
    },
    Polygon {
        points: Vec<Point>,
        outline: String,
        fill: Option<String>,
    },
    Text {
        at: Point,
        text: String,
        color: String,
        size: f64,
    },
    Arc {
        from: Point,
        to: Point,
        start: f64,
        extent: f64,
        color: String,
        width: f64,
    },
}

#[derive(Debug, Default)]
struct Recording {
    next: Handle,
    shapes: Vec<(Handle, Shape)>,
    background: String,
}

/// Keeps every primitive drawn; clones share the same record.
#[derive(Debug, Clone)]
pub struct RecordingCanvas {
    size: (f64, f64),
    record: Arc<Mutex<Recording>>,
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        RecordingCanvas::new(600.0, 400.0)
    }
}

impl RecordingCanvas {
    pub fn new(width: f64, height: f64) -> RecordingCanvas {
        RecordingCanvas {
            size: (width, height),
            record: Arc::new(Mutex::new(Recording {
                background: "white".to_string(),
                ..Recording::default()
            })),
        }
    }

    pub fn shapes(&self) -> Vec<Shape> {
        self.record.lock().shapes.iter().map(|(_, s)| s.clone()).collect()
    }

    /// Endpoints of every line still on the canvas.
    pub fn lines(&self) -> Vec<(Point, Point)> {
        self.record
            .lock()
            .shapes
            .iter()
            .filter_map(|(_, s)| match s {
                Shape::Line { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn background(&self) -> String {
        self.record.lock().background.clone()
    }

    fn push(&mut self, shape: Shape) -> Handle {
        let mut record = self.record.lock();
        record.next += 1;
        let handle = record.next;
        record.shapes.push((handle, shape));
        handle
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (f64, f64) {
        self.size
    }
    fn draw_line(&mut self, from: Point, to: Point, color: &str, width: f64) -> Handle {
        self.push(Shape::Line {
            from,
            to,
            color: color.to_string(),
            width,
        })
    }
    fn draw_oval(&mut self, from: Point, to: Point, outline: &str, fill: Option<&str>) -> Handle {
        self.push(Shape::Oval {
            from,
            to,
            outline: outline.to_string(),
            fill: fill.map(str::to_string),
        })
    }
    fn draw_rect(&mut self, from: Point, to: Point, outline: &str, fill: Option<&str>) -> Handle {
        self.push(Shape::Rect {
            from,
            to,
            outline: outline.to_string(),
            fill: fill.map(str::to_string),
        })
    }
    fn draw_polygon(&mut self, points: &[Point], outline: &str, fill: Option<&str>) -> Handle {
        self.push(Shape::Polygon {
            points: points.to_vec(),
            outline: outline.to_string(),
            fill: fill.map(str::to_string),
        })
    }
    fn draw_text(&mut self, at: Point, text: &str, color: &str, size: f64) -> Handle {
        self.push(Shape::Text {
            at,
            text: text.to_string(),
            color: color.to_string(),
            size,
        })
    }
    fn draw_arc(
        &mut self,
        from: Point,
        to: Point,
        start: f64,
        extent: f64,
        color: &str,
        width: f64,
    ) -> Handle {
        self.push(Shape::Arc {
            from,
            to,
            start,
            extent,
            color: color.to_string(),
            width,
        })
    }
    fn delete(&mut self, handle: Handle) {
        self.record.lock().shapes.retain(|(h, _)| *h != handle);
    }
    fn clear(&mut self) {
        self.record.lock().shapes.clear();
    }
    fn set_background(&mut self, color: &str) {
        self.record.lock().background = color.to_string();
    }
}

/// Asks a running program to stop before its next statement.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_canvas_delete() {
        let mut canvas = RecordingCanvas::default();
        let a = canvas.draw_line((0.0, 0.0), (1.0, 1.0), "black", 2.0);
        canvas.draw_text((5.0, 5.0), "hi", "black", 12.0);
        canvas.delete(a);
        assert!(canvas.lines().is_empty());
        assert_eq!(canvas.shapes().len(), 1);
        assert_eq!(canvas.size(), (600.0, 400.0));
    }

    #[test]
    fn test_buffer_output_is_shared() {
        let out = BufferOutput::new();
        let mut writer = out.clone();
        writer.append("hi");
        assert_eq!(out.contents(), "hi");
        assert_eq!(out.take(), "hi");
        assert_eq!(out.contents(), "");
    }

    #[test]
    fn test_channel_input_reply_and_cancel() {
        let (mut input, handle) = ChannelInput::pair();
        let answer = std::thread::spawn(move || {
            let prompt = handle.prompts().recv().unwrap();
            handle.reply(format!("{}ok", prompt.trim()));
            let _ = handle.prompts().recv().unwrap();
            handle.cancel();
        });
        assert_eq!(input.request("? "), "?ok");
        assert_eq!(input.request("? "), "");
        answer.join().unwrap();
    }

    #[test]
    fn test_cancel_with_nothing_pending_is_forgotten() {
        let (mut input, handle) = ChannelInput::pair();
        handle.cancel();
        let answer = std::thread::spawn(move || {
            let _ = handle.prompts().recv().unwrap();
            handle.reply("hello");
        });
        assert_eq!(input.request("? "), "hello");
        answer.join().unwrap();
    }

    #[test]
    fn test_scripted_input_runs_dry() {
        let mut input = ScriptedInput::new(vec!["1"]);
        assert_eq!(input.request("A? "), "1");
        assert_eq!(input.request("B? "), "");
        assert_eq!(input.prompts(), vec!["A? ", "B? "]);
    }
}
