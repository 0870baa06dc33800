/// ## Runtime settings
///
/// Plain values a host sets before calling `run`. Debug mode is toggled
/// on the runtime itself and implies `continue_on_error`.

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Statements dispatched before the run is aborted.
    pub max_iterations: usize,
    pub continue_on_error: bool,
    /// Pause after every top-level statement, for animation.
    pub exec_delay_ms: u64,
    /// Echo `>> answer` after each input request.
    pub echo_input: bool,
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_iterations: 100_000,
            continue_on_error: false,
            exec_delay_ms: 0,
            echo_input: false,
            max_call_depth: 256,
        }
    }
}
