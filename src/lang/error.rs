use super::{Column, LineNumber};

#[derive(Clone, PartialEq)]
pub struct Error {
    code: u16,
    line_number: LineNumber,
    column: Column,
    message: String,
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($err:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
    };
    ($err:ident, ..$col:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).in_column($col)
    };
    ($err:ident, $line:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).in_line_number($line)
    };
    ($err:ident; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).message($msg)
    };
    ($err:ident, ..$col:expr; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .in_column($col)
            .message($msg)
    };
    ($err:ident, $line:expr; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .in_line_number($line)
            .message($msg)
    };
}

/// How the runtime treats an error once it escapes a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Found while loading. Recorded, then the program runs anyway.
    Load,
    /// Unknown command or structural mismatch. Recorded, then execution continues.
    Dispatch,
    /// Catchable by TRY; otherwise ends the run.
    Runtime,
    /// Iteration guard or stop request. Never caught.
    Guard,
    /// Raised by THROW or ASSERT. Catchable by TRY.
    Thrown,
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error {
            code: code as u16,
            line_number: None,
            column: 0..0,
            message: String::new(),
        }
    }

    pub fn is_direct(&self) -> bool {
        self.line_number.is_none()
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn line_number(&self) -> LineNumber {
        self.line_number
    }

    pub fn column(&self) -> Column {
        self.column.clone()
    }

    pub fn text(&self) -> &str {
        &self.message
    }

    /// Attaches a line unless one is already known.
    pub fn in_line_number(mut self, line: LineNumber) -> Error {
        if self.line_number.is_none() {
            self.line_number = line;
        }
        self
    }

    pub fn in_column(mut self, column: &Column) -> Error {
        if self.column == (0..0) {
            self.column = column.clone();
        }
        self
    }

    pub fn message<S: Into<String>>(mut self, message: S) -> Error {
        self.message = message.into();
        self
    }

    pub fn fault(&self) -> Fault {
        use ErrorCode::*;
        const LOAD: &[ErrorCode] = &[MissingEnd];
        const DISPATCH: &[ErrorCode] = &[
            UnknownCommand,
            NextWithoutFor,
            ReturnWithoutGosub,
            WendWithoutWhile,
            LoopWithoutDo,
            ConstantReassigned,
        ];
        const GUARD: &[ErrorCode] = &[IterationLimit, Break];
        const THROWN: &[ErrorCode] = &[UnhandledError, AssertionFailed];
        let is = |set: &[ErrorCode]| set.iter().any(|c| *c as u16 == self.code);
        if is(LOAD) {
            Fault::Load
        } else if is(DISPATCH) {
            Fault::Dispatch
        } else if is(GUARD) {
            Fault::Guard
        } else if is(THROWN) {
            Fault::Thrown
        } else {
            Fault::Runtime
        }
    }

    /// Text bound to a CATCH variable and `ERROR$`.
    pub fn caught_text(&self) -> String {
        if self.message.is_empty() {
            code_text(self.code).to_string()
        } else {
            self.message.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NextWithoutFor = 1,
    SyntaxError = 2,
    ReturnWithoutGosub = 3,
    OutOfData = 4,
    IllegalFunctionCall = 5,
    Overflow = 6,
    OutOfMemory = 7,
    UndefinedLine = 8,
    SubscriptOutOfRange = 9,
    DivisionByZero = 11,
    TypeMismatch = 13,
    UndefinedUserFunction = 18,
    ForWithoutNext = 26,
    WhileWithoutWend = 29,
    WendWithoutWhile = 30,
    LoopWithoutDo = 31,
    DoWithoutLoop = 32,
    UnknownCommand = 33,
    MissingEnd = 34,
    ConstantReassigned = 35,
    IterationLimit = 36,
    UnhandledError = 37,
    AssertionFailed = 38,
    Break = 39,
    InternalError = 51,
    BadFileNumber = 52,
    FileNotFound = 53,
    BadFileMode = 54,
    DiskIoError = 57,
    BadFileName = 64,
}

fn code_text(code: u16) -> &'static str {
    match code {
        1 => "NEXT WITHOUT FOR",
        2 => "SYNTAX ERROR",
        3 => "RETURN WITHOUT GOSUB",
        4 => "OUT OF DATA",
        5 => "ILLEGAL FUNCTION CALL",
        6 => "OVERFLOW",
        7 => "OUT OF MEMORY",
        8 => "UNDEFINED LINE",
        9 => "SUBSCRIPT OUT OF RANGE",
        11 => "DIVISION BY ZERO",
        13 => "TYPE MISMATCH",
        18 => "UNDEFINED USER FUNCTION",
        26 => "FOR WITHOUT NEXT",
        29 => "WHILE WITHOUT WEND",
        30 => "WEND WITHOUT WHILE",
        31 => "LOOP WITHOUT DO",
        32 => "DO WITHOUT LOOP",
        33 => "UNKNOWN COMMAND",
        34 => "MISSING END",
        35 => "CONSTANT REASSIGNED",
        36 => "ITERATION LIMIT",
        37 => "UNHANDLED ERROR",
        38 => "ASSERTION FAILED",
        39 => "BREAK",
        51 => "INTERNAL ERROR",
        52 => "BAD FILE NUMBER",
        53 => "FILE NOT FOUND",
        54 => "BAD FILE MODE",
        57 => "DISK I/O ERROR",
        64 => "BAD FILE NAME",
        _ => "",
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {{ {} }}", self)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let code_str = code_text(self.code);
        let mut suffix = String::new();
        if let Some(line_number) = self.line_number {
            suffix.push_str(&format!(" {}", line_number));
        }
        if (0..0) != self.column {
            suffix.push_str(&format!(" ({}..{})", self.column.start, self.column.end));
        }
        let message = if self.message.is_empty() {
            String::new()
        } else {
            format!("; {}", self.message)
        };
        if code_str.is_empty() {
            if suffix.is_empty() {
                write!(f, "PROGRAM ERROR {}{}", self.code, message)
            } else {
                write!(f, "PROGRAM ERROR {} IN{}{}", self.code, suffix, message)
            }
        } else if suffix.is_empty() {
            write!(f, "{}{}", code_str, message)
        } else {
            write!(f, "{} IN{}{}", code_str, suffix, message)
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_line_and_message() {
        let e = error!(DivisionByZero, Some(3); "X / 0");
        assert_eq!(e.to_string(), "DIVISION BY ZERO IN 3; X / 0");
        assert_eq!(error!(OutOfData).to_string(), "OUT OF DATA");
    }

    #[test]
    fn test_fault_classes() {
        assert_eq!(error!(UnknownCommand).fault(), Fault::Dispatch);
        assert_eq!(error!(IterationLimit).fault(), Fault::Guard);
        assert_eq!(error!(UnhandledError).fault(), Fault::Thrown);
        assert_eq!(error!(TypeMismatch).fault(), Fault::Runtime);
        assert_eq!(error!(MissingEnd).fault(), Fault::Load);
    }

    #[test]
    fn test_caught_text_prefers_message() {
        assert_eq!(error!(UnhandledError; "oops").caught_text(), "oops");
        assert_eq!(error!(DivisionByZero).caught_text(), "DIVISION BY ZERO");
    }

    #[test]
    fn test_first_line_number_sticks() {
        let e = error!(SyntaxError, Some(2)).in_line_number(Some(9));
        assert_eq!(e.line_number(), Some(2));
    }
}
