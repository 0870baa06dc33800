use crate::error;
use crate::lang::Error;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Input,
    Output,
    Append,
}

impl FileMode {
    pub fn parse(word: &str) -> Option<FileMode> {
        match word.to_ascii_uppercase().as_str() {
            "INPUT" => Some(FileMode::Input),
            "OUTPUT" => Some(FileMode::Output),
            "APPEND" => Some(FileMode::Append),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum OpenFile {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
}

fn io_error(path: &str, err: std::io::Error) -> Error {
    match err.kind() {
        std::io::ErrorKind::NotFound => error!(FileNotFound; path),
        _ => error!(DiskIoError; format!("{}: {}", path, err)),
    }
}

/// ## Open file handles
///
/// Numbered like `OPEN "f" FOR INPUT AS #1`. Writers are flushed when
/// closed or when the table is dropped.

#[derive(Debug, Default)]
pub struct FileTable {
    files: HashMap<i64, OpenFile>,
}

impl FileTable {
    pub fn open(&mut self, number: i64, path: &str, mode: FileMode) -> Result<()> {
        if self.files.contains_key(&number) {
            return Err(error!(BadFileNumber; format!("#{} ALREADY OPEN", number)));
        }
        let file = match mode {
            FileMode::Input => File::open(path).map(|f| OpenFile::Reader(BufReader::new(f))),
            FileMode::Output => File::create(path).map(|f| OpenFile::Writer(BufWriter::new(f))),
            FileMode::Append => OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .map(|f| OpenFile::Writer(BufWriter::new(f))),
        }
        .map_err(|e| io_error(path, e))?;
        self.files.insert(number, file);
        Ok(())
    }

    pub fn close(&mut self, number: i64) -> Result<()> {
        match self.files.remove(&number) {
            Some(OpenFile::Writer(mut w)) => w
                .flush()
                .map_err(|e| error!(DiskIoError; format!("#{}: {}", number, e))),
            Some(OpenFile::Reader(_)) => Ok(()),
            None => Err(error!(BadFileNumber; format!("#{}", number))),
        }
    }

    pub fn close_all(&mut self) {
        for (_, file) in self.files.drain() {
            if let OpenFile::Writer(mut w) = file {
                let _ = w.flush();
            }
        }
    }

    pub fn is_open(&self, number: i64) -> bool {
        self.files.contains_key(&number)
    }

    /// Next line without its terminator, `None` at end of file.
    pub fn read_line(&mut self, number: i64) -> Result<Option<String>> {
        let reader = match self.files.get_mut(&number) {
            Some(OpenFile::Reader(r)) => r,
            Some(OpenFile::Writer(_)) => {
                return Err(error!(BadFileMode; format!("#{} IS NOT OPEN FOR INPUT", number)))
            }
            None => return Err(error!(BadFileNumber; format!("#{}", number))),
        };
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| error!(DiskIoError; format!("#{}: {}", number, e)))?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    pub fn write_line(&mut self, number: i64, text: &str) -> Result<()> {
        match self.files.get_mut(&number) {
            Some(OpenFile::Writer(w)) => writeln!(w, "{}", text)
                .map_err(|e| error!(DiskIoError; format!("#{}: {}", number, e))),
            Some(OpenFile::Reader(_)) => {
                Err(error!(BadFileMode; format!("#{} IS NOT OPEN FOR OUTPUT", number)))
            }
            None => Err(error!(BadFileNumber; format!("#{}", number))),
        }
    }
}

impl Drop for FileTable {
    fn drop(&mut self) {
        self.close_all();
    }
}

pub fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| io_error(path, e))
}

/// Replaces the file, or appends `text` plus a newline.
pub fn write_file(path: &str, text: &str, append: bool) -> Result<()> {
    let outcome = if append {
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .and_then(|mut f| writeln!(f, "{}", text))
    } else {
        std::fs::write(path, text)
    };
    outcome.map_err(|e| io_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> String {
        let path = std::env::temp_dir().join(format!("templecode-{}-{}", std::process::id(), name));
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_write_then_read() {
        let path = scratch("table.txt");
        let mut table = FileTable::default();
        table.open(1, &path, FileMode::Output).unwrap();
        table.write_line(1, "alpha").unwrap();
        table.write_line(1, "beta").unwrap();
        table.close(1).unwrap();
        table.open(2, &path, FileMode::Input).unwrap();
        assert_eq!(table.read_line(2).unwrap(), Some("alpha".to_string()));
        assert_eq!(table.read_line(2).unwrap(), Some("beta".to_string()));
        assert_eq!(table.read_line(2).unwrap(), None);
        assert_eq!(table.write_line(2, "x").unwrap_err().code(), 54);
        table.close_all();
        assert!(!table.is_open(2));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file() {
        let mut table = FileTable::default();
        let err = table
            .open(1, &scratch("does-not-exist"), FileMode::Input)
            .unwrap_err();
        assert_eq!(err.code(), 53);
        assert_eq!(table.close(7).unwrap_err().code(), 52);
    }

    #[test]
    fn test_whole_file() {
        let path = scratch("whole.txt");
        write_file(&path, "one", false).unwrap();
        write_file(&path, "two", true).unwrap();
        assert_eq!(read_file(&path).unwrap(), "onetwo\n");
        let _ = std::fs::remove_file(&path);
    }
}
