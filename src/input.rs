use anyhow::{Context, Result};
use bstr::ByteSlice;
use camino::Utf8PathBuf;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// One newline-delimited record line, terminator stripped.
pub struct RecordLine<'a> {
    number: u64,
    bytes: &'a [u8],
}

impl<'a> RecordLine<'a> {
    #[inline]
    fn new(number: u64, full: &'a [u8]) -> RecordLine<'a> {
        let bytes = full.strip_suffix(b"\n").unwrap_or(full);
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        RecordLine { number, bytes }
    }

    /// 1-based line number within its source.
    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// The line content without its terminator.
    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// True for empty or whitespace-only lines.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.bytes.trim().is_empty()
    }
}

/// Where records are read from.
#[derive(Default, Clone, Debug)]
pub enum RecordSource {
    File(Utf8PathBuf),
    #[default]
    Stdin,
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSource::File(path) => write!(f, "{}", path),
            RecordSource::Stdin => write!(f, "<stdin>"),
        }
    }
}

impl RecordSource {
    /// `-` selects stdin, anything else is a file path.
    pub fn from_path(path: Utf8PathBuf) -> Self {
        if path.as_str() == "-" {
            RecordSource::Stdin
        } else {
            RecordSource::File(path)
        }
    }

    pub fn reader(&self) -> Result<SourceReader> {
        match self {
            RecordSource::File(path) => {
                let file =
                    File::open(path).with_context(|| format!("failed to open file: {}", path))?;
                Ok(SourceReader::File(BufReader::with_capacity(65536, file)))
            }
            RecordSource::Stdin => Ok(SourceReader::Stdin(BufReader::with_capacity(
                65536,
                io::stdin(),
            ))),
        }
    }
}

pub enum SourceReader {
    File(BufReader<File>),
    Stdin(BufReader<io::Stdin>),
}

impl SourceReader {
    /// Call `f` for every line until input ends or `f` returns `Ok(false)`.
    pub fn for_each_line<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(RecordLine<'_>) -> Result<bool>,
    {
        let mut buf = Vec::with_capacity(4096);
        let mut number = 0u64;
        loop {
            buf.clear();
            let n = match self {
                SourceReader::File(ref mut rdr) => rdr.read_until(b'\n', &mut buf),
                SourceReader::Stdin(ref mut rdr) => rdr.read_until(b'\n', &mut buf),
            };
            let n = n.context("failed to read line")?;
            if n == 0 {
                break;
            }
            number += 1;
            if !f(RecordLine::new(number, &buf))? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_terminators() {
        assert_eq!(RecordLine::new(1, b"{}\r\n").bytes(), b"{}");
        assert_eq!(RecordLine::new(1, b"{}\n").bytes(), b"{}");
        assert_eq!(RecordLine::new(1, b"{}").bytes(), b"{}");
    }

    #[test]
    fn blank_lines() {
        assert!(RecordLine::new(1, b"  \t\n").is_blank());
        assert!(!RecordLine::new(1, b" {} \n").is_blank());
    }

    #[test]
    fn dash_is_stdin() {
        assert!(matches!(
            RecordSource::from_path("-".into()),
            RecordSource::Stdin
        ));
        assert_eq!(
            RecordSource::from_path("logs.jsonl".into()).to_string(),
            "logs.jsonl"
        );
    }
}
