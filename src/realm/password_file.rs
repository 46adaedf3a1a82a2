use std::path::Path;
use std::path::PathBuf;

use secrecy::ExposeSecret;
use secrecy::Secret;

/// Longest physical line the reader accepts (exclusive). Decoded `user:pass`
/// payloads are held to the same bound, so that nothing a client sends can be
/// larger than what a password file could contain.
pub const LINE_BUFFER_CAPACITY: usize = 1024;

/// A significant line of a password file. Blank lines and `#` comments are
/// never yielded.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigLine<'a> {
    /// `key = value`, both sides trimmed
    Line { key: &'a str, value: &'a str },
    /// `name {`
    Section { name: &'a str },
    /// `}`
    SectionEnd,
}

#[derive(thiserror::Error, Debug)]
pub enum PasswordFileError {
    #[error("Could not open password file {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error on password file {path:?}, line {line}: {message}")]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl PasswordFileError {
    /// 1-based line number, if the error is tied to one
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Open { .. } => None,
            Self::Syntax { line, .. } => Some(*line),
        }
    }
}

/// The raw contents of a password file. The whole file is read up front, but
/// kept in a `Secret` so that the buffer is zeroized when the reader is
/// dropped; lines are only tokenized on demand (see `lines`).
pub struct PasswordFile {
    path: PathBuf,
    contents: Secret<String>,
}

impl PasswordFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PasswordFileError> {
        let path = path.as_ref().to_path_buf();
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Self {
                path,
                contents: Secret::new(contents),
            }),
            Err(source) => Err(PasswordFileError::Open { path, source }),
        }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn lines(&self) -> Lines<'_> {
        Lines {
            path: &self.path,
            inner: self.contents.expose_secret().lines(),
            line: 0,
            done: false,
        }
    }
}

/// Lazy iterator over the significant lines of a `PasswordFile`. Iteration
/// stops after the first error.
pub struct Lines<'a> {
    path: &'a Path,
    inner: std::str::Lines<'a>,
    line: usize,
    done: bool,
}

impl<'a> Lines<'a> {
    /// Line number of the most recently read physical line
    pub fn line(&self) -> usize { self.line }

    /// Report a caller-side error at the current line (e.g. a line that is
    /// syntactically fine, but not what the caller expected). No further lines
    /// are yielded afterwards.
    pub fn error(
        &mut self,
        message: impl Into<String>,
    ) -> PasswordFileError {
        self.done = true;
        PasswordFileError::Syntax {
            path: self.path.to_path_buf(),
            line: self.line,
            message: message.into(),
        }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = Result<ConfigLine<'a>, PasswordFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        // `while let` rather than `for`, since `self.error` needs `self` back
        // inside the loop
        while let Some(raw) = self.inner.next() {
            self.line += 1;
            match parse_line(raw) {
                Ok(None) => continue,
                Ok(Some(line)) => return Some(Ok(line)),
                Err(message) => return Some(Err(self.error(message))),
            }
        }
        self.done = true;
        None
    }
}

fn parse_line(raw: &str) -> Result<Option<ConfigLine<'_>>, &'static str> {
    if raw.len() >= LINE_BUFFER_CAPACITY {
        return Err("Line too long");
    }

    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if line == "}" {
        return Ok(Some(ConfigLine::SectionEnd));
    }
    if let Some(name) = line.strip_suffix('{') {
        return Ok(Some(ConfigLine::Section {
            name: name.trim_end(),
        }));
    }

    // only the first `=` splits; values may contain more of them
    match line.split_once('=') {
        Some((key, value)) => {
            let key = key.trim_end();
            if key.is_empty() {
                return Err("Key is empty");
            }
            Ok(Some(ConfigLine::Line {
                key,
                value: value.trim_start(),
            }))
        }
        None => Err("Expected key = value"),
    }
}
