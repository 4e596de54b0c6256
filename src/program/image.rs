//! `.ls8` program image format.
//!
//! A simple text format:
//! - One byte per line, written as an 8-digit binary literal
//! - `#` starts a comment that runs to the end of the line
//! - Blank and comment-only lines are ignored
//!
//! Bytes are loaded into memory in file order starting at address 0.

use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// The only file extension accepted for program images.
pub const IMAGE_EXTENSION: &str = "ls8";

/// A loaded program image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    /// The program bytes.
    pub bytes: Vec<u8>,
    /// Trailing comment of each byte's line (empty if none).
    pub comments: Vec<String>,
}

impl ProgramImage {
    /// Create a new empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an image from raw bytes with no comments.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let comments = vec![String::new(); bytes.len()];
        Self { bytes, comments }
    }

    /// Add a byte.
    pub fn push(&mut self, byte: u8, comment: &str) {
        self.bytes.push(byte);
        self.comments.push(comment.to_string());
    }

    /// Get the number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reject paths that do not end in `.ls8`. Nothing is opened.
pub fn check_extension(path: &Path) -> Result<(), LoadError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(IMAGE_EXTENSION) => Ok(()),
        Some(other) => Err(LoadError::UnsupportedExtension(format!(".{}", other))),
        None => Err(LoadError::UnsupportedExtension("(no extension)".into())),
    }
}

/// Load a program image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, LoadError> {
    let path = path.as_ref();
    check_extension(path)?;

    let text = read_source(path)?;

    let image = parse_image(&text)?;
    log::debug!("Read {} bytes from {}", image.len(), path.display());
    Ok(image)
}

/// Read a program file (image or assembly source) as text.
///
/// A missing file is [`LoadError::NotFound`] whatever its extension.
pub fn read_source<P: AsRef<Path>>(path: P) -> Result<String, LoadError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound(path.display().to_string()),
        _ => LoadError::IoError(e.to_string()),
    })
}

/// Parse the text of a program image.
pub fn parse_image(text: &str) -> Result<ProgramImage, LoadError> {
    let mut image = ProgramImage::new();

    for (line_num, line) in text.lines().enumerate() {
        let (code, comment) = match line.split_once('#') {
            Some((code, comment)) => (code.trim(), comment.trim()),
            None => (line.trim(), ""),
        };

        // Skip empty lines and comments
        if code.is_empty() {
            continue;
        }

        let byte = parse_byte(code).ok_or_else(|| LoadError::ParseError {
            line: line_num + 1,
            message: format!("expected an 8-digit binary literal, found {:?}", code),
        })?;

        image.push(byte, comment);
    }

    Ok(image)
}

fn parse_byte(literal: &str) -> Option<u8> {
    if literal.len() != 8 || !literal.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    u8::from_str_radix(literal, 2).ok()
}

/// Save a program image to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &ProgramImage) -> Result<(), LoadError> {
    let path = path.as_ref();
    check_extension(path)?;

    let mut file = std::fs::File::create(path)
        .map_err(|e| LoadError::IoError(e.to_string()))?;
    write_image(&mut file, image).map_err(|e| LoadError::IoError(e.to_string()))
}

/// Render an image in `.ls8` text form.
pub fn write_image<W: Write>(writer: &mut W, image: &ProgramImage) -> std::io::Result<()> {
    writeln!(writer, "# LS-8 program image")?;
    writeln!(writer, "# {} bytes", image.len())?;
    writeln!(writer)?;

    for (i, byte) in image.bytes.iter().enumerate() {
        match image.comments.get(i).filter(|c| !c.is_empty()) {
            Some(comment) => writeln!(writer, "{:08b} # {}", byte, comment)?,
            None => writeln!(writer, "{:08b}", byte)?,
        }
    }

    Ok(())
}

/// Errors that can occur while loading or saving a program image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("{0} is unsupported (expected .ls8)")]
    UnsupportedExtension(String),

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}
