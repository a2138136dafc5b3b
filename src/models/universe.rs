use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Ordered list of instruments to process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Universe {
    pub tickers: Vec<String>,
}

impl Universe {
    /// Load a universe file
    ///
    /// The first line is a header and is discarded; blank lines are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::MissingInputFile(path.to_path_buf())
            } else {
                Error::Io(format!("Failed to read {}: {}", path.display(), e))
            }
        })?;

        Ok(Self::parse(&content))
    }

    /// Parse universe file contents
    pub fn parse(content: &str) -> Self {
        let tickers = content
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { tickers }
    }

    /// Universe of one ticker
    pub fn single(ticker: &str) -> Self {
        Self {
            tickers: vec![ticker.to_string()],
        }
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}
