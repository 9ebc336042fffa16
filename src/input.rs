use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver};
use flate2::read::GzDecoder;

use crate::error::StatsError;
use crate::geometry::Feature;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const RECORD_SEPARATOR: char = '\u{1e}';

/// One input line, kept byte for byte, and the feature parsed from it.
#[derive(Debug)]
pub struct InputRecord {
    pub line: usize,
    /// The line as read, terminator included.
    pub raw: Vec<u8>,
    /// `None` for blank lines.
    pub feature: Option<std::result::Result<Feature, StatsError>>,
}

/// Opens `path` (or stdin for `None`/`-`), transparently gunzipping gzip data.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead + Send>> {
    let reader: Box<dyn Read + Send> = match path {
        Some(path) if path.as_os_str() != "-" => Box::new(
            File::open(path).with_context(|| format!("open input: {}", path.display()))?,
        ),
        _ => Box::new(io::stdin()),
    };
    let mut reader = BufReader::new(reader);
    let is_gzip = reader
        .fill_buf()
        .context("read input header")?
        .starts_with(&GZIP_MAGIC);
    if is_gzip {
        Ok(Box::new(BufReader::new(GzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Parses one line of newline-delimited GeoJSON. Returns `None` for blank
/// lines. A leading RFC 8142 record separator is ignored.
pub fn parse_line(bytes: &[u8]) -> Option<std::result::Result<Feature, StatsError>> {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            return Some(Err(StatsError::InvalidGeometry(format!(
                "line is not valid UTF-8: {err}"
            ))));
        }
    };
    let trimmed = text.trim_start_matches(RECORD_SEPARATOR).trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(Feature::from_json(trimmed))
}

/// Iterator over the lines of a reader, returned by [`read_records`].
pub struct Records<R> {
    reader: R,
    line: usize,
    done: bool,
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<InputRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut raw = Vec::new();
        match self.reader.read_until(b'\n', &mut raw) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.line += 1;
                let feature = parse_line(&raw);
                Some(Ok(InputRecord {
                    line: self.line,
                    raw,
                    feature,
                }))
            }
            Err(err) => {
                self.done = true;
                Some(Err(
                    anyhow::Error::new(err).context(format!("read line {}", self.line + 1))
                ))
            }
        }
    }
}

/// Splits input on `\n` without decoding it, so a line that is not UTF-8 is
/// a per-record error and not a read failure.
pub fn read_records<R: BufRead>(reader: R) -> Records<R> {
    Records {
        reader,
        line: 0,
        done: false,
    }
}

/// Reads and parses records on a background thread. Records arrive on the
/// returned channel in input order; the aggregator consuming them stays the
/// single writer of its state.
pub fn spawn_reader(
    reader: Box<dyn BufRead + Send>,
    capacity: usize,
) -> (Receiver<Result<InputRecord>>, JoinHandle<()>) {
    let (tx, rx) = bounded(capacity.max(1));
    let handle = thread::spawn(move || {
        for record in read_records(reader) {
            let failed = record.is_err();
            if tx.send(record).is_err() || failed {
                break;
            }
        }
    });
    (rx, handle)
}
