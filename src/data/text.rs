//! Catch-all reader for delimited text spectra.
//!
//! Handles the common export layout of spectrometer software: an optional
//! free-form header followed by a numeric block, one row per wavelength.
//!
//!   - The first line starting with a digit (within the first `scan_lines`
//!     lines) opens the data block.
//!   - The delimiter is guessed from that line: tab, `;`, `|`, space, then `,`.
//!     Comma comes last since it doubles as a decimal separator.
//!   - The decimal separator is `,` or `.`, whichever appears in the line once
//!     the delimiter is removed (`.` by default).
//!   - Column 0 is the axis, every further column one channel.
//!   - When the last non-empty line before the block names every column
//!     (e.g. `wavelength;ROI1;ROI2`) and the names are distinct, each channel
//!     becomes its own dataset under its column name. Otherwise the channels
//!     stay together in one unnamed dataset.
//!
//! Rows that do not parse, or have a different column count than the first
//! data row, are skipped.

use std::fs;
use std::path::Path;

use super::dataset::Dataset;
use super::loader::Loader;
use crate::error::LoadError;

const DELIMITERS: [char; 5] = ['\t', ';', '|', ' ', ','];
const BINARY_SNIFF_LEN: usize = 1024;

#[derive(Debug, Clone)]
pub struct TextLoader {
    /// How many lines to search for the start of the numeric block.
    pub scan_lines: usize,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self { scan_lines: 50 }
    }
}

impl Loader for TextLoader {
    fn open(&self, path: &Path) -> Result<Vec<Dataset>, LoadError> {
        let bytes = fs::read(path)?;
        let sample = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
        if sample.contains(&0) {
            log::warn!("'{}' looks like a binary file, not reading it as text", path.display());
            return Err(unreadable(path, "binary content"));
        }
        let content = String::from_utf8_lossy(&bytes);
        parse_text(&content, self.scan_lines).map_err(|reason| unreadable(path, &reason))
    }
}

fn unreadable(path: &Path, reason: &str) -> LoadError {
    LoadError::UnreadableFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Guess delimiter and decimal separator from a data line.
fn infer_schema(line: &str) -> Option<(char, char)> {
    let delimiter = DELIMITERS.iter().copied().find(|d| line.contains(*d))?;
    let rest = line.replace(delimiter, "");
    let decimal = [',', '.']
        .into_iter()
        .filter(|c| *c != delimiter)
        .find(|c| rest.contains(*c))
        .unwrap_or('.');
    Some((delimiter, decimal))
}

fn parse_row(line: &str, delimiter: char, decimal: char) -> Option<Vec<f64>> {
    line.split(delimiter)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if decimal == '.' {
                part.parse::<f64>().ok()
            } else {
                part.replace(decimal, ".").parse::<f64>().ok()
            }
        })
        .collect()
}

/// Column names from a header line, if it names exactly `columns` distinct
/// columns and is not itself a numeric row.
fn column_names(line: &str, delimiter: char, decimal: char, columns: usize) -> Option<Vec<String>> {
    if parse_row(line, delimiter, decimal).is_some() {
        return None;
    }
    let names: Vec<String> = line
        .split(delimiter)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    if names.len() != columns {
        return None;
    }
    let distinct = names.iter().enumerate().all(|(i, n)| !names[..i].contains(n));
    distinct.then_some(names)
}

fn parse_text(content: &str, scan_lines: usize) -> Result<Vec<Dataset>, String> {
    let mut lines = content.lines().map(str::trim);

    let mut first = None;
    let mut preceding = None;
    for line in lines.by_ref().take(scan_lines) {
        if line.starts_with(|c: char| c.is_ascii_digit()) {
            first = Some(line);
            break;
        }
        if !line.is_empty() {
            preceding = Some(line);
        }
    }
    let first = first.ok_or_else(|| format!("no numeric data in the first {} lines", scan_lines))?;
    let (delimiter, decimal) = infer_schema(first).ok_or("data rows have a single column")?;
    log::debug!("Text schema: delimiter={:?}, decimal={:?}", delimiter, decimal);

    let header = parse_row(first, delimiter, decimal).ok_or("first data row is not numeric")?;
    let columns = header.len();
    if columns < 2 {
        return Err("data rows have a single column".to_string());
    }

    let mut rows = vec![header];
    let mut skipped = 0usize;
    for line in lines.filter(|l| !l.is_empty()) {
        match parse_row(line, delimiter, decimal) {
            Some(row) if row.len() == columns => rows.push(row),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        log::debug!("Skipped {} malformed rows", skipped);
    }

    let axis: Vec<f64> = rows.iter().map(|r| r[0]).collect();
    let channels: Vec<Vec<f64>> = (1..columns)
        .map(|c| rows.iter().map(|r| r[c]).collect())
        .collect();

    match preceding.and_then(|line| column_names(line, delimiter, decimal, columns)) {
        Some(names) => {
            log::debug!("Columns named by header: {}", names.join(", "));
            Ok(names[1..]
                .iter()
                .zip(channels)
                .map(|(name, y)| Dataset::single(name, axis.clone(), y))
                .collect())
        }
        None => Ok(vec![Dataset::channels("", axis, channels)]),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::data::dataset::{Intensity, DEFAULT_DATASET_NAME};

    fn load(content: &[u8]) -> Result<Vec<Dataset>, LoadError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectrum.txt");
        fs::write(&path, content).unwrap();
        TextLoader::default().open(&path)
    }

    #[test]
    fn test_header_and_comma_separated_block() {
        let datasets = load(b"Integration time: 100 ms\nwavelength,intensity\n400.5,10\n401.5,12\n402.5,11\n").unwrap();
        assert_eq!(datasets.len(), 1);
        let ds = datasets[0].clone().normalized().unwrap();
        assert_eq!(ds.name, "intensity");
        assert_eq!(ds.axis, vec![400.5, 401.5, 402.5]);
        assert_eq!(ds.values, Intensity::Single(vec![10.0, 12.0, 11.0]));
    }

    #[test]
    fn test_header_names_split_channels() {
        let datasets = load(b"wavelength;ROI1;ROI2\n400;1;2\n401;3;4\n").unwrap();
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].name, "ROI1");
        assert_eq!(datasets[1].name, "ROI2");
        assert_eq!(datasets[0].axis, vec![400.0, 401.0]);
        assert_eq!(datasets[1].values, Intensity::Single(vec![2.0, 4.0]));
    }

    #[test]
    fn test_unusable_header_keeps_channels_together() {
        for content in [
            &b"wavelength;counts\n400;1;2\n401;3;4\n"[..],
            &b"wavelength;frame;frame\n400;1;2\n401;3;4\n"[..],
            &b"Acquired with 10 ms exposure\n400;1;2\n401;3;4\n"[..],
        ] {
            let datasets = load(content).unwrap();
            assert_eq!(datasets.len(), 1);
            assert_eq!(datasets[0].name, DEFAULT_DATASET_NAME);
            assert_eq!(datasets[0].values, Intensity::Channels(vec![vec![1.0, 3.0], vec![2.0, 4.0]]));
        }
    }

    #[test]
    fn test_semicolon_with_decimal_comma() {
        let datasets = load(b"400,25;1,5\n401,25;2,5\n").unwrap();
        let ds = &datasets[0];
        assert_eq!(ds.axis, vec![400.25, 401.25]);
        assert_eq!(ds.values, Intensity::Channels(vec![vec![1.5, 2.5]]));
    }

    #[test]
    fn test_tab_separated_channels_and_bad_rows() {
        let datasets = load(b"400\t1\t2\n401\t3\t4\n# comment\n402\t5\n403\t7\t8\n").unwrap();
        let ds = &datasets[0];
        assert_eq!(ds.axis, vec![400.0, 401.0, 403.0]);
        assert_eq!(ds.values, Intensity::Channels(vec![vec![1.0, 3.0, 7.0], vec![2.0, 4.0, 8.0]]));
    }

    #[test]
    fn test_space_aligned_columns() {
        let datasets = load(b"400.0    1.0\n401.0    2.0\n").unwrap();
        assert_eq!(datasets[0].values, Intensity::Channels(vec![vec![1.0, 2.0]]));
    }

    #[test]
    fn test_binary_and_empty_files_are_unreadable() {
        assert!(matches!(load(b"SPE\0\0\x01\x02"), Err(LoadError::UnreadableFile { .. })));
        assert!(matches!(load(b"just a note\n"), Err(LoadError::UnreadableFile { .. })));
        assert!(matches!(load(b"400\n401\n"), Err(LoadError::UnreadableFile { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TextLoader::default().open(&dir.path().join("gone.txt")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_schema_inference() {
        assert_eq!(infer_schema("400.1\t5"), Some(('\t', '.')));
        assert_eq!(infer_schema("400,1 5,2"), Some((' ', ',')));
        assert_eq!(infer_schema("400,5"), Some((',', '.')));
        assert_eq!(infer_schema("400"), None);
    }
}
