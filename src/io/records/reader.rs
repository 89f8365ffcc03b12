use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::marker::PhantomData;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::io::{Format, error::Error};

/// Streaming reader yielding one decoded record per non-blank line.
///
/// A malformed line yields [`Error::Parse`] and reading continues with the
/// next line. A failing read yields [`Error::Io`] once and ends the stream.
pub struct RecordReader<T, R = BufReader<File>> {
    reader: R,
    path: PathBuf,
    format: Format,
    line: usize,
    remaining: Option<usize>,
    buf: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T, R: BufRead> RecordReader<T, R> {
    pub fn new(reader: R, path: impl AsRef<Path>, format: Format) -> Self {
        Self {
            reader,
            path: path.as_ref().to_path_buf(),
            format,
            line: 0,
            remaining: None,
            buf: String::new(),
            _marker: PhantomData,
        }
    }

    /// Line number of the most recently read line.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<T: DeserializeOwned, R: BufRead> Iterator for RecordReader<T, R> {
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let text = self.buf.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some(
                        serde_json::from_str(text)
                            .map_err(|e| Error::parse(self.format, self.line, e.to_string())),
                    );
                }
                Err(e) => {
                    self.remaining = Some(0);
                    return Some(Err(Error::io(&self.path, e)));
                }
            }
        }
    }
}

pub fn read_records<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    format: Format,
) -> Result<RecordReader<T>, Error> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    Ok(RecordReader::new(BufReader::new(file), path, format))
}

/// Indexed view of a records file supporting slicing by record position.
///
/// Opening scans the file once and remembers where each record starts;
/// records themselves are decoded lazily by [`read_range`](Self::read_range).
#[derive(Debug, Clone)]
pub struct RecordDataset<T> {
    path: PathBuf,
    format: Format,
    index: Vec<(u64, usize)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> RecordDataset<T> {
    pub fn open(path: impl AsRef<Path>, format: Format) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = BufReader::new(file);

        let mut index = Vec::new();
        let mut offset = 0u64;
        let mut line = 0usize;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| Error::io(path, e))?;
            if read == 0 {
                break;
            }
            line += 1;
            if !buf.trim_ascii().is_empty() {
                index.push((offset, line));
            }
            offset += read as u64;
        }

        Ok(Self {
            path: path.to_path_buf(),
            format,
            index,
            _marker: PhantomData,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_range(&self, range: Range<usize>) -> Result<RecordReader<T>, Error> {
        if range.start > range.end || range.end > self.len() {
            return Err(Error::OutOfRange {
                start: range.start,
                end: range.end,
                len: self.len(),
            });
        }

        let mut file = File::open(&self.path).map_err(|e| Error::io(&self.path, e))?;
        let mut first_line = 0;
        if let Some(&(offset, line)) = self.index.get(range.start) {
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| Error::io(&self.path, e))?;
            first_line = line;
        }

        let mut reader = RecordReader::new(BufReader::new(file), &self.path, self.format);
        reader.line = first_line.saturating_sub(1);
        reader.remaining = Some(range.len());
        Ok(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_lines(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn reader_skips_blank_lines_and_reports_bad_records() {
        let file = write_lines(&["1", "", "oops", "3"]);
        let values: Vec<Result<u32, Error>> = read_records(file.path(), Format::Reactions)
            .unwrap()
            .collect();

        assert_eq!(values.len(), 3);
        assert_eq!(*values[0].as_ref().unwrap(), 1);
        assert!(matches!(values[1], Err(Error::Parse { line: 3, .. })));
        assert_eq!(*values[2].as_ref().unwrap(), 3);
    }

    #[test]
    fn dataset_indexes_records_and_slices_ranges() {
        let file = write_lines(&["10", "", "20", "30", "40"]);
        let dataset = RecordDataset::<u32>::open(file.path(), Format::Reactions).unwrap();
        assert_eq!(dataset.len(), 4);

        let middle: Vec<u32> = dataset
            .read_range(1..3)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(middle, vec![20, 30]);

        let tail: Vec<u32> = dataset
            .read_range(3..4)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tail, vec![40]);

        assert_eq!(dataset.read_range(4..4).unwrap().count(), 0);
    }

    #[test]
    fn dataset_parse_errors_carry_file_line_numbers() {
        let file = write_lines(&["10", "", "bad"]);
        let dataset = RecordDataset::<u32>::open(file.path(), Format::Reactions).unwrap();
        let mut reader = dataset.read_range(1..2).unwrap();
        assert!(matches!(reader.next(), Some(Err(Error::Parse { line: 3, .. }))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn dataset_rejects_out_of_range_slices() {
        let file = write_lines(&["1", "2"]);
        let dataset = RecordDataset::<u32>::open(file.path(), Format::Reactions).unwrap();
        assert!(matches!(
            dataset.read_range(1..5),
            Err(Error::OutOfRange { start: 1, end: 5, len: 2 })
        ));
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.jsonl");
        assert!(matches!(
            RecordDataset::<u32>::open(&missing, Format::Reactions),
            Err(Error::Io { .. })
        ));
    }
}
