use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::accumulator::MergeAccumulator;
use super::error::Error;
use crate::io::{Format, RecordReader};

/// Numbered chunk files `{base}_{index}` sharing one base path.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    base: PathBuf,
}

impl ChunkStore {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.suffixed(&format!("_{index}"))
    }

    fn temp_path(&self, index: usize) -> PathBuf {
        self.suffixed(&format!("_{index}.tmp"))
    }

    fn suffixed(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.base.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    }

    pub fn exists(&self, index: usize) -> bool {
        self.path(index).is_file()
    }

    /// Blocks of chunk `index`, or `None` when that chunk was never written.
    pub fn read<M: DeserializeOwned>(
        &self,
        index: usize,
    ) -> Result<Option<ChunkBlocks<M>>, Error> {
        match read_blocks(self.path(index)) {
            Ok(blocks) => Ok(Some(blocks)),
            Err(Error::Io(crate::io::Error::Io { source, .. }))
                if source.kind() == ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Starts writing chunk `index` to a temporary file next to it.
    pub fn begin(&self, index: usize) -> Result<ChunkSpill, Error> {
        let temp = self.temp_path(index);
        let file = File::create(&temp).map_err(|e| crate::io::Error::io(&temp, e))?;
        Ok(ChunkSpill {
            path: self.path(index),
            temp,
            writer: BufWriter::new(file),
            blocks: 0,
            records: 0,
        })
    }

    /// Deletes chunk `index`; a chunk that is already gone is not an error.
    pub fn remove(&self, index: usize) -> Result<(), Error> {
        let path = self.path(index);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(crate::io::Error::io(&path, e).into()),
        }
    }
}

/// Chunk being written. Nothing is visible under the chunk's name until
/// [`commit`](Self::commit) succeeds.
#[derive(Debug)]
pub struct ChunkSpill {
    path: PathBuf,
    temp: PathBuf,
    writer: BufWriter<File>,
    blocks: usize,
    records: usize,
}

impl ChunkSpill {
    /// Appends `block` as one line; empty blocks are not written.
    pub fn write_block<M: Serialize>(&mut self, block: &MergeAccumulator<M>) -> Result<(), Error> {
        if block.is_empty() {
            return Ok(());
        }
        serde_json::to_writer(&mut self.writer, block)
            .map_err(|e| crate::io::Error::serialize(Format::Chunk, e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| crate::io::Error::io(&self.temp, e))?;
        self.blocks += 1;
        self.records += block.len();
        Ok(())
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Syncs the temporary file and renames it into place.
    pub fn commit(self) -> Result<PathBuf, Error> {
        let file = self
            .writer
            .into_inner()
            .map_err(|e| crate::io::Error::io(&self.temp, e.into_error()))?;
        file.sync_all()
            .map_err(|e| crate::io::Error::io(&self.temp, e))?;
        drop(file);
        fs::rename(&self.temp, &self.path).map_err(|e| crate::io::Error::io(&self.path, e))?;
        Ok(self.path)
    }
}

/// Decoded blocks of one chunk file, in write order.
pub struct ChunkBlocks<M> {
    path: PathBuf,
    reader: RecordReader<MergeAccumulator<M>>,
}

impl<M: DeserializeOwned> Iterator for ChunkBlocks<M> {
    type Item = Result<MergeAccumulator<M>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.reader.next()?;
        Some(block.map_err(|source| Error::Chunk {
            path: self.path.clone(),
            source,
        }))
    }
}

pub fn read_blocks<M: DeserializeOwned>(path: impl AsRef<Path>) -> Result<ChunkBlocks<M>, Error> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| crate::io::Error::io(path, e))?;
    Ok(ChunkBlocks {
        path: path.to_path_buf(),
        reader: RecordReader::new(BufReader::new(file), path, Format::Chunk),
    })
}
