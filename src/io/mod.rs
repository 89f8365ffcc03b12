//! Line-oriented record storage.
//!
//! Every file this crate reads or writes holds one JSON document per line:
//! reaction datasets, the rule library, merge chunks, and compiled
//! summaries. Blank lines are ignored on read.

use std::fmt;

pub mod error;
pub mod library;
pub mod records;

pub use error::Error;
pub use library::load_rule_library;
pub use records::{RecordDataset, RecordReader, RecordSink, RecordWriter, read_records};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Reactions,
    Rules,
    Chunk,
    Summaries,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Reactions => write!(f, "reaction record"),
            Format::Rules => write!(f, "rule library"),
            Format::Chunk => write!(f, "merge chunk"),
            Format::Summaries => write!(f, "reaction summary"),
        }
    }
}
