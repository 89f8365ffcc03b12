mod reader;
mod writer;

pub use reader::{RecordDataset, RecordReader, read_records};
pub use writer::{RecordSink, RecordWriter};
