use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] crate::io::Error),

    #[error("merge chunk '{}' is unreadable: {source}", .path.display())]
    Chunk {
        path: PathBuf,
        #[source]
        source: crate::io::Error,
    },

    #[error("dump size must be at least 1")]
    ZeroDumpSize,
}
