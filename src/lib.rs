mod tools;
pub mod static_huff;

type DYNERR = Box<dyn std::error::Error>;

/// Errors that abort a compress or expand run
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("file is too large")]
    FileTooLarge,
    #[error("file format mismatch")]
    FileFormatMismatch,
    #[error("malformed frequency header")]
    MalformedHeader
}
