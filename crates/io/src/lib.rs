// File I/O operations

pub mod csv;
pub mod save;
pub mod utf16;

pub use csv::{read_all, write_document, CodecError, Record, RecordReader};
pub use save::{SaveError, SaveSession, Target};
