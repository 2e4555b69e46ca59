pub mod cell;
pub mod clipboard;
pub mod column_width;
pub mod dirty;
pub mod mode;
pub mod protect;
pub mod search;
pub mod sheet;

pub use cell::{Cell, Row};
pub use mode::{Bom, Mode, StreamEncoding, Term};
pub use sheet::{Cursor, RowFeed, RowPtr, Sheet};
