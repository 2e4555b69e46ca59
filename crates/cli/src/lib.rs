// tabula - terminal editor for delimiter-separated text

pub mod tui;
pub mod util;
