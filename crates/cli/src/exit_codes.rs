//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract: scripts piping through
//! `tabula` rely on them.
//!
//! | Code | Meaning                                                       |
//! |------|---------------------------------------------------------------|
//! | 0    | Success (quit normally, saved or not)                         |
//! | 1    | Runtime error (input closed, terminal failure, write failure) |
//! | 2    | Usage error (bad flags, unreadable file, bad width spec or encoding label) |

/// Success - the editor was quit normally.
pub const EXIT_SUCCESS: u8 = 0;

/// Runtime error - the edit loop ended with a fatal error.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing file, invalid option value.
pub const EXIT_USAGE: u8 = 2;
