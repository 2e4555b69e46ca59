use std::fmt;

/// Why a mutation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectError {
    ReadOnly,
    HeaderProtected,
    ColumnFixed,
}

impl fmt::Display for ProtectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "Read Only Mode !"),
            Self::HeaderProtected => write!(f, "Header is protected"),
            Self::ColumnFixed => write!(f, "The order of Columns is fixed !"),
        }
    }
}

impl std::error::Error for ProtectError {}

/// Write-protection settings of an editing session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Protection {
    pub read_only: bool,
    pub protect_header: bool,
    pub fix_column: bool,
    pub header_lines: usize,
}

impl Protection {
    pub fn is_header(&self, line: usize) -> bool {
        line < self.header_lines
    }

    /// May the row at `line` be changed?
    pub fn check_row(&self, line: usize) -> Result<(), ProtectError> {
        if self.protect_header && self.is_header(line) {
            return Err(ProtectError::HeaderProtected);
        }
        if self.read_only {
            return Err(ProtectError::ReadOnly);
        }
        Ok(())
    }

    /// May a column be inserted or deleted at the row at `line`?
    pub fn check_row_and_column(&self, line: usize) -> Result<(), ProtectError> {
        self.check_row(line)?;
        if self.fix_column {
            return Err(ProtectError::ColumnFixed);
        }
        Ok(())
    }
}
