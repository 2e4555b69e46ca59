use std::str::FromStr;

use rustc_hash::FxHashMap;

pub const DEFAULT_WIDTH: usize = 14;
/// Interactive adjustment stays within these bounds.
pub const MIN_WIDTH: usize = 4;
pub const MAX_WIDTH: usize = 40;

/// Display width per column: a default plus per-column overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnWidths {
    default: usize,
    overrides: FxHashMap<usize, usize>,
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self {
            default: DEFAULT_WIDTH,
            overrides: FxHashMap::default(),
        }
    }
}

impl ColumnWidths {
    pub fn new(default: usize) -> Self {
        Self {
            default,
            overrides: FxHashMap::default(),
        }
    }

    pub fn get(&self, col: usize) -> usize {
        self.overrides.get(&col).copied().unwrap_or(self.default)
    }

    pub fn set(&mut self, col: usize, width: usize) {
        if width == self.default {
            self.overrides.remove(&col);
        } else {
            self.overrides.insert(col, width);
        }
    }

    /// Sum of widths of columns `from..to`.
    pub fn sum(&self, from: usize, to: usize) -> usize {
        (from..to).map(|c| self.get(c)).sum()
    }

    /// `]`: one column wider, up to the maximum.
    pub fn widen(&mut self, col: usize) -> bool {
        let width = self.get(col);
        if width < MAX_WIDTH {
            self.set(col, width + 1);
            true
        } else {
            false
        }
    }

    /// `[`: one column narrower, down to the minimum.
    pub fn narrow(&mut self, col: usize) -> bool {
        let width = self.get(col);
        if width > MIN_WIDTH {
            self.set(col, width - 1);
            true
        } else {
            false
        }
    }

    /// Apply a `DEFAULT,COL:WIDTH,...` spec on top of the current widths.
    pub fn apply_spec(&mut self, spec: &str) -> Result<(), String> {
        for part in spec.split(',') {
            let part = part.trim();
            match part.split_once(':') {
                Some((col, width)) => {
                    let col = parse_number(col, spec)?;
                    let width = parse_number(width, spec)?;
                    self.overrides.insert(col, width);
                }
                None => self.default = parse_number(part, spec)?,
            }
        }
        Ok(())
    }
}

fn parse_number(s: &str, spec: &str) -> Result<usize, String> {
    s.trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid width spec '{}': {}", spec, e))
}

impl FromStr for ColumnWidths {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut widths = Self::default();
        widths.apply_spec(spec)?;
        Ok(widths)
    }
}
