/// Unsaved-change tracking.
///
/// Structural edits (row/cell insertion, deletion, paste) set `hard`; they
/// cannot be undone cell by cell. Text edits count the cells that currently
/// differ from their original, so editing a cell and restoring it leaves the
/// document clean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyState {
    pub hard: bool,
    pub soft_modified: usize,
}

impl DirtyState {
    pub fn is_dirty(&self) -> bool {
        self.hard || self.soft_modified > 0
    }

    pub fn set_hard(&mut self) {
        self.hard = true;
    }

    /// Account for one cell going from `before` to `after` modified-ness.
    pub fn update_soft(&mut self, before: bool, after: bool) {
        match (before, after) {
            (false, true) => self.soft_modified += 1,
            (true, false) => self.soft_modified = self.soft_modified.saturating_sub(1),
            _ => {}
        }
    }

    pub fn reset_soft(&mut self) {
        self.soft_modified = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_then_restore_is_clean() {
        let mut dirty = DirtyState::default();
        dirty.update_soft(false, true);
        assert!(dirty.is_dirty());
        dirty.update_soft(true, true);
        assert_eq!(dirty.soft_modified, 1);
        dirty.update_soft(true, false);
        assert!(!dirty.is_dirty());
        dirty.update_soft(true, false);
        assert_eq!(dirty.soft_modified, 0);
    }

    #[test]
    fn test_hard_survives_soft_reset() {
        let mut dirty = DirtyState::default();
        dirty.set_hard();
        dirty.reset_soft();
        assert!(dirty.is_dirty());
        dirty.reset();
        assert!(!dirty.is_dirty());
    }
}
