// Interactive editor
//
// `edit` runs a session: the coordinator streams rows in while keys are
// read, commands change the document, and the renderer redraws the lines
// that changed.

mod commands;
pub mod coordinator;
pub mod editor;
pub mod input;
pub mod keys;
pub mod render;
pub mod terminal;

pub use editor::{edit, CellEdit, EditError, EditorConfig, Outcome, Validator};
pub use input::{shared, InputError, InputSource, Script, SharedInput};
pub use terminal::Terminal;
