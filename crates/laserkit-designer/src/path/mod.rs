//! Path data reading: tokenizer, arc conversion and flattener.

pub mod arc;
pub mod command;
pub mod flatten;
pub mod tokenizer;

pub use command::{CommandKind, PathCommand};
pub use flatten::{
    flatten, flatten_commands, flatten_report, flatten_with_transform, PathReport,
    DEFAULT_TOLERANCE_MM, MAX_CURVE_SEGMENTS,
};
pub use tokenizer::{tokenize, tokenize_with_diagnostics, Tokenized};
