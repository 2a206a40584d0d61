//! RST synthesis: annotations, inline markup, version tracking, and the
//! per-namespace page writer.

pub mod annotations;
pub mod inline;
pub mod version;
pub mod writer;

pub use annotations::{Annotations, Block, NoteKind, VersionFlag};
pub use inline::InlineFormatter;
pub use version::VersionTracker;
pub use writer::{collapse_blank_lines, RenderedPage, Writer};
