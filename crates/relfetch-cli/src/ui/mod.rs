//! Console output.
//!
//! Status lines go to stderr so stdout stays reserved for the exposed bin
//! directory.

pub mod console;
pub mod theme;

pub use console::{ConsoleReporter, OutputMode};
pub use theme::Icons;
