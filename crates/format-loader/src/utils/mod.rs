mod ancestors;
mod file_globs;
mod logging;

pub use ancestors::*;
pub use file_globs::*;
pub use logging::*;
