mod context;
mod transform;
mod watch;

pub use context::*;
pub use transform::*;
pub use watch::*;
