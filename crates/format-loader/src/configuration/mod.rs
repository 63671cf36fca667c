mod editorconfig;
mod format_options;
mod loader_options;
mod project_config;
mod resolve_config;

pub use editorconfig::*;
pub use format_options::*;
pub use loader_options::*;
pub use project_config::*;
pub use resolve_config::*;
