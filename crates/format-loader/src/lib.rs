#[macro_use]
pub mod environment;

pub mod configuration;
mod engine;
mod error;
pub mod ignores;
pub mod loader;
pub mod runner;
mod session;
pub mod utils;

#[cfg(test)]
mod test_helpers;

pub use engine::*;
pub use error::*;
pub use session::*;
