mod ignore_manager;

pub use ignore_manager::*;
