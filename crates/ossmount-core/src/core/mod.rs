pub mod commands;
pub mod config;
pub mod runtime;
pub mod tooling;

#[cfg(test)]
pub(crate) mod testing;
