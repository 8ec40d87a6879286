pub mod catalog;
pub mod cli;
pub mod config;

#[cfg(test)]
pub(crate) mod testutils;
