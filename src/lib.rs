//! Command-line front end for staging task artifacts.

pub mod cli;
