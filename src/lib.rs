pub mod backend;
pub mod batch;
pub mod build_state;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod marker;
pub mod oracle;
pub mod poll;
pub mod rebuild;
pub mod release;
pub mod report;
pub mod scanner;
