//! Shell command analysis helpers

pub mod shell;
