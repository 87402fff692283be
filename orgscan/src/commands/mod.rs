// orgscan/src/commands/mod.rs

pub mod cache;
pub mod clean;
pub mod context;
pub mod quota;
pub mod rules;
pub mod run;
