pub mod commands;
pub mod config;
pub mod handler;
pub mod operation;
pub mod package;
pub mod plugin;
pub mod project_type;
pub mod runtime;
