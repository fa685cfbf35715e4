pub mod backend;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod fs;
pub mod go_source;
pub mod go_types;
pub mod go_visitor;
pub mod logging;
pub mod po;
pub mod registry;
pub mod template;
pub mod unit;
pub mod writer;
