pub mod config;
pub mod logs_fmt;
