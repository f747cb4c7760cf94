pub mod backend;
pub mod cmd;
pub mod db;
pub mod jobs;
pub mod limits;
pub mod mail;
pub mod utils;
