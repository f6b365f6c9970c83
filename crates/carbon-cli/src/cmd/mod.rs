pub mod catalog;
pub mod config;
pub mod etl;
pub mod init;
pub mod optimize;
pub mod summarize;
