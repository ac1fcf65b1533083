//! Weibo archiver library.
//!
//! Periodically pulls one account's posts, and the replies that account made
//! to commenters, from the mobile web API into SQLite, and exports the archive
//! as a static JSON site.

pub mod api;
pub mod config;
pub mod constants;
pub mod date;
pub mod db;
pub mod export;
pub mod mapper;
pub mod scan;
