pub mod cache;
pub mod db;
pub mod jwt;
pub mod logging;
