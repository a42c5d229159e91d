pub mod api;
pub mod battle;
pub mod config;
pub mod db;
pub mod error;
pub mod kitchen;
pub mod leaderboard;
pub mod logging;
pub mod meal;
pub mod metrics;
pub mod random;
pub mod roster;
pub mod scoring;
