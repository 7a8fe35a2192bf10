pub mod achievements_api;
pub mod simple;
