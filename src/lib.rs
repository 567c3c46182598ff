pub mod chime;
pub mod cli;
pub mod commands;
pub mod config;
pub mod model;
pub mod router;
pub mod storage;
pub mod tasks;
pub mod timer;
pub mod ui;
