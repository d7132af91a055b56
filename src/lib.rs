pub mod app;
pub mod config;
pub mod tmux;
pub mod ui;
