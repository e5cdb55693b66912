pub mod app_state;
pub mod camera;
pub mod config;
pub mod core;
pub mod web;
