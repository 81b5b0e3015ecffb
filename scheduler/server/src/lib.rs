pub mod config;
pub mod entities;
pub mod nextdate;
pub mod task;
pub mod web;
