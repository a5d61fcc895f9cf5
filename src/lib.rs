pub mod analytics;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod counter;
pub mod download;
pub mod error;
pub mod gallery;
pub mod storage;
pub mod types;
