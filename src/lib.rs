pub mod api;
pub mod app;
pub mod assets;
pub mod config;
pub mod dispatch;
pub mod entities;
pub mod fetcher;
pub mod handlers;
pub mod repositories;
pub mod scan;
pub mod scanner;
pub mod summary;
pub mod worker;
