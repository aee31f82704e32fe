//! HTTP surface for the analysis pipeline

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
