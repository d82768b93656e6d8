pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod db;
pub mod entity;
pub mod migration;
pub mod relation;
pub mod test;
pub mod web;
