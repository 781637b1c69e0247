pub mod article;
pub mod auth;
pub mod file;
pub mod notification;
pub mod user;
