pub mod auth;
pub mod jwt;
pub mod passwords;
pub mod settings;
