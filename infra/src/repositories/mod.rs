pub mod jwt;
pub mod memory;
