pub mod catalog;
pub mod identity;
pub mod tokens;
