pub mod account;
pub mod file;
pub mod maintenance;
