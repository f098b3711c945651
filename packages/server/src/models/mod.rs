pub mod account;
pub mod maintenance;
