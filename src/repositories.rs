pub mod accounts;
pub mod json_store;
pub mod predictions;
pub mod users;
