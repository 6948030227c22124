pub mod predictions;
pub mod teams;
pub mod users;
