pub mod classes;
pub mod core;
pub mod exchange;
pub mod question;
pub mod ranking;
pub mod rollcall;
pub mod students;
