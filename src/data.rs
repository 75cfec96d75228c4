pub mod photo;
pub mod student;
pub mod student_store;
pub mod user;
