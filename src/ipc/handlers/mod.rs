pub mod core;
pub mod courses;
pub mod instructors;
pub mod persistence;
pub mod records;
pub mod students;
