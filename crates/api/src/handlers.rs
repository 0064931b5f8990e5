pub mod health;
pub mod movies;
pub mod root;
pub mod tasks;
