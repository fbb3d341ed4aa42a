pub mod models;
pub mod tracker;
