pub mod analysis;
pub mod database;
pub mod dataset;
pub mod models;
pub mod ui;
