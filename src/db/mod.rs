// Database module
// This module handles SQLite storage of audio entries

pub mod connection;
pub mod migrations;
pub mod models;
pub mod operations;
