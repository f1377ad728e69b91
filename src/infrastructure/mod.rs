//! Infrastructure layer: database access and blob storage

pub mod blobs;
pub mod database;
