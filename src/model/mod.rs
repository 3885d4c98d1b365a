//! Data types, in the three shapes they take: shared (`common`), stored (`db`),
//! and exchanged over HTTP (`api`).

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
