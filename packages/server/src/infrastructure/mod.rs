//! Infrastructure layer: storage adapters, credential verification and wire
//! formats.

pub mod auth;
pub mod dto;
pub mod repository;
