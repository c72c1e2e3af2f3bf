//! Chat capability resolution for a (user, project) pair.

pub mod repository;
pub mod resolver;
