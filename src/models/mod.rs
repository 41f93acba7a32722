// src/models/mod.rs

pub mod comment;
pub mod forum;
pub mod post;
pub mod reaction;
pub mod user;
