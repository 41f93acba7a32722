// src/utils/mod.rs

pub mod comment_tree;
pub mod hash;
pub mod html;
pub mod identity;
pub mod jwt;
pub mod slug;
