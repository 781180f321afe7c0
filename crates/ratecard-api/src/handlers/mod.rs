//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod data;
pub mod download;
pub mod health;
pub mod upload;
