// Engine library root

pub mod config;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod indicators;
pub mod services;
pub mod signals;
pub mod strategies;
