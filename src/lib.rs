//! Backend for a Missive sidebar that looks up and edits Monday.com board
//! items by the sender's email address.

pub mod cache;
pub mod config;
pub mod logging;
pub mod missive;
pub mod monday;
pub mod search;
pub mod server;
