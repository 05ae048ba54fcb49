//! Missive sidebar integration.

pub mod event;
pub mod panel;
