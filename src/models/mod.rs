//! Data models for OpenShelf

pub mod enums;
pub mod loan;
pub mod principal;
pub mod staff;
pub mod user;
