//! Core types shared by the mailgate crates.
//!
//! This crate provides the `Result` alias used across the workspace and the
//! strongly-typed identifiers that flow between the SSO adapter and the
//! authentication gateway.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{
    BackendNode, ParseIdError, PgtIou, Principal, ProxyGrantingTicket, ProxyTicket, ServiceTicket,
};
