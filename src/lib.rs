//! slirc-bot - IRC command bot with NickServ-backed permissions.
//!
//! Chat lines are matched against a [`commands::Registry`]; commands that
//! carry a permission are gated by an [`auth::Authorizer`], which proves the
//! sender's identity with a NickServ `STATUS` challenge and resolves the
//! permissions of the linked account from the [`db::Database`].

pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod network;
pub mod proto;
