//! adscope library
//!
//! Inspects ad-creative tables held in Airtable and downloads the media
//! they reference through an external downloader. The binary in
//! `main.rs` is a thin clap front end over these modules.

pub mod airtable;
pub mod cli;
pub mod config;
pub mod introspect;
pub mod logging;
pub mod media;
pub mod server;
pub mod tools;
