//! EchoDoc: turns uploaded PDFs into narrated audio.

pub mod app;
pub mod auth;
pub mod config;
pub mod conversion;
pub mod error;
pub mod extract;
pub mod pdfs;
pub mod rate_limit;
pub mod state;
pub mod storage;
