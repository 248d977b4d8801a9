//! HTTP endpoints demonstrating cooperative request cancellation.
//!
//! | Route | Cancellation source |
//! |---|---|
//! | `GET /tasks/no-cancellation` | none |
//! | `GET /tasks/with-cancellation-source` | fixed time budget |
//! | `GET /tasks/with-request-cancellation` | client connection lifetime |
//! | `GET /tasks/with-ef-query-cancellation` | client connection lifetime, forwarded into a query |

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod abort;
pub mod config;
pub mod error;
pub mod handlers;
pub mod server;

pub use abort::RequestAborted;
pub use config::Config;
pub use server::{build_router, serve, shutdown_signal, AppState};
