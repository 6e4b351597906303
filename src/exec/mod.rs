//! Exec instance management.
//!
//! This module provides the client side of container exec:
//! - Create, inspect, start and resize exec instances
//! - Validation of start options before any network call
//! - Selection of one of six output delivery modes
//!
//! # Example
//!
//! ```no_run
//! use container_exec::exec::{ExecClient, ExecConfig, ExecResult, ExecStartOptions};
//! use container_exec::transport::ExecTransport;
//!
//! async fn run<T: ExecTransport>(client: &ExecClient<T>) -> container_exec::Result<()> {
//!     let exec_id = client
//!         .create("web-1", &ExecConfig::shell("echo out; echo err >&2"))
//!         .await?;
//!
//!     let options = ExecStartOptions::builder().demux(true).build()?;
//!     if let ExecResult::CompleteDemuxed(output) = client.start(&exec_id, options).await? {
//!         println!("stdout: {}", output.stdout);
//!         println!("stderr: {}", output.stderr);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod id;
mod mode;
mod options;
mod result;
mod state;

pub use client::{ExecClient, DEFAULT_POLL_INTERVAL};
pub use id::ExecId;
pub use mode::OutputMode;
pub use options::{ConsoleSize, ExecConfig, ExecStartOptions, ExecStartOptionsBuilder};
pub use result::{ExecInspect, ExecResult, ProcessConfig};
pub use state::ExecState;
