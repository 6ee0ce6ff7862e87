//! Transport layer - one HTTP request in, one normalized outcome out
//!
//! This module provides:
//! - Request and outcome types
//! - Transport trait for network abstraction
//! - HttpTransport implementation (reqwest)
//! - MockTransport for tests

pub mod client;
pub mod http;
pub mod mock;
pub mod types;

pub use client::Transport;
pub use http::{HttpTransport, HttpTransportConfig};
pub use mock::MockTransport;
pub use types::{AUTHORIZATION, Failure, Method, RequestDescriptor, RequestOutcome, Response, UNAUTHORIZED};
