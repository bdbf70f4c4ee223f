//! # Utility Modules
//!
//! Supporting utilities used throughout the transport implementation.
//!
//! ## Components
//! - **Timeout**: Async timeout wrappers and default timeout constants

pub mod timeout;
