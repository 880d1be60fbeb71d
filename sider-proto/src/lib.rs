//! Sider gRPC Protocol Definitions
//!
//! This crate contains the generated gRPC code for the Sider key-value service.

/// Generated protobuf/gRPC code
pub mod sider {
    tonic::include_proto!("sider");
}

pub use sider::*;
