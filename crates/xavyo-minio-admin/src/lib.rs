//! # MinIO Admin Client
//!
//! Thin client for the subset of the MinIO admin API that xavyo needs to
//! provision dynamic credentials: user creation, password rotation, user
//! removal, canned-policy registration and policy binding.
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_minio_admin::{ConnectionParams, MinioAdmin, MinioAdminClient};
//!
//! let params = ConnectionParams::new("minio.internal:9000", "root", "rootpw", true);
//! let client = MinioAdminClient::new(&params)?;
//! client.add_user("v-alice-ro-abc", "s3cr3t-pw").await?;
//! client.set_policy("readonly", "v-alice-ro-abc", false).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`traits`] - The [`MinioAdmin`] capability trait
//! - [`client`] - reqwest implementation of [`MinioAdmin`]
//! - [`types`] - Connection parameters and account status
//! - [`signing`] - AWS Signature V4 request signing
//! - [`crypto`] - Encryption of credential payloads
//! - [`error`] - Error types

pub mod client;
pub mod crypto;
pub mod error;
pub mod signing;
pub mod traits;
pub mod types;

pub use client::MinioAdminClient;
pub use error::{AdminError, AdminResult};
pub use traits::MinioAdmin;
pub use types::{AccountStatus, ConnectionParams};

// Re-export async_trait for MinioAdmin implementors
pub use async_trait::async_trait;
