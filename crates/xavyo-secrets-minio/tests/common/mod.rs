//! Common test utilities for lifecycle tests.
//!
//! An in-memory [`MinioAdmin`] records every call in order and can be told
//! to fail or stall specific operations.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Map, Value};
use xavyo_minio_admin::{
    async_trait, AccountStatus, AdminError, AdminResult, ConnectionParams, MinioAdmin,
};
use xavyo_secrets_minio::{ClientFactory, InitializeRequest};

/// A recorded admin call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AddUser {
        username: String,
        password: String,
    },
    RemoveUser {
        username: String,
    },
    SetUser {
        username: String,
        password: String,
        status: AccountStatus,
    },
    SetPolicy {
        policies: String,
        entity: String,
        is_group: bool,
    },
    AddCannedPolicy {
        name: String,
        document: Value,
    },
}

/// Operation names accepted by [`RecordingAdmin::fail_on`].
pub const ADD_USER: &str = "add_user";
pub const REMOVE_USER: &str = "remove_user";
pub const SET_USER: &str = "set_user";
pub const SET_POLICY: &str = "set_policy";
pub const ADD_CANNED_POLICY: &str = "add_canned_policy";

#[derive(Default)]
pub struct RecordingAdmin {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<&'static str>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
}

impl RecordingAdmin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent call to `operation` fail.
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// Make every subsequent call to `operation` take `delay` to answer.
    pub fn delay_on(&self, operation: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(operation, delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| operation_name(c) == operation)
            .count()
    }

    async fn record(&self, call: Call) -> AdminResult<()> {
        let operation = operation_name(&call);
        self.calls.lock().unwrap().push(call);

        let delay = self.delays.lock().unwrap().get(operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(operation) {
            return Err(AdminError::Api {
                status: 400,
                code: "XMinioInjectedFailure".to_string(),
                message: format!("{operation} failed"),
            });
        }
        Ok(())
    }
}

fn operation_name(call: &Call) -> &'static str {
    match call {
        Call::AddUser { .. } => ADD_USER,
        Call::RemoveUser { .. } => REMOVE_USER,
        Call::SetUser { .. } => SET_USER,
        Call::SetPolicy { .. } => SET_POLICY,
        Call::AddCannedPolicy { .. } => ADD_CANNED_POLICY,
    }
}

#[async_trait]
impl MinioAdmin for RecordingAdmin {
    async fn add_user(&self, access_key: &str, secret_key: &str) -> AdminResult<()> {
        self.record(Call::AddUser {
            username: access_key.to_string(),
            password: secret_key.to_string(),
        })
        .await
    }

    async fn remove_user(&self, access_key: &str) -> AdminResult<()> {
        self.record(Call::RemoveUser {
            username: access_key.to_string(),
        })
        .await
    }

    async fn set_user(
        &self,
        access_key: &str,
        secret_key: &str,
        status: AccountStatus,
    ) -> AdminResult<()> {
        self.record(Call::SetUser {
            username: access_key.to_string(),
            password: secret_key.to_string(),
            status,
        })
        .await
    }

    async fn set_policy(
        &self,
        policy_names: &str,
        user_or_group: &str,
        is_group: bool,
    ) -> AdminResult<()> {
        self.record(Call::SetPolicy {
            policies: policy_names.to_string(),
            entity: user_or_group.to_string(),
            is_group,
        })
        .await
    }

    async fn add_canned_policy(&self, name: &str, policy: &[u8]) -> AdminResult<()> {
        let document = serde_json::from_slice(policy)?;
        self.record(Call::AddCannedPolicy {
            name: name.to_string(),
            document,
        })
        .await
    }
}

/// Hands out the same [`RecordingAdmin`] and remembers every connection.
pub struct RecordingFactory {
    pub admin: Arc<RecordingAdmin>,
    connections: Mutex<Vec<ConnectionParams>>,
}

impl RecordingFactory {
    pub fn new(admin: Arc<RecordingAdmin>) -> Arc<Self> {
        Arc::new(Self {
            admin,
            connections: Mutex::new(Vec::new()),
        })
    }

    pub fn connections(&self) -> Vec<ConnectionParams> {
        self.connections.lock().unwrap().clone()
    }
}

impl ClientFactory for RecordingFactory {
    fn connect(&self, params: &ConnectionParams) -> AdminResult<Arc<dyn MinioAdmin>> {
        self.connections.lock().unwrap().push(params.clone());
        Ok(self.admin.clone())
    }
}

pub fn config(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub fn default_config() -> Map<String, Value> {
    config(json!({
        "url": "https://h:9000",
        "username": "root",
        "password": "rootpw"
    }))
}

pub fn init_request(config: Map<String, Value>) -> InitializeRequest {
    InitializeRequest {
        config,
        verify_connection: false,
    }
}

/// A valid read-only policy document for bucket `reports`.
pub fn readonly_document() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Action": ["s3:GetObject", "s3:ListBucket"],
            "Resource": ["arn:aws:s3:::reports", "arn:aws:s3:::reports/*"]
        }]
    })
}

/// Send test logs to the test harness.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("xavyo_secrets_minio=debug")
        .with_test_writer()
        .try_init();
}
