//! Forwarding profiles: named sets of port-forward rules against a cluster.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kubernetes resource kind a forward targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Deployment,
    Service,
    Pod,
}

impl ResourceType {
    /// Returns the kubectl resource prefix (e.g. "svc" for services).
    pub fn kubectl_prefix(&self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::Service => "svc",
            Self::Pod => "pod",
        }
    }
}

/// One forwarding rule: a resource and a local:remote port pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardSpec {
    pub name: String,
    pub resource_type: ResourceType,
    pub local_port: u16,
    pub remote_port: u16,
}

impl ForwardSpec {
    /// Returns the kubectl resource reference (e.g. "svc/my-service").
    pub fn resource_ref(&self) -> String {
        format!("{}/{}", self.resource_type.kubectl_prefix(), self.name)
    }

    /// Returns the kubectl port pair argument (e.g. "8080:80").
    pub fn port_pair(&self) -> String {
        format!("{}:{}", self.local_port, self.remote_port)
    }
}

/// A named collection of forwarding rules plus cluster context/namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Cluster context; `None` means the caller's currently active context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub namespace: String,
    pub forwards: Vec<ForwardSpec>,
}

impl Profile {
    /// Validates the profile before anything is launched.
    ///
    /// Rejects empty profiles, duplicate spec names, and duplicate local
    /// ports (only one process can bind a local port).
    pub fn validate(&self) -> Result<()> {
        if self.forwards.is_empty() {
            return Err(Error::InvalidProfile(
                "profile contains no forwarding rules".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut ports = HashSet::new();
        for spec in &self.forwards {
            if !names.insert(spec.name.as_str()) {
                return Err(Error::InvalidProfile(format!(
                    "duplicate spec name '{}'",
                    spec.name
                )));
            }
            if !ports.insert(spec.local_port) {
                return Err(Error::InvalidProfile(format!(
                    "duplicate local port {} (spec '{}')",
                    spec.local_port, spec.name
                )));
            }
        }

        Ok(())
    }
}
