//! Typed views over component attribute bags.
//!
//! Components are stored as raw JSON; these structs decode the handful of
//! attributes the coordinator itself reads. Every field defaults so that a
//! partially filled component still decodes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Datacenter credentials and location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Datacenter {
    pub name: String,
    #[serde(rename = "type")]
    pub datacenter_type: String,
    pub region: String,
    pub username: String,
    pub password: String,
    pub external_network: String,
    pub vcloud_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Router {
    pub name: String,
    #[serde(rename = "type")]
    pub router_type: String,
    pub ip: String,
    pub external_network: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    pub name: String,
    pub range: String,
    pub router: String,
    pub network_aws_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Instance {
    pub name: String,
    pub cpus: u32,
    pub ram: u64,
    pub ip: String,
    pub disks: Vec<Value>,
    pub network: String,
    pub security_groups: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallRule {
    pub source: String,
    pub source_port: String,
    pub destination: String,
    pub destination_port: String,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Firewall {
    pub name: String,
    pub router: String,
    pub rules: Vec<FirewallRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatRule {
    #[serde(rename = "type")]
    pub rule_type: String,
    pub protocol: String,
    pub network: String,
    pub origin_ip: String,
    pub origin_port: String,
    pub translation_ip: String,
    pub translation_port: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nat {
    pub name: String,
    pub router: String,
    pub network: String,
    pub rules: Vec<NatRule>,
}

/// A remote execution (also used for bootstraps).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Execution {
    pub name: String,
    pub payload: String,
    pub target: String,
    pub reports: Vec<Value>,
}
