// RPC endpoint resolution through the ton-access gateway
//
// The gateway publishes the list of its nodes, each one reporting which
// protocol/network pairs it can currently serve. A healthy node is picked at
// random, weighted by its advertised weight.

use crate::network::Network;
use log::debug;
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

pub const ACCESS_HOST: &str = "https://ton.access.orbs.network";
pub const ACCESS_EDGE_VERSION: u8 = 1;
pub const TONCENTER_V2_PROTOCOL: &str = "toncenter-api-v2";

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("no healthy node available for {}", _0)]
    NoHealthyNode(String),
    #[cfg(feature = "rpc-client")]
    #[error("unable to fetch the access nodes: {}", _0)]
    Fetch(#[from] crate::rpc::RpcError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeManager {
    #[serde(default)]
    pub health: HashMap<String, bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessNode {
    pub node_id: String,
    #[serde(default)]
    pub healthy: Value,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub mngr: NodeManager,
}

impl AccessNode {
    // Healthy is reported as "1", 1 or true depending on the gateway version
    pub fn is_healthy(&self) -> bool {
        match &self.healthy {
            Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
            Value::Number(n) => n.as_u64() == Some(1),
            Value::Bool(b) => *b,
            _ => false,
        }
    }

    pub fn serves(&self, network: Network) -> bool {
        let key = format!("v2-{}", network);
        self.mngr.health.get(&key).copied().unwrap_or(false)
    }
}

pub fn build_endpoint(node: &AccessNode, network: Network) -> String {
    format!(
        "{}/{}/{}/{}/{}/jsonRPC",
        ACCESS_HOST, node.node_id, ACCESS_EDGE_VERSION, network, TONCENTER_V2_PROTOCOL
    )
}

// Pick a node able to serve the network, weighted random
pub fn select_endpoint<R: Rng>(
    nodes: &[AccessNode],
    network: Network,
    rng: &mut R,
) -> Result<String, AccessError> {
    let candidates: Vec<&AccessNode> = nodes
        .iter()
        .filter(|node| node.is_healthy() && node.serves(network))
        .collect();

    // a node advertising no weight still gets picked sometimes,
    // no candidate at all is the only way to fail here
    let weights = candidates.iter().map(|node| node.weight.max(1) as u64);
    let index = WeightedIndex::new(weights)
        .map_err(|_| AccessError::NoHealthyNode(format!("v2-{}", network)))?;
    Ok(build_endpoint(candidates[index.sample(rng)], network))
}

#[cfg(feature = "rpc-client")]
pub async fn get_http_endpoint(network: Network) -> Result<String, AccessError> {
    let url = format!("{}/mngr/nodes", ACCESS_HOST);
    let nodes: Vec<AccessNode> = crate::rpc::client::get_json(&url).await?;
    if log::log_enabled!(log::Level::Debug) {
        debug!("Fetched {} access nodes", nodes.len());
    }

    let endpoint = select_endpoint(&nodes, network, &mut rand::thread_rng())?;
    if log::log_enabled!(log::Level::Debug) {
        debug!("Resolved {} endpoint: {}", network, endpoint);
    }
    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::json;

    fn nodes() -> Vec<AccessNode> {
        serde_json::from_value(json!([
            {
                "NodeId": "aaa",
                "Healthy": "1",
                "Weight": 1,
                "Mngr": { "health": { "v2-mainnet": true, "v2-testnet": false } }
            },
            {
                "NodeId": "bbb",
                "Healthy": "1",
                "Weight": 3,
                "Mngr": { "health": { "v2-testnet": true } }
            },
            {
                "NodeId": "ccc",
                "Healthy": "0",
                "Weight": 5,
                "Mngr": { "health": { "v2-testnet": true } }
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_only_healthy_nodes_are_selected() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let endpoint = select_endpoint(&nodes(), Network::Testnet, &mut rng).unwrap();
            assert_eq!(
                endpoint,
                "https://ton.access.orbs.network/bbb/1/testnet/toncenter-api-v2/jsonRPC"
            );
        }
        let endpoint = select_endpoint(&nodes(), Network::Mainnet, &mut rng).unwrap();
        assert!(endpoint.contains("/aaa/1/mainnet/"));
    }

    #[test]
    fn test_selection_follows_weights() {
        let nodes: Vec<AccessNode> = serde_json::from_value(json!([
            { "NodeId": "light", "Healthy": "1", "Weight": 1, "Mngr": { "health": { "v2-testnet": true } } },
            { "NodeId": "heavy", "Healthy": 1, "Weight": 9, "Mngr": { "health": { "v2-testnet": true } } },
            { "NodeId": "unset", "Healthy": true, "Mngr": { "health": { "v2-testnet": true } } }
        ]))
        .unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = HashMap::new();
        for _ in 0..1100 {
            let endpoint = select_endpoint(&nodes, Network::Testnet, &mut rng).unwrap();
            let node = endpoint.split('/').nth(3).unwrap().to_owned();
            *counts.entry(node).or_insert(0u32) += 1;
        }
        // expected 100 / 900 / 100
        assert!(counts["heavy"] > 800);
        assert!(counts["light"] > 50 && counts["light"] < 150);
        assert!(counts["unset"] > 50 && counts["unset"] < 150);
    }

    #[test]
    fn test_no_node_available() {
        let mut rng = StdRng::seed_from_u64(1);
        let nodes: Vec<AccessNode> = nodes().into_iter().take(1).collect();
        assert!(matches!(
            select_endpoint(&nodes, Network::Testnet, &mut rng),
            Err(AccessError::NoHealthyNode(_))
        ));
    }
}
