use choropleth_shared::{DataRecord, Topology, parse_dataset};

use crate::config::{DATASET_URL, TOPOLOGY_URL};

async fn fetch_text(url: &str) -> Result<String, String> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.text().await.map_err(|e| format!("fetch error: {e}"))
}

/// Fetch and preprocess the topology.
pub async fn fetch_topology() -> Result<Topology, String> {
    let text = fetch_text(TOPOLOGY_URL).await?;
    Topology::from_json(&text)
}

pub async fn fetch_dataset() -> Result<Vec<DataRecord>, String> {
    let text = fetch_text(DATASET_URL).await?;
    parse_dataset(&text)
}
