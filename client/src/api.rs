use opportunity_shared::{FetchError, RegionCollection};

/// Path of the scored region dataset, relative to the page origin.
pub const DATA_URL: &str = "/data/opportunity.geojson";

/// Fetch and parse the region feature collection.
pub async fn fetch_opportunity_geojson() -> Result<RegionCollection, FetchError> {
    let resp = gloo_net::http::Request::get(DATA_URL)
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    if !resp.ok() {
        return Err(FetchError::Status(resp.status()));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;
    Ok(RegionCollection::from_geojson_str(&body)?)
}
