//! Thin typed wrapper over the metrics server's HTTP API.

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use fleet_core::models::{
    DeviceStatsResponse, ErrorResponse, HealthResponse, HeartbeatRequest, UploadStatsRequest,
};
use fleet_core::API_PREFIX;
use reqwest::{Response, StatusCode, Url};

#[derive(Clone)]
pub struct FleetClient {
    http: reqwest::Client,
    base: Url,
}

impl FleetClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let base = Url::parse(url).with_context(|| format!("Invalid server URL {}", url))?;
        if base.cannot_be_a_base() {
            bail!("Invalid server URL {}", url);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// Append path segments to the base URL. Each segment is percent-encoded,
    /// so a device id can never change the route.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid server URL {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn device_url(&self, device_id: &str, leaf: &str) -> anyhow::Result<Url> {
        let prefix = API_PREFIX.split('/').filter(|s| !s.is_empty());
        self.endpoint(prefix.chain(["devices", device_id, leaf]))
    }

    pub async fn health(&self) -> anyhow::Result<HealthResponse> {
        let resp = self.http.get(self.endpoint(["health"])?).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn heartbeat(&self, device_id: &str, sent_at: DateTime<Utc>) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(self.device_url(device_id, "heartbeat")?)
            .json(&HeartbeatRequest { sent_at })
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn upload(
        &self,
        device_id: &str,
        sent_at: DateTime<Utc>,
        upload_time: i64,
    ) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(self.device_url(device_id, "stats")?)
            .json(&UploadStatsRequest {
                sent_at,
                upload_time,
            })
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// `None` while the device has not reported anything yet.
    pub async fn stats(&self, device_id: &str) -> anyhow::Result<Option<DeviceStatsResponse>> {
        let resp = self.http.get(self.device_url(device_id, "stats")?).send().await?;
        let resp = check(resp).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(resp.json().await?))
    }
}

/// Pass 2xx responses through; turn anything else into an error carrying
/// the server's `msg`.
async fn check(resp: Response) -> anyhow::Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let msg = match resp.json::<ErrorResponse>().await {
        Ok(body) => body.msg,
        Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
    };
    bail!("{} (HTTP {})", msg, status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_urls_ignore_trailing_slash() {
        let client = FleetClient::new("http://localhost:6733/").unwrap();
        assert_eq!(
            client.device_url("60-6b-44-84-dc-64", "heartbeat").unwrap().as_str(),
            "http://localhost:6733/api/v1/devices/60-6b-44-84-dc-64/heartbeat"
        );
        let client = FleetClient::new("http://localhost:6733").unwrap();
        assert_eq!(
            client.device_url("cam", "stats").unwrap().as_str(),
            "http://localhost:6733/api/v1/devices/cam/stats"
        );
        assert_eq!(
            client.endpoint(["health"]).unwrap().as_str(),
            "http://localhost:6733/health"
        );
    }

    #[test]
    fn device_id_is_one_path_segment() {
        let client = FleetClient::new("http://localhost:6733").unwrap();
        let url = client.device_url("a/b c?x#y", "stats").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:6733/api/v1/devices/a%2Fb%20c%3Fx%23y/stats"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path_segments().unwrap().count(), 5);
    }

    #[test]
    fn base_path_is_kept() {
        let client = FleetClient::new("http://gateway/fleet/").unwrap();
        assert_eq!(
            client.device_url("cam", "heartbeat").unwrap().as_str(),
            "http://gateway/fleet/api/v1/devices/cam/heartbeat"
        );
    }

    #[test]
    fn rejects_unusable_base() {
        assert!(FleetClient::new("not a url").is_err());
        assert!(FleetClient::new("mailto:ops@example.com").is_err());
    }
}
