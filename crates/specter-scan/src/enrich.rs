//! Best-effort enrichment side calls.
//!
//! Geo-coordinate batch lookup (ip-api) and IP reputation (VirusTotal).
//! Both skip private addresses before any outbound request and degrade to
//! "no data" on quota exhaustion, network failure, or missing credentials.
//! Nothing here can fail a scan cycle.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use specter_core::{GeoLocation, ThreatVerdict};

/// ip-api batch endpoint caps requests at 100 addresses.
pub const GEO_BATCH_LIMIT: usize = 100;

const GEO_API_URL: &str = "http://ip-api.com/batch";
const VT_API_URL: &str = "https://www.virustotal.com/api/v3/ip_addresses";
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// True for addresses worth an outbound lookup; private, loopback, and
/// link-local ranges never leave the host.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified())
        }
        IpAddr::V6(v6) => !(v6.is_loopback() || v6.is_unspecified()),
    }
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent("specter-scan/0.1")
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[derive(Serialize)]
struct GeoQuery {
    query: String,
}

#[derive(Deserialize)]
struct GeoApiEntry {
    #[serde(default)]
    status: String,
    #[serde(default)]
    query: String,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
    #[serde(default)]
    city: String,
    #[serde(rename = "countryCode", default)]
    country_code: String,
}

/// Batch geo-coordinate lookup against ip-api.
pub struct GeoLocator {
    client: reqwest::Client,
}

impl Default for GeoLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoLocator {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    /// Resolve coordinates for the public addresses in `ips`.
    ///
    /// Returns only successfully resolved entries; every failure path
    /// (non-2xx, malformed body, transport error) yields an empty list.
    pub async fn locate(&self, ips: &[IpAddr]) -> Vec<GeoLocation> {
        let payload: Vec<GeoQuery> = ips
            .iter()
            .filter(|ip| is_public_ip(**ip))
            .take(GEO_BATCH_LIMIT)
            .map(|ip| GeoQuery {
                query: ip.to_string(),
            })
            .collect();

        if payload.is_empty() {
            return Vec::new();
        }

        let response = match self.client.post(GEO_API_URL).json(&payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "Geo lookup request failed");
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Geo lookup rejected");
            return Vec::new();
        }

        match response.json::<Vec<GeoApiEntry>>().await {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| e.status == "success")
                .map(|e| GeoLocation {
                    ip: e.query,
                    lat: e.lat,
                    lon: e.lon,
                    city: e.city,
                    country: e.country_code,
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Geo lookup body unparsable");
                Vec::new()
            }
        }
    }
}

#[derive(Deserialize)]
struct VtResponse {
    data: VtData,
}

#[derive(Deserialize)]
struct VtData {
    attributes: VtAttributes,
}

#[derive(Deserialize)]
struct VtAttributes {
    last_analysis_stats: VtStats,
}

#[derive(Deserialize)]
struct VtStats {
    #[serde(default)]
    malicious: u32,
}

/// VirusTotal IP reputation lookup.
pub struct ThreatChecker {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl ThreatChecker {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: http_client(),
            api_key,
        }
    }

    /// Check one address. Private address, missing key, quota exhaustion,
    /// or any transport/parse error all degrade to the benign verdict.
    pub async fn check(&self, ip: IpAddr) -> ThreatVerdict {
        if !is_public_ip(ip) {
            return ThreatVerdict::default();
        }
        let Some(key) = &self.api_key else {
            tracing::debug!("No VirusTotal API key configured; skipping reputation lookup");
            return ThreatVerdict::default();
        };

        let url = format!("{VT_API_URL}/{ip}");
        let response = match self.client.get(&url).header("x-apikey", key).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(ip = %ip, error = %e, "Reputation request failed");
                return ThreatVerdict::default();
            }
        };

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(ip = %ip, "VirusTotal quota exceeded");
            return ThreatVerdict::default();
        }
        if !response.status().is_success() {
            tracing::warn!(ip = %ip, status = %response.status(), "Reputation lookup rejected");
            return ThreatVerdict::default();
        }

        match response.json::<VtResponse>().await {
            Ok(body) => {
                let malicious = body.data.attributes.last_analysis_stats.malicious;
                ThreatVerdict {
                    malicious: malicious > 0,
                    score: malicious,
                }
            }
            Err(e) => {
                tracing::warn!(ip = %ip, error = %e, "Reputation body unparsable");
                ThreatVerdict::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn private_ranges_are_not_public() {
        for ip in [
            "192.168.1.5",
            "10.0.0.1",
            "172.16.4.2",
            "172.31.255.1",
            "127.0.0.1",
            "169.254.0.7",
            "0.0.0.0",
        ] {
            let ip: Ipv4Addr = ip.parse().unwrap();
            assert!(!is_public_ip(IpAddr::V4(ip)), "{ip}");
        }
        assert!(!is_public_ip(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    }

    #[test]
    fn routable_addresses_are_public() {
        for ip in ["8.8.8.8", "1.1.1.1", "172.32.0.1"] {
            let ip: Ipv4Addr = ip.parse().unwrap();
            assert!(is_public_ip(IpAddr::V4(ip)), "{ip}");
        }
    }

    #[tokio::test]
    async fn private_only_batch_never_issues_a_request() {
        let locator = GeoLocator::new();
        let ips: Vec<IpAddr> = vec![
            "192.168.1.10".parse().unwrap(),
            "10.1.2.3".parse().unwrap(),
        ];
        // Empty before any socket is touched.
        assert!(locator.locate(&ips).await.is_empty());
    }

    #[tokio::test]
    async fn private_address_check_returns_benign_without_a_request() {
        let checker = ThreatChecker::new(Some("unused-key".to_string()));
        let verdict = checker.check("192.168.1.10".parse().unwrap()).await;
        assert!(!verdict.malicious);
        assert_eq!(verdict.score, 0);
    }

    #[tokio::test]
    async fn missing_api_key_degrades_to_benign() {
        let checker = ThreatChecker::new(None);
        let verdict = checker.check("8.8.8.8".parse().unwrap()).await;
        assert!(!verdict.malicious);
    }
}
