use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::types::Rate;

pub const BASE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl CoinGeckoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("btcbrl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url, timeout))
    }

    fn with_client(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// BTC price in BRL. The request is dropped once `timeout` elapses.
    #[instrument(skip(self), fields(base = %self.base_url))]
    pub async fn fetch_rate(&self) -> Result<Rate, FetchError> {
        match tokio::time::timeout(self.timeout, self.request_rate()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }

    async fn request_rate(&self) -> Result<Rate, FetchError> {
        let url = format!(
            "{}/simple/price?ids=bitcoin&vs_currencies=brl",
            self.base_url
        );

        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status()));
        }

        let text = resp.text().await?;
        let rate = parse_rate(&text)?;
        debug!(rate = rate.value(), "rate fetched");
        Ok(rate)
    }
}

fn parse_rate(body: &str) -> Result<Rate, FetchError> {
    let data: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        FetchError::Malformed(format!(
            "{} | response: {}",
            e,
            body.chars().take(300).collect::<String>()
        ))
    })?;
    let value = data["bitcoin"]["brl"]
        .as_f64()
        .ok_or_else(|| FetchError::Malformed("missing bitcoin.brl".into()))?;
    Rate::new(value).ok_or_else(|| FetchError::Malformed(format!("bad rate {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    /// Serves one canned response and hands back the request head.
    async fn serve_once(response: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = sock.read(&mut buf).await.unwrap_or(0);
            let _ = tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());
            let _ = sock.write_all(response.as_bytes()).await;
            let _ = sock.shutdown().await;
        });
        (format!("http://{}/api/v3", addr), rx)
    }

    fn client(base: &str, timeout: Duration) -> CoinGeckoClient {
        let http = Client::builder().no_proxy().build().unwrap();
        CoinGeckoClient::with_client(http, base, timeout)
    }

    #[test]
    fn parses_well_formed_payload() {
        let rate = parse_rate(r#"{"bitcoin":{"brl":350000}}"#).unwrap();
        assert_eq!(rate.value(), 350_000.0);
        let rate = parse_rate(r#"{"bitcoin":{"brl":351234.56}}"#).unwrap();
        assert_eq!(rate.value(), 351_234.56);
    }

    #[test]
    fn rejects_malformed_payloads() {
        for body in [
            "",
            "<html>rate limited</html>",
            "{}",
            r#"{"bitcoin":{}}"#,
            r#"{"bitcoin":{"usd":60000}}"#,
            r#"{"bitcoin":{"brl":"350000"}}"#,
            r#"{"bitcoin":{"brl":0}}"#,
            r#"{"bitcoin":{"brl":-5}}"#,
        ] {
            assert!(
                matches!(parse_rate(body), Err(FetchError::Malformed(_))),
                "body {body:?}"
            );
        }
    }

    #[tokio::test]
    async fn fetches_rate_from_simple_price() {
        let (base, request) =
            serve_once(http_response("200 OK", r#"{"bitcoin":{"brl":350000}}"#)).await;
        let rate = client(&base, Duration::from_secs(5)).fetch_rate().await.unwrap();
        assert_eq!(rate.value(), 350_000.0);

        let head = request.await.unwrap();
        assert!(
            head.starts_with("GET /api/v3/simple/price?ids=bitcoin&vs_currencies=brl "),
            "request was {head:?}"
        );
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let (base, _) =
            serve_once(http_response("429 Too Many Requests", r#"{"status":"limited"}"#)).await;
        let err = client(&base, Duration::from_secs(5)).fetch_rate().await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 429));
    }

    #[tokio::test]
    async fn missing_field_is_malformed() {
        let (base, _) = serve_once(http_response("200 OK", r#"{"bitcoin":{}}"#)).await;
        let err = client(&base, Duration::from_secs(5)).fetch_rate().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let timeout = Duration::from_millis(200);
        let started = std::time::Instant::now();
        let err = client(&format!("http://{}", addr), timeout)
            .fetch_rate()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(d) if d == timeout));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client(&format!("http://{}", addr), Duration::from_secs(5))
            .fetch_rate()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
