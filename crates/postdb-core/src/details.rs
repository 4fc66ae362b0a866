// crates/postdb-core/src/details.rs

//! Passthrough to the third-party postcode detail service.
//!
//! The response body is handed back untouched. Every failure (connect,
//! timeout, non-2xx status, body that is not JSON) becomes
//! [`PostDbError::Upstream`].

use crate::config::LookupConfig;
use crate::error::{PostDbError, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, warn};

pub struct DetailsClient {
    config: LookupConfig,
    http: Client,
}

fn upstream(err: reqwest::Error) -> PostDbError {
    // The base URL may carry credentials; keep it out of logs and messages.
    let err = err.without_url();
    warn!(error = %err, "details lookup failed");
    PostDbError::Upstream(err.to_string())
}

impl DetailsClient {
    pub fn new(config: LookupConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("postdb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(upstream)?;
        Ok(Self { config, http })
    }

    /// `{base_url}{percent-encoded postcode}?output=json`
    pub fn url_for(&self, postcode: &str) -> String {
        format!(
            "{}{}?output=json",
            self.config.base_url,
            urlencoding::encode(postcode.trim())
        )
    }

    pub fn lookup(&self, postcode: &str) -> Result<Value> {
        debug!(postcode, "details lookup");
        let response = self
            .http
            .get(self.url_for(postcode))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .map_err(upstream)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "details lookup rejected");
            return Err(PostDbError::Upstream(format!("lookup answered {status}")));
        }
        response.json::<Value>().map_err(upstream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer exactly one request with `status` and `body`.
    fn one_shot_server(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/postcodes/", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request_line = String::new();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            reader.read_line(&mut request_line).unwrap();
            // Drain headers.
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            request_line
        });
        (base, handle)
    }

    #[test]
    fn url_percent_encodes_the_postcode() {
        let client = DetailsClient::new(LookupConfig::new("https://lookup.test/pc/")).unwrap();
        assert_eq!(
            client.url_for(" SW1A 1AA "),
            "https://lookup.test/pc/SW1A%201AA?output=json"
        );
    }

    #[test]
    fn body_is_returned_verbatim() {
        let (base, server) = one_shot_server("200 OK", r#"{"postcode":"SW1A 1AA","n":[1,2]}"#);
        let client = DetailsClient::new(LookupConfig::new(base)).unwrap();

        let value = client.lookup("SW1A 1AA").unwrap();
        assert_eq!(value, serde_json::json!({"postcode": "SW1A 1AA", "n": [1, 2]}));

        let request_line = server.join().unwrap();
        assert!(request_line.starts_with("GET /postcodes/SW1A%201AA?output=json "));
    }

    #[test]
    fn error_status_is_upstream_failure() {
        let (base, server) = one_shot_server("500 Internal Server Error", "{}");
        let client = DetailsClient::new(LookupConfig::new(base)).unwrap();
        let err = client.lookup("E1 6AN").unwrap_err();
        assert_eq!(err.status_code(), 502);
        server.join().unwrap();
    }

    #[test]
    fn unreachable_service_is_upstream_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = DetailsClient::new(LookupConfig::new(format!("http://127.0.0.1:{port}/")))
            .unwrap();
        assert!(matches!(client.lookup("E1 6AN"), Err(PostDbError::Upstream(_))));
    }
}
