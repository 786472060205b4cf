//! Blocking HTTP client.

use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder, Response};
use tracing::{debug, trace};

use mirai_core::{TransportError, TransportResult, Value};

use super::HttpApi;

/// [`HttpApi`] over a blocking `reqwest` client.
///
/// Must not be used from inside a tokio runtime; WebSocket callbacks that
/// need it should run on the worker pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Creates a client for `host`, e.g. `127.0.0.1:8080`; `http://` is
    /// assumed when no scheme is given.
    pub fn new(host: &str, timeout: Duration) -> TransportResult<Self> {
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(TransportError::InvalidConfig("empty host".to_string()));
        }
        let base_url = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };

        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        debug!(base_url = %base_url, "HTTP client created");
        Ok(Self { client, base_url })
    }

    /// The scheme and host every path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl HttpApi for HttpClient {
    fn get(&self, path: &str, query: &[(&str, String)]) -> TransportResult<Value> {
        let url = self.url(path);
        trace!(url = %url, "GET");
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        read_json(resp)
    }

    fn post(&self, path: &str, body: &Value) -> TransportResult<Value> {
        let url = self.url(path);
        trace!(url = %url, "POST");
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        read_json(resp)
    }
}

fn read_json(resp: Response) -> TransportResult<Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(TransportError::Http {
            status: status.as_u16(),
            body,
        });
    }
    resp.json()
        .map_err(|e| TransportError::Request(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serves one request with `status` and `body`; yields the request line
    /// and body.
    fn serve_once(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            let _ = tx.send((
                request_line.trim_end().to_string(),
                String::from_utf8(request_body).unwrap(),
            ));
        });
        (addr.to_string(), rx)
    }

    #[test]
    fn test_get_with_query() {
        let (host, rx) = serve_once("200 OK", r#"[{"id":1,"nickname":"a","remark":""}]"#);
        let client = HttpClient::new(&host, Duration::from_secs(5)).unwrap();
        let value = client
            .get("/friendList", &[("sessionKey", "abc".to_string())])
            .unwrap();
        assert_eq!(value[0]["id"], 1);

        let (request_line, _) = rx.recv().unwrap();
        assert_eq!(request_line, "GET /friendList?sessionKey=abc HTTP/1.1");
    }

    #[test]
    fn test_post_json() {
        let (host, rx) = serve_once("200 OK", r#"{"code":0,"msg":"success"}"#);
        let client = HttpClient::new(&format!("http://{host}/"), Duration::from_secs(5)).unwrap();
        let value = client.post("recall", &json!({ "target": 7 })).unwrap();
        assert_eq!(value["code"], 0);

        let (request_line, body) = rx.recv().unwrap();
        assert_eq!(request_line, "POST /recall HTTP/1.1");
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "target": 7 }));
    }

    #[test]
    fn test_non_success_status() {
        let (host, _rx) = serve_once("404 Not Found", "{}");
        let client = HttpClient::new(&host, Duration::from_secs(5)).unwrap();
        let err = client.get("/missing", &[]).unwrap_err();
        assert!(matches!(err, TransportError::Http { status: 404, .. }));
    }

    #[test]
    fn test_invalid_host() {
        assert!(matches!(
            HttpClient::new("  ", Duration::from_secs(1)),
            Err(TransportError::InvalidConfig(_))
        ));
        let client = HttpClient::new("localhost:8080", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
