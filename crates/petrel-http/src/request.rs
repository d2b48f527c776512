//! HTTP request construction and the single-exchange transport.

use http::Method;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};
use url::Url;

use crate::{HttpError, Response, ResponseParser};

const CONTENT_TYPE: &str = "Content-Type";
const CONTENT_LENGTH: &str = "Content-Length";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const JSON: &str = "application/json";

/// Configuration for one HTTP request.
///
/// Headers and body fields keep their insertion order; that order is the
/// serialization order on the wire.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl RequestOptions {
    /// A GET request for `/` on port 8080 of the given host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            host: host.into(),
            port: 8080,
            path: "/".to_string(),
            headers: Vec::new(),
            body: Value::Object(serde_json::Map::new()),
        }
    }

    /// Derive host, port, and path from a parsed URL.
    pub fn from_url(url: &Url) -> Result<Self, HttpError> {
        let host = url
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl("missing host".to_string()))?;
        let mut options = Self::new(host);
        options.port = url.port_or_known_default().unwrap_or(8080);
        options.path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        Ok(options)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set a header. An existing header with the same (case-sensitive)
    /// name keeps its position but takes the new value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Encode the body per the `Content-Type` policy: JSON serialization
    /// for `application/json`, `&`-joined `key=urlencode(value)` pairs in
    /// field insertion order otherwise.
    pub fn encoded_body(&self) -> String {
        if self.header_value(CONTENT_TYPE) == Some(JSON) {
            return self.body.to_string();
        }
        match self.body.as_object() {
            Some(fields) => fields
                .iter()
                .map(|(key, value)| {
                    format!("{}={}", key, urlencoding::encode(&field_text(value)))
                })
                .collect::<Vec<_>>()
                .join("&"),
            None => String::new(),
        }
    }

    /// Serialize the full request: request line, headers, blank line,
    /// encoded body. A missing `Content-Type` gets the form-urlencoded
    /// default; `Content-Length` is always set to the encoded body's
    /// length.
    pub fn to_wire(&self) -> String {
        let mut request = self.clone();
        if request.header_value(CONTENT_TYPE).is_none() {
            request = request.header(CONTENT_TYPE, FORM_URLENCODED);
        }
        let body = request.encoded_body();
        request = request.header(CONTENT_LENGTH, body.len().to_string());

        let headers = request
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\r\n");

        format!(
            "{} {} HTTP/1.1\r\n{}\r\n\r\n{}",
            request.method, request.path, headers, body
        )
    }

    /// Open a connection to `host:port` and perform the exchange.
    pub async fn send(&self) -> Result<Response, HttpError> {
        let addr = format!("{}:{}", self.host, self.port);
        debug!(method = %self.method, %addr, path = %self.path, "connecting");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| HttpError::ConnectionFailed(e.to_string()))?;
        self.send_on(stream).await
    }

    /// Perform the exchange over an already established connection.
    ///
    /// Writes the serialized request, then feeds everything the peer
    /// sends into a [`ResponseParser`] until the body completes or the
    /// stream ends.
    pub async fn send_on<S>(&self, mut stream: S) -> Result<Response, HttpError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream.write_all(self.to_wire().as_bytes()).await?;
        stream.flush().await?;

        let mut parser = ResponseParser::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                parser.end_of_input();
                break;
            }
            parser.receive(&String::from_utf8_lossy(&buf[..n]))?;
            if parser.is_finished() {
                break;
            }
        }

        if !parser.is_finished() {
            return Err(HttpError::TruncatedResponse);
        }

        let response = parser.response();
        trace!(
            status = response.status_code,
            body_len = response.body.len(),
            "response received"
        );
        Ok(response)
    }
}

/// Stringify one body field the way template interpolation would: strings
/// stay bare, everything else uses its JSON rendering.
fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
