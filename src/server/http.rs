//! Minimal HTTP/1.1 plumbing for the JSON shell.
//!
//! The shell serves a fixed command set to local tooling, so the parser
//! covers exactly what those clients send: a request line, headers (only
//! `Content-Length` is significant), and an optional body. Responses are
//! always `application/json` with an explicit length, keeping the
//! connection reusable.

use eyre::{bail, Result, WrapErr};
use hashbrown::HashMap;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug)]
pub(crate) struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn query_param(&self, name: &str) -> &str {
        self.query.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Reads one request, or `None` when the peer closed the connection
/// between requests.
pub(crate) async fn read_request<R>(reader: &mut R) -> Result<Option<Request>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader
        .read_line(&mut line)
        .await
        .wrap_err("failed to read request line")?;
    if n == 0 {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        bail!("malformed request line: {line:?}");
    };
    let method = method.to_string();
    let (path, query) = parse_target(target);

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        let n = reader
            .read_line(&mut header)
            .await
            .wrap_err("failed to read header line")?;
        if n == 0 {
            bail!("connection closed inside request headers");
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value
                    .trim()
                    .parse()
                    .wrap_err_with(|| format!("invalid Content-Length {value:?}"))?;
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader
            .read_exact(&mut body)
            .await
            .wrap_err("failed to read request body")?;
    }

    Ok(Some(Request {
        method,
        path,
        query,
        body,
    }))
}

fn parse_target(target: &str) -> (String, HashMap<String, String>) {
    match target.split_once('?') {
        None => (target.to_string(), HashMap::new()),
        Some((path, query)) => (path.to_string(), parse_query(query)),
    }
}

pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(percent_decode(key), percent_decode(value));
    }
    params
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => match (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                _ => {
                    out.push(bytes[i]);
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[derive(Debug)]
pub(crate) struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok_empty() -> Self {
        Self {
            status: 200,
            body: Vec::new(),
        }
    }

    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::error(500, &format!("failed to encode response: {e}")),
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        #[derive(Serialize)]
        struct AppError<'a> {
            error: &'a str,
            code: u16,
        }

        let body = serde_json::to_vec(&AppError {
            error: message,
            code: status,
        })
        .unwrap_or_else(|_| b"{\"error\":\"internal error\",\"code\":500}".to_vec());

        Self { status, body }
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n",
            self.status,
            status_text(self.status),
            self.body.len()
        );
        writer
            .write_all(head.as_bytes())
            .await
            .wrap_err("failed to write response head")?;
        writer
            .write_all(&self.body)
            .await
            .wrap_err("failed to write response body")?;
        writer.flush().await.wrap_err("failed to flush response")
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_splits_pairs_and_decodes() {
        let params = parse_query("indexName=idx%5F1&value=a+b&flag");

        assert_eq!(params.get("indexName").unwrap(), "idx_1");
        assert_eq!(params.get("value").unwrap(), "a b");
        assert_eq!(params.get("flag").unwrap(), "");
    }

    #[test]
    fn parse_target_separates_path_and_query() {
        let (path, query) = parse_target("/fetch?id=12");
        assert_eq!(path, "/fetch");
        assert_eq!(query.get("id").unwrap(), "12");

        let (path, query) = parse_target("/first");
        assert_eq!(path, "/first");
        assert!(query.is_empty());
    }

    #[test]
    fn percent_decode_leaves_malformed_escapes_alone() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("a%zzb"), "a%zzb");
        assert_eq!(percent_decode("%41"), "A");
    }

    #[tokio::test]
    async fn read_request_parses_line_headers_and_body() {
        let raw = b"POST /insert?x=1 HTTP/1.1\r\nHost: localhost\r\nContent-Length: 4\r\n\r\nbody";
        let mut reader = tokio::io::BufReader::new(&raw[..]);

        let request = read_request(&mut reader).await.unwrap().unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/insert");
        assert_eq!(request.query_param("x"), "1");
        assert_eq!(request.body, b"body");
    }

    #[tokio::test]
    async fn read_request_reports_clean_close_as_none() {
        let mut reader = tokio::io::BufReader::new(&b""[..]);
        assert!(read_request(&mut reader).await.unwrap().is_none());
    }
}
