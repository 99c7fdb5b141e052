//! # HTTP/JSON Shell
//!
//! Exposes one open table over a fixed HTTP command set, mapping each
//! route to a cursor operation:
//!
//! ```text
//! /struct              table schema
//! /recCount            {"recordCount": n}
//! /use?indexName=      select (or clear) the active index
//! /first /last         position the cursor
//! /next /prev          step; body carries {"eof":..,"bof":..}
//! /fetch?id=           point read by record number
//! /fetchCurrent        re-read the record under the cursor
//! /insert              POST, JSON object body
//! /seek?value=         position via the active index
//! /delete?recNo=       soft delete
//! ```
//!
//! Failures map to HTTP 500 with an `{"error", "code"}` body. EOF and
//! BOF are status signals inside 200 bodies, never HTTP errors; a fetch
//! of a soft-deleted record answers JSON `null`.
//!
//! One connection is one tokio task. The table itself is single-cursor
//! state, so handlers serialize on a mutex; requests interleave at
//! request granularity, exactly like the cooperative model the storage
//! layer assumes.

mod http;

use std::sync::Arc;

use eyre::{Result, WrapErr};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use self::http::{read_request, Request, Response};
use crate::database::{Fetch, Table};
use crate::records::{Record, Value};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Serialize)]
struct Stat {
    #[serde(rename = "recordCount")]
    record_count: i64,
}

#[derive(Serialize, Default)]
struct RecordStatus {
    eof: bool,
    bof: bool,
}

/// HTTP front-end over one open [`Table`].
pub struct Server {
    listener: TcpListener,
    table: Arc<Mutex<Table>>,
}

impl Server {
    pub async fn bind(addr: &str, table: Table) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .wrap_err_with(|| format!("failed to bind '{addr}'"))?;
        Ok(Self {
            listener,
            table: Arc::new(Mutex::new(table)),
        })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.listener
            .local_addr()
            .wrap_err("failed to read listener address")
    }

    /// Accepts connections until the task is dropped.
    pub async fn serve(self) -> Result<()> {
        info!(addr = %self.local_addr()?, "serving table over http");

        loop {
            let (socket, peer) = self
                .listener
                .accept()
                .await
                .wrap_err("failed to accept connection")?;
            let table = self.table.clone();

            debug!(%peer, "accepted connection");
            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, table).await {
                    warn!(%peer, error = %e, "connection failed");
                }
                debug!(%peer, "connection closed");
            });
        }
    }
}

async fn handle_connection(socket: TcpStream, table: Arc<Mutex<Table>>) -> Result<()> {
    let (read_half, mut write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    while let Some(request) = read_request(&mut reader).await? {
        let response = dispatch(&request, &table);
        response.write_to(&mut write_half).await?;
    }

    Ok(())
}

fn dispatch(request: &Request, table: &Mutex<Table>) -> Response {
    debug!(method = %request.method, path = %request.path, "request");
    let mut table = table.lock();

    match request.path.as_str() {
        "/struct" => Response::json(table.structure()),

        "/recCount" => match table.rec_count() {
            Ok(n) => Response::json(&Stat { record_count: n }),
            Err(e) => Response::error(500, &e.to_string()),
        },

        "/use" => match table.use_index(request.query_param("indexName")) {
            Ok(()) => Response::ok_empty(),
            Err(e) => Response::error(500, &e.to_string()),
        },

        "/first" => match table.first() {
            Ok(_) => Response::ok_empty(),
            Err(e) => Response::error(500, &e.to_string()),
        },

        "/last" => match table.last() {
            Ok(_) => Response::ok_empty(),
            Err(e) => Response::error(500, &e.to_string()),
        },

        "/next" => match table.next() {
            Ok(Some(_)) => Response::json(&RecordStatus::default()),
            Ok(None) => Response::json(&RecordStatus {
                eof: true,
                ..Default::default()
            }),
            Err(e) => Response::error(500, &e.to_string()),
        },

        "/prev" => match table.prev() {
            Ok(Some(_)) => Response::json(&RecordStatus::default()),
            Ok(None) => Response::json(&RecordStatus {
                bof: true,
                ..Default::default()
            }),
            Err(e) => Response::error(500, &e.to_string()),
        },

        "/fetch" => {
            let Ok(rec_no) = request.query_param("id").parse::<i64>() else {
                return Response::error(500, "record ID is not a number");
            };
            fetch_response(table.fetch(rec_no))
        }

        "/fetchCurrent" => fetch_response(table.fetch_current()),

        "/insert" => {
            let record: Record = match serde_json::from_slice(&request.body) {
                Ok(record) => record,
                Err(e) => return Response::error(500, &e.to_string()),
            };
            match table.insert(&record) {
                Ok(()) => Response::ok_empty(),
                Err(e) => Response::error(500, &e.to_string()),
            }
        }

        "/seek" => {
            let value = Value::from(request.query_param("value"));
            match table.seek(&value) {
                Ok(_) => Response::ok_empty(),
                Err(e) => Response::error(500, &e.to_string()),
            }
        }

        "/delete" => {
            let Ok(rec_no) = request.query_param("recNo").parse::<i64>() else {
                return Response::error(500, "record number is not a number");
            };
            match table.delete(rec_no) {
                Ok(()) => Response::ok_empty(),
                Err(e) => Response::error(500, &e.to_string()),
            }
        }

        _ => Response::error(404, "unknown command"),
    }
}

fn fetch_response(outcome: eyre::Result<Fetch>) -> Response {
    match outcome {
        Ok(Fetch::Record(record)) => Response::json(&record),
        Ok(Fetch::Eof) => Response::json(&RecordStatus {
            eof: true,
            ..Default::default()
        }),
        // A deleted record has no payload; answer null as the fetch
        // handlers always have.
        Ok(Fetch::Deleted) => Response::json(&serde_json::Value::Null),
        Err(e) => Response::error(500, &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::schema::{Field, FieldDef, FieldType, IndexDef};
    use tempfile::tempdir;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

    fn serve_sample_table(dir: &std::path::Path) -> Table {
        let db = Database::with_folder(dir.join("db"));
        let def = FieldDef {
            fields: vec![Field {
                field_type: FieldType::Text,
                name: "name".into(),
                length: 8,
                required: true,
                indexes: Some(vec![IndexDef {
                    index_type: "btree".into(),
                    name: "idx_name".into(),
                }]),
            }],
        };
        db.create_table("t", &def).unwrap();
        db.open_table("t").unwrap()
    }

    async fn roundtrip(stream: &mut TcpStream, request: &str) -> (String, String) {
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut reader = BufReader::new(stream);
        let mut status = String::new();
        reader.read_line(&mut status).await.unwrap();

        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            if line.trim_end().is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }

        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).await.unwrap();
        (status.trim_end().to_string(), String::from_utf8(body).unwrap())
    }

    #[tokio::test]
    async fn shell_serves_insert_fetch_and_signals() {
        let dir = tempdir().unwrap();
        let table = serve_sample_table(dir.path());

        let server = Server::bind("127.0.0.1:0", table).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.serve());

        let mut stream = TcpStream::connect(addr).await.unwrap();

        let body = r#"{"name":"ann"}"#;
        let (status, _) = roundtrip(
            &mut stream,
            &format!(
                "POST /insert HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            ),
        )
        .await;
        assert_eq!(status, "HTTP/1.1 200 OK");

        let (status, body) = roundtrip(&mut stream, "GET /recCount HTTP/1.1\r\n\r\n").await;
        assert_eq!(status, "HTTP/1.1 200 OK");
        assert_eq!(body, r#"{"recordCount":1}"#);

        let (_, body) = roundtrip(&mut stream, "GET /fetch?id=0 HTTP/1.1\r\n\r\n").await;
        assert!(body.contains(r#""name":"ann""#));
        assert!(body.contains(r#""_recNo":0"#));

        let (_, body) = roundtrip(&mut stream, "GET /fetch?id=7 HTTP/1.1\r\n\r\n").await;
        assert_eq!(body, r#"{"eof":true,"bof":false}"#);

        let (status, body) = roundtrip(&mut stream, "GET /fetch?id=x HTTP/1.1\r\n\r\n").await;
        assert_eq!(status, "HTTP/1.1 500 Internal Server Error");
        assert!(body.contains("record ID is not a number"));

        let (status, _) = roundtrip(&mut stream, "GET /use?indexName=idx_name HTTP/1.1\r\n\r\n").await;
        assert_eq!(status, "HTTP/1.1 200 OK");

        let (status, _) = roundtrip(&mut stream, "GET /first HTTP/1.1\r\n\r\n").await;
        assert_eq!(status, "HTTP/1.1 200 OK");

        let (_, body) = roundtrip(&mut stream, "GET /next HTTP/1.1\r\n\r\n").await;
        assert_eq!(body, r#"{"eof":true,"bof":false}"#);

        let (status, _) = roundtrip(&mut stream, "GET /delete?recNo=0 HTTP/1.1\r\n\r\n").await;
        assert_eq!(status, "HTTP/1.1 200 OK");

        let (_, body) = roundtrip(&mut stream, "GET /fetch?id=0 HTTP/1.1\r\n\r\n").await;
        assert_eq!(body, "null");

        let (status, _) = roundtrip(&mut stream, "GET /nope HTTP/1.1\r\n\r\n").await;
        assert_eq!(status, "HTTP/1.1 404 Not Found");
    }
}
