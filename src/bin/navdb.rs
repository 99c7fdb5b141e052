//! # navdb Runner
//!
//! Thin entry point: opens one table and serves it over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Serve an existing table from ./dbfolder on :8080
//! navdb users
//!
//! # Explicit folder and listen address
//! navdb --dir /var/lib/navdb --listen 127.0.0.1:9090 users
//!
//! # Create a small demo table first if it does not exist
//! navdb --create-demo users
//! ```

use std::env;

use eyre::{bail, Result};
use tracing_subscriber::EnvFilter;

use navdb::database::Database;
use navdb::schema::{Field, FieldDef, FieldType, IndexDef};
use navdb::server::{Server, DEFAULT_LISTEN_ADDR};
use navdb::storage::DEFAULT_DB_FOLDER;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut dir = DEFAULT_DB_FOLDER.to_string();
    let mut listen = DEFAULT_LISTEN_ADDR.to_string();
    let mut create_demo = false;
    let mut table_name: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--dir" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    bail!("--dir requires a path");
                };
                dir = value.clone();
            }
            "--listen" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    bail!("--listen requires an address");
                };
                listen = value.clone();
            }
            "--create-demo" => create_demo = true,
            arg if arg.starts_with('-') => bail!("unknown flag '{arg}'"),
            arg => {
                if table_name.is_some() {
                    bail!("only one table name may be given");
                }
                table_name = Some(arg.to_string());
            }
        }
        i += 1;
    }

    let Some(table_name) = table_name else {
        print_usage();
        bail!("missing table name");
    };

    let db = Database::with_folder(&dir);

    if create_demo {
        db.create_table(&table_name, &demo_definition())?;
    }

    let table = db.open_table(&table_name)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let server = Server::bind(&listen, table).await?;
        server.serve().await
    })
}

fn demo_definition() -> FieldDef {
    FieldDef {
        fields: vec![
            Field {
                field_type: FieldType::Text,
                name: "field_1".into(),
                length: 15,
                required: true,
                indexes: Some(vec![IndexDef {
                    index_type: "btree".into(),
                    name: "idx_f1".into(),
                }]),
            },
            Field {
                field_type: FieldType::Bool,
                name: "field_2".into(),
                length: 0,
                required: false,
                indexes: None,
            },
            Field {
                field_type: FieldType::Int,
                name: "field_3".into(),
                length: 0,
                required: false,
                indexes: Some(vec![IndexDef {
                    index_type: "btree".into(),
                    name: "idx_f3".into(),
                }]),
            },
            Field {
                field_type: FieldType::Text,
                name: "field_4".into(),
                length: 12,
                required: false,
                indexes: Some(vec![IndexDef {
                    index_type: "btree".into(),
                    name: "idx_f4".into(),
                }]),
            },
        ],
    }
}

fn print_usage() {
    println!("navdb - embedded navigational record store");
    println!();
    println!("Usage: navdb [OPTIONS] <table>");
    println!();
    println!("Options:");
    println!("  --dir <path>       Database folder (default {DEFAULT_DB_FOLDER})");
    println!("  --listen <addr>    Listen address (default {DEFAULT_LISTEN_ADDR})");
    println!("  --create-demo      Create a demo table definition before opening");
    println!("  -h, --help         Show this help");
}
