//! Basic usage example for the WowMySQL client SDK
//!
//! This example demonstrates:
//! - Listing tables and reading a schema
//! - Fluent queries with filters, ordering and paging
//! - Insert, update and delete by id
//! - Quota-checked storage uploads and presigned downloads
//!
//! Run with: cargo run --example basic_usage -- --project-url https://myproj.wowmysql.com --api-key ...

use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wowmysql_client::{
    ClientError, Config, ListFilesOptions, SortDirection, StorageClient, StorageConfig,
    UploadOptions, WowMySqlClient,
};

#[derive(Parser, Debug)]
#[command(name = "basic_usage")]
#[command(about = "Walk through the WowMySQL data and storage APIs")]
struct Args {
    /// Project URL
    #[arg(long, env = "WOWMYSQL_PROJECT_URL")]
    project_url: String,

    /// Project API key
    #[arg(long, env = "WOWMYSQL_API_KEY")]
    api_key: String,

    /// Table used by the walkthrough
    #[arg(long, default_value = "users", env = "WOWMYSQL_TABLE")]
    table: String,

    /// Skip the storage part
    #[arg(long)]
    skip_storage: bool,

    /// Enable debug logging
    #[arg(short, long, env = "WOWMYSQL_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wowmysql_client={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = WowMySqlClient::new(Config::new(&args.project_url, &args.api_key))?;

    // ==================== Database ====================

    println!("📋 Tables: {:?}", client.list_tables().await?);

    let schema = client.get_table_schema(&args.table).await?;
    println!("🧱 {} has {} columns", schema.name, schema.columns.len());

    let users = client.table(&args.table);

    let active = users
        .select(["id", "name", "email"])
        .eq("status", "active")
        .gte("age", 18)
        .order_by("name", SortDirection::Asc)
        .limit(10)
        .execute()
        .await?;
    println!("👥 Active users: {}", active.count);

    let created = users
        .insert(json!({
            "name": "John Doe",
            "email": "john@example.com",
            "age": 30,
            "status": "active"
        }))
        .await?;
    println!("➕ New user id: {}", created.id);

    let updated = users
        .update_by_id(&created.id, json!({"name": "John Smith"}))
        .await?;
    println!("✏️  Updated {} row(s)", updated.affected_rows);

    match users.get_by_id(&created.id).first().await? {
        Some(row) => println!("🔎 Fetched: {:?}", row.get("name")),
        None => println!("🔎 User vanished"),
    }

    let deleted = users.delete_by_id(&created.id).await?;
    println!("🗑️  Deleted {} row(s)", deleted.affected_rows);

    if args.skip_storage {
        return Ok(());
    }

    // ==================== Storage ====================

    let storage = StorageClient::new(StorageConfig::new(&args.project_url, &args.api_key))?;

    let quota = storage.get_quota().await?;
    println!(
        "💾 {} plan: {:.2} GB of {:.2} GB used",
        quota.plan_name, quota.storage_used_gb, quota.storage_quota_gb
    );

    match storage
        .upload("demo/hello.txt", &b"Hello, WowMySQL!"[..], UploadOptions::default())
        .await
    {
        Ok(result) => println!("⬆️  Uploaded {} ({} bytes)", result.key, result.size),
        Err(e @ ClientError::StorageLimitExceeded { .. }) => {
            println!("⚠️  {}", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let url = storage.download("demo/hello.txt", 3600).await?;
    println!("🔗 Download URL: {}", url);

    let files = storage
        .list_files(ListFilesOptions {
            prefix: Some("demo/".to_string()),
            limit: Some(10),
        })
        .await?;
    for file in &files {
        println!("   - {} ({} bytes)", file.key, file.size);
    }

    storage.delete_file("demo/hello.txt").await?;
    println!("✅ Done");

    Ok(())
}
