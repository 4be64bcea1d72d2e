//! # nt-cli — command-line client for the Natours API
//!
//! - `nt tours list --filter difficulty=easy --sort=-price` — List tours as a table.
//! - `nt tours stats` / `nt tours plan 2021` — Aggregations.
//! - `nt explain "price[lt]=1000&sort=-price"` — Show the query plan offline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tabled::{builder::Builder, settings::Style};

use nt_query::{ListQueryBuilder, QueryParameters, QueryPlan};

/// Columns shown for full tour documents.
const DEFAULT_COLUMNS: [&str; 6] = ["id", "name", "difficulty", "duration", "price", "ratingsAverage"];

/// Natours tours API client.
#[derive(Parser)]
#[command(name = "nt", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with tours on a running hub.
    Tours {
        #[command(subcommand)]
        action: TourCmd,
    },

    /// Print the query plan a list query string produces, without a server.
    Explain {
        /// e.g. `difficulty=easy&price[lt]=1000&sort=-price&page=2`
        query: String,
    },
}

#[derive(Subcommand)]
enum TourCmd {
    List {
        /// Filter as `field=value` or `field[op]=value` (repeatable).
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,
        #[arg(long, allow_hyphen_values = true)]
        sort: Option<String>,
        #[arg(long)]
        fields: Option<String>,
        #[arg(long)]
        page: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
        /// Print the raw JSON response.
        #[arg(long)]
        json: bool,
    },
    Get {
        id: String,
    },
    /// The five best rated, cheapest tours.
    TopCheap {
        #[arg(long)]
        json: bool,
    },
    Stats,
    Plan {
        year: i32,
    },
    Create {
        /// JSON file with the tour.
        #[arg(long)]
        file: PathBuf,
    },
    Delete {
        id: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Explain { query } => explain(&query).map(|plan| println!("{}", plan)),

        // Async Commands
        Commands::Tours { action } => {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Failed to build tokio runtime: {}", e);
                    std::process::exit(1);
                }
            };
            rt.block_on(tours(action))
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn explain(raw: &str) -> Result<String, String> {
    let plan = ListQueryBuilder::new(QueryPlan::new(), QueryParameters::parse(raw))
        .apply_all()
        .into_query();
    let out = serde_json::json!({
        "filter": plan.filter.to_document(),
        "plan": plan,
    });
    serde_json::to_string_pretty(&out).map_err(|e| e.to_string())
}

async fn tours(action: TourCmd) -> Result<(), String> {
    let client = reqwest::Client::new();
    let base_url =
        std::env::var("NT_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    let tours_url = format!("{}/api/v1/tours", base_url.trim_end_matches('/'));

    match action {
        TourCmd::List {
            filters,
            sort,
            fields,
            page,
            limit,
            json,
        } => {
            let query = list_query(&filters, sort.as_deref(), fields.as_deref(), page, limit)?;
            let url = if query.is_empty() {
                tours_url
            } else {
                format!("{}?{}", tours_url, query)
            };
            let body = send(get_request(&client, &url)).await?;
            print_tours(&body, json, fields.as_deref())
        }

        TourCmd::TopCheap { json } => {
            let url = format!("{}/top-5-cheap", tours_url);
            let body = send(get_request(&client, &url)).await?;
            print_tours(&body, json, Some("name,price,ratingsAverage,difficulty"))
        }

        TourCmd::Get { id } => {
            let url = format!("{}/{}", tours_url, id);
            let body = send(get_request(&client, &url)).await?;
            print_json(&body["data"]["tour"])
        }

        TourCmd::Stats => {
            let url = format!("{}/tour-stats", tours_url);
            let body = send(get_request(&client, &url)).await?;
            let stats = body["data"]["stats"].as_array().cloned().unwrap_or_default();
            println!(
                "{}",
                table(
                    &stats,
                    &["_id", "numTours", "numRatings", "avgRating", "avgPrice", "minPrice", "maxPrice"]
                )
            );
            Ok(())
        }

        TourCmd::Plan { year } => {
            let url = format!("{}/monthly-plan/{}", tours_url, year);
            let body = send(get_request(&client, &url)).await?;
            let plan = body["data"]["plan"].as_array().cloned().unwrap_or_default();
            println!("{}", table(&plan, &["month", "numTourStarts", "tours"]));
            Ok(())
        }

        TourCmd::Create { file } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| format!("failed to read {}: {}", file.display(), e))?;
            let tour: Value = serde_json::from_str(&content)
                .map_err(|e| format!("invalid JSON in {}: {}", file.display(), e))?;
            let body = send(post_request(&client, &tours_url, &tour)).await?;
            println!(
                "Tour created: {}",
                body["data"]["tour"]["id"].as_str().unwrap_or("?")
            );
            Ok(())
        }

        TourCmd::Delete { id } => {
            let url = format!("{}/{}", tours_url, id);
            send(client.delete(&url).send()).await?;
            println!("Tour deleted: {}", id);
            Ok(())
        }
    }
}

/// Encode list options as a query string the hub's list endpoint accepts.
fn list_query(
    filters: &[String],
    sort: Option<&str>,
    fields: Option<&str>,
    page: Option<u64>,
    limit: Option<u64>,
) -> Result<String, String> {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for filter in filters {
        let (key, value) = filter
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| format!("filter '{}' is not of the form field=value", filter))?;
        query.append_pair(key, value);
    }
    if let Some(sort) = sort {
        query.append_pair("sort", sort);
    }
    if let Some(fields) = fields {
        query.append_pair("fields", fields);
    }
    if let Some(page) = page {
        query.append_pair("page", &page.to_string());
    }
    if let Some(limit) = limit {
        query.append_pair("limit", &limit.to_string());
    }
    Ok(query.finish())
}

/// Await a request; non-2xx responses become the hub's error message.
async fn send(
    request: impl std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
) -> Result<Value, String> {
    let resp = request.await.map_err(|e| e.to_string())?;
    let status = resp.status();
    if status == reqwest::StatusCode::NO_CONTENT {
        return Ok(Value::Null);
    }

    let body: Value = resp.json().await.map_err(|e| e.to_string())?;
    if status.is_success() {
        Ok(body)
    } else {
        let message = body["message"].as_str().unwrap_or("request failed");
        Err(format!("{} ({})", message, status))
    }
}

fn print_tours(body: &Value, json: bool, fields: Option<&str>) -> Result<(), String> {
    if json {
        return print_json(body);
    }

    let tours = body["data"]["tours"].as_array().cloned().unwrap_or_default();
    let columns: Vec<&str> = match fields {
        Some(fields) => std::iter::once("id")
            .chain(fields.split(',').map(str::trim).filter(|f| !f.is_empty() && *f != "id"))
            .collect(),
        None => DEFAULT_COLUMNS.to_vec(),
    };
    println!("{}", table(&tours, &columns));
    println!("{} tour(s)", body["results"].as_u64().unwrap_or(tours.len() as u64));
    Ok(())
}

fn print_json(value: &Value) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", out);
    Ok(())
}

fn table(rows: &[Value], columns: &[&str]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for row in rows {
        builder.push_record(columns.iter().map(|c| cell(&row[*c])));
    }
    builder.build().with(Style::rounded()).to_string()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

async fn get_request(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, reqwest::Error> {
    client.get(url).send().await
}

async fn post_request(
    client: &reqwest::Client,
    url: &str,
    json: &Value,
) -> Result<reqwest::Response, reqwest::Error> {
    client.post(url).json(json).send().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_query_encodes_filters_and_controls() {
        let query = list_query(
            &["difficulty=easy".to_string(), "price[lt]=1000".to_string()],
            Some("-price,name"),
            Some("name,price"),
            Some(2),
            Some(10),
        )
        .unwrap();

        let params = QueryParameters::parse(&query);
        assert_eq!(params.get_str("difficulty"), Some("easy"));
        assert_eq!(params.get_str("sort"), Some("-price,name"));
        assert_eq!(params.get_str("page"), Some("2"));
        assert!(params.get("price").is_some());
    }

    #[test]
    fn test_list_query_rejects_malformed_filter() {
        assert!(list_query(&["difficulty".to_string()], None, None, None, None).is_err());
        assert!(list_query(&["=easy".to_string()], None, None, None, None).is_err());
        assert_eq!(list_query(&[], None, None, None, None).unwrap(), "");
    }

    #[test]
    fn test_explain_shows_stages() {
        let out = explain("difficulty=easy&price[gte]=500&sort=-price&fields=name&page=3&limit=10")
            .unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            v["filter"],
            json!({ "difficulty": "easy", "price": { "$gte": "500" } })
        );
        assert_eq!(v["plan"]["skip"], 20);
        assert_eq!(v["plan"]["limit"], 10);
    }

    #[test]
    fn test_table_cells() {
        let rows = vec![json!({ "month": 7, "numTourStarts": 2, "tours": ["A", "B"] })];
        let out = table(&rows, &["month", "tours", "missing"]);
        assert!(out.contains("A, B"));
        assert!(out.contains("month"));
        assert!(out.contains('7'));
    }
}
