use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use speisekarte::{
    Config, InMemoryStore, MenuItem, MenuPipeline, PdfDocument, PageSource, format_date,
    parse_date_param, update_all,
};

#[derive(Parser, Debug)]
#[command(name = "speisekarte")]
#[command(version, about = "Extracts dishes and prices from canteen menu PDFs", long_about = None)]
struct Cli {
    /// Restaurant configuration file
    #[arg(short, long, global = true, default_value = "restaurants.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse every configured menu and serve the results over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:3000")]
        bind: String,

        /// Parse the local documents without downloading fresh copies
        #[arg(long)]
        offline: bool,
    },

    /// Run one restaurant's pipeline and print the records as JSON
    Parse {
        /// Restaurant name as configured
        restaurant: String,

        /// Parse this PDF instead of the configured document
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Date to parse as (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Print the text and positioned fragments of a PDF
    Dump {
        /// Input PDF file path
        input: PathBuf,

        /// Only print fragments of this zero-based page
        #[arg(short, long)]
        page: Option<usize>,
    },
}

struct AppState {
    config: Config,
    store: InMemoryStore,
    download: bool,
}

type SharedState = Arc<AppState>;

#[derive(Deserialize)]
struct MenuQuery {
    date: Option<String>,
    restaurant: Option<String>,
}

#[derive(Serialize)]
struct MenuResponse {
    date: String,
    restaurant: Option<String>,
    items: Vec<MenuItem>,
}

#[derive(Serialize)]
struct UpdateResponse {
    items: usize,
}

async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Speisekarte menu API",
        "endpoints": ["/restaurants", "/menu?date=YYYY-MM-DD&restaurant=NAME", "/update"],
    }))
}

async fn get_restaurants(Extension(state): Extension<SharedState>) -> impl IntoResponse {
    match state.store.restaurants() {
        Ok(restaurants) => Json(restaurants).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn get_menu(
    Extension(state): Extension<SharedState>,
    Query(params): Query<MenuQuery>,
) -> impl IntoResponse {
    let date = match params.date.as_deref() {
        None => today(),
        Some(raw) => match parse_date_param(raw) {
            Some(date) => date,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    "Invalid date format. Use YYYY-MM-DD or YYYY/MM/DD.",
                )
                    .into_response();
            }
        },
    };

    let items = match state.store.menu_for(date, params.restaurant.as_deref()) {
        Ok(items) => items,
        Err(err) => return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    };

    if items.is_empty() {
        let scope = params.restaurant.as_deref().unwrap_or("any restaurant");
        return (
            StatusCode::NOT_FOUND,
            format!("No menu found for {} at {scope}", format_date(date)),
        )
            .into_response();
    }

    Json(MenuResponse {
        date: format_date(date),
        restaurant: params.restaurant,
        items,
    })
    .into_response()
}

async fn post_update(Extension(state): Extension<SharedState>) -> impl IntoResponse {
    let job = Arc::clone(&state);
    match tokio::task::spawn_blocking(move || refresh(&job)).await {
        Ok(Ok(items)) => Json(UpdateResponse { items }).into_response(),
        Ok(Err(err)) => (StatusCode::BAD_GATEWAY, format!("Update failed: {err}")).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn build_client() -> anyhow::Result<Client> {
    let client = Client::builder()
        // Avoid macOS system proxy lookup that can panic in sandboxed contexts.
        .no_proxy()
        .user_agent("speisekarte/0.1")
        .build()?;
    Ok(client)
}

fn download_document(client: &Client, url: &str, path: &Path) -> anyhow::Result<()> {
    let bytes = client.get(url).send()?.error_for_status()?.bytes()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Downloaded {url} ({} bytes)", bytes.len());
    Ok(())
}

/// Downloads fresh documents where configured, then re-parses everything.
fn refresh(state: &AppState) -> anyhow::Result<usize> {
    if state.download {
        let client = build_client()?;
        for restaurant in &state.config.restaurants {
            let Some(url) = &restaurant.source_url else {
                continue;
            };
            if let Err(err) = download_document(&client, url, &restaurant.document) {
                log::warn!(
                    "Download for {} failed, parsing the previous copy: {err:#}",
                    restaurant.name
                );
            }
        }
    }

    Ok(update_all(&state.config, &state.store, today()))
}

async fn serve(config: Config, bind: &str, offline: bool) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        config,
        store: InMemoryStore::new(),
        download: !offline,
    });

    // Run blocking network/PDF work on a dedicated blocking thread to avoid
    // dropping a nested Tokio runtime inside async context.
    let job = Arc::clone(&state);
    let items = tokio::task::spawn_blocking(move || refresh(&job)).await??;
    println!("Parsed {items} menu items");

    let app = Router::new()
        .route("/", get(index))
        .route("/restaurants", get(get_restaurants))
        .route("/menu", get(get_menu))
        .route("/update", post(post_update))
        .layer(Extension(state))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    println!("Listening on http://{bind}");
    axum::serve(listener, app).await?;

    Ok(())
}

fn parse(
    config: &Config,
    restaurant: &str,
    document: Option<PathBuf>,
    date: Option<&str>,
) -> anyhow::Result<()> {
    let mut restaurant = config
        .restaurant(restaurant)
        .with_context(|| format!("no restaurant named `{restaurant}` in the config"))?
        .clone();
    if let Some(document) = document {
        restaurant.document = document;
    }
    let today = match date {
        Some(raw) => parse_date_param(raw).with_context(|| format!("invalid date `{raw}`"))?,
        None => today(),
    };

    let pipeline = MenuPipeline::new(&restaurant)?;
    let pdf = PdfDocument::open(&restaurant.document)?;
    let items = pipeline.run(&pdf, &InMemoryStore::new(), today)?;

    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

fn dump(input: &Path, only_page: Option<usize>) -> anyhow::Result<()> {
    let pdf = PdfDocument::open(input)?;

    println!("{} ({} pages)", pdf.path().display(), pdf.page_count());
    println!("=== FULL PDF TEXT ===");
    for (i, line) in pdf.full_text()?.lines().enumerate() {
        if !line.trim().is_empty() {
            println!("{i}: {line:?}");
        }
    }

    for page in pdf.pages()? {
        if only_page.is_some_and(|index| index != page.index) {
            continue;
        }
        println!(
            "\n=== PAGE {} ({:.1} x {:.1}) ===",
            page.index, page.width, page.height
        );
        for fragment in &page.fragments {
            let b = fragment.bbox;
            println!(
                "[{:7.1} {:7.1} {:7.1} {:7.1}] {:?}",
                b.x0, b.y0, b.x1, b.y1, fragment.text
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, offline } => {
            let config = Config::load(&cli.config)?;
            serve(config, &bind, offline).await
        }
        Commands::Parse {
            restaurant,
            document,
            date,
        } => {
            let config = Config::load(&cli.config)?;
            tokio::task::spawn_blocking(move || {
                parse(&config, &restaurant, document, date.as_deref())
            })
            .await?
        }
        Commands::Dump { input, page } => {
            tokio::task::spawn_blocking(move || dump(&input, page)).await?
        }
    }
}
