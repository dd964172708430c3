//! Command-line interface for routeql.
//!
//! # Usage
//!
//! ```bash
//! # Validate schema files
//! routeql check schema.graphql
//!
//! # Serve a schema with the GraphQL endpoint and GraphiQL
//! routeql serve --schema schema.graphql --port 4000
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use routeql_router::{Route, RouteError, RouteRequest, RouteResponse, Router, ServeConfig};
use routeql_runtime::{build_executable_schema, BuildOptions, ResolverMap, SchemaDocument};
use routeql_server::{GraphqlOptions, GraphqlServer, PubSub};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "routeql")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve a schema over HTTP
    Serve {
        /// Schema file path
        #[arg(short, long, default_value = "schema.graphql")]
        schema: PathBuf,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Path of the GraphQL endpoint
        #[arg(long, default_value = "/graphql")]
        graphql_path: String,

        /// Path of the GraphiQL page
        #[arg(long, default_value = "/graphiql")]
        graphiql_path: String,

        /// Disable the GraphiQL page
        #[arg(long)]
        no_graphiql: bool,

        /// Record request and field spans
        #[arg(long)]
        tracing: bool,
    },

    /// Check schema files for errors
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Commands {
    /// Options for the GraphQL endpoint of `serve`.
    pub fn graphql_options(&self, sdl: String) -> Option<GraphqlOptions> {
        let Self::Serve {
            graphql_path,
            graphiql_path,
            no_graphiql,
            tracing,
            ..
        } = self
        else {
            return None;
        };
        let mut options = GraphqlOptions::new()
            .graphql_path(graphql_path.clone())
            .graphiql_path((!no_graphiql).then(|| graphiql_path.clone()))
            .tracing(*tracing);
        if SchemaDocument::parse(&sdl).is_ok_and(|doc| doc.subscription_type.is_some()) {
            options = options.pubsub(PubSub::new());
        }
        Some(options.schema(sdl))
    }
}

pub async fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    match &cli.command {
        Commands::Check { files } => check_files(files, cli.verbose, cli.quiet),
        Commands::Serve {
            schema, host, port, ..
        } => {
            let sdl = std::fs::read_to_string(schema)?;
            let Some(options) = cli.command.graphql_options(sdl) else {
                return Ok(1);
            };
            let router = build_router(options)?;
            if !cli.quiet {
                println!(
                    "{} http://{host}:{port}",
                    "Listening on".green().bold()
                );
            }
            info!(schema = %schema.display(), "serving schema");
            routeql_router::serve(router, &ServeConfig::default().host(host.clone()).port(*port))
                .await?;
            Ok(0)
        }
    }
}

/// Builds the started router for `serve`: the GraphQL endpoint plus `/health`.
pub fn build_router(
    options: GraphqlOptions,
) -> Result<std::sync::Arc<Router>, Box<dyn std::error::Error>> {
    let server = GraphqlServer::new(options)?;
    let mut router = Router::new();
    router.route(Route::get("/health", |_: RouteRequest| async {
        Ok::<_, RouteError>(RouteResponse::ok(json!({ "status": "ok" })))
    }));
    server.mount_root(&mut router);
    Ok(router.start()?)
}

fn check_files(
    files: &[PathBuf],
    verbose: bool,
    quiet: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    let mut has_errors = false;

    for file in files {
        if verbose {
            println!("{} {}", "Checking".blue(), file.display());
        }

        match check_file(file) {
            Ok(report) => {
                if verbose {
                    println!(
                        "{} {} ({} types, {} decorated)",
                        "OK".green(),
                        file.display(),
                        report.types,
                        report.decorated.len()
                    );
                    for target in &report.decorated {
                        println!("  {} {}", "@".dimmed(), target);
                    }
                }
            }
            Err(e) => {
                has_errors = true;
                eprintln!("{} {}", "Error".red().bold(), file.display());
                eprintln!("  {} {}", "-->".blue(), e);
            }
        }
    }

    if has_errors {
        Ok(1)
    } else {
        if !quiet {
            println!(
                "{} {} file(s) checked",
                "Success:".green().bold(),
                files.len()
            );
        }
        Ok(0)
    }
}

/// Result of checking one schema file.
#[derive(Debug)]
pub struct CheckReport {
    pub types: usize,
    pub decorated: Vec<String>,
}

/// Parses a schema file, resolves its scalar directives and builds it with
/// no resolvers.
pub fn check_file(path: &Path) -> Result<CheckReport, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    check_source(&source)
}

pub fn check_source(source: &str) -> Result<CheckReport, Box<dyn std::error::Error>> {
    let document = SchemaDocument::parse(source)?;
    let types = document.types.len();
    let schema = build_executable_schema(document, ResolverMap::new(), &BuildOptions::default())?;
    let mut decorated: Vec<String> = schema
        .decorations()
        .iter()
        .map(|(target, scalar)| format!("{target} {}", scalar.names().join(" ")))
        .collect();
    decorated.sort();
    Ok(CheckReport { types, decorated })
}
