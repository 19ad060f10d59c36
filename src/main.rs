//! nextfront command line: builds edge manifests and inspects routing.

use clap::{Parser, Subcommand};
use nextfront::manifest::{ApiManifest, RouteManifest};
use nextfront::prelude::*;
use nextfront::routing::DEFAULT_ERROR_PAGE;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nextfront", version, about = "Serverless Next.js for CloudFront Lambda@Edge")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify the upstream build and write the function manifests.
    Build {
        #[arg(long, default_value = ".next")]
        next_dir: PathBuf,
        #[arg(long, default_value = "public")]
        public_dir: PathBuf,
        #[arg(long, default_value = ".aws-next")]
        out: PathBuf,
    },
    /// Print the source file a request path resolves to.
    Resolve {
        /// A manifest.json written by `build`.
        manifest: PathBuf,
        path: String,
        /// Treat the manifest as the API function's.
        #[arg(long)]
        api: bool,
        #[arg(long, default_value = DEFAULT_ERROR_PAGE)]
        error_page: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Build {
            next_dir,
            public_dir,
            out,
        } => {
            let config = BuildConfig::new()
                .next_dir(next_dir)
                .public_dir(public_dir)
                .out_dir(out);
            let builder = ManifestBuilder::new(config);
            let manifests = builder.run().await?;

            tracing::info!(
                "Build complete: {} page routes, {} api routes",
                manifests.pages.pages.ssr.len() + manifests.pages.pages.html.len(),
                manifests.apis.apis.len()
            );
        }
        Command::Resolve {
            manifest,
            path,
            api,
            error_page,
        } => {
            let raw = tokio::fs::read(&manifest)
                .await
                .map_err(|_| EdgeError::missing(&manifest))?;

            let router = if api {
                let manifest: ApiManifest = serde_json::from_slice(&raw)?;
                Router::for_apis(&manifest, error_page)?
            } else {
                let manifest: RouteManifest = serde_json::from_slice(&raw)?;
                Router::for_pages(&manifest, error_page)?
            };

            println!("{}", router.resolve(&path));
        }
    }

    Ok(())
}
