//! Local edge emulator with a couple of in-process render functions.
//!
//! Run with `cargo run --example local_edge`, then:
//!
//! ```text
//! curl -i http://127.0.0.1:3000/
//! curl -i --compressed http://127.0.0.1:3000/post/42
//! curl -i -X POST -d '{"name":"edge"}' http://127.0.0.1:3000/api/hello
//! ```

use nextfront::manifest::{build_manifests, SourceFile};
use nextfront::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[render_function(source = "pages/index.js")]
async fn index_page(
    _req: EdgeRequest,
    mut res: EdgeResponse,
    ctx: &RenderContext,
) -> Result<(), RenderError> {
    let region = ctx.get_env("REGION").map(String::as_str).unwrap_or("local");
    res.set_header("cache-control", "no-cache");
    res.set_platform_header("content-type", "text/html; charset=utf-8");
    res.end_with(format!("<h1>Hello from {region}</h1>"));
    Ok(())
}

#[render_function(source = "pages/post/[id].js")]
async fn post_page(
    req: EdgeRequest,
    mut res: EdgeResponse,
    _ctx: &RenderContext,
) -> Result<(), RenderError> {
    let id = req.path().rsplit('/').next().unwrap_or_default().to_string();
    res.set_header("x-post-id", id.as_str());
    res.write(format!("<h1>Post {id}</h1>"));

    // Finishing from another task is allowed.
    tokio::spawn(async move {
        res.write("<p>rendered later</p>");
        res.end();
    });
    Ok(())
}

#[render_function(source = "pages/api/hello.js")]
async fn hello_api(
    req: EdgeRequest,
    mut res: EdgeResponse,
    _ctx: &RenderContext,
) -> Result<(), RenderError> {
    let body: serde_json::Value = if req.body_bytes().is_empty() {
        serde_json::json!({})
    } else {
        req.json()?
    };
    let name = body["name"].as_str().unwrap_or("world");

    let payload = serde_json::json!({ "message": format!("Hello, {name}!") });
    res.write_head(200, [("cache-control", "no-store")]);
    res.end_with(serde_json::to_vec(&payload)?);
    Ok(())
}

#[render_function(source = "pages/_error.js")]
async fn error_page(
    _req: EdgeRequest,
    mut res: EdgeResponse,
    _ctx: &RenderContext,
) -> Result<(), RenderError> {
    res.set_status_code(404);
    res.end_with("Not Found");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let pages: BTreeMap<String, SourceFile> = [
        ("/", "pages/index.js"),
        ("/about", "pages/about.html"),
        ("/post/[id]", "pages/post/[id].js"),
        ("/api/hello", "pages/api/hello.js"),
    ]
    .into_iter()
    .map(|(route, file)| (route.to_string(), SourceFile::new(file)))
    .collect();
    let manifests = build_manifests(&pages, Path::new("public"))?;

    let registry = Arc::new(FunctionRegistry::new());
    registry.register(Box::new(IndexPage::new())).await?;
    registry.register(Box::new(PostPage::new())).await?;
    registry.register(Box::new(HelloApi::new())).await?;
    registry.register(Box::new(ErrorPage::new())).await?;

    let handler_config = HandlerConfig::new().export_process_env(false);
    let page_handler = PageHandler::new(
        manifests.pages,
        manifests.prerender,
        registry.clone(),
        handler_config.clone(),
    )?;
    let api_handler = ApiHandler::new(manifests.apis, registry, handler_config)?;

    let config = EmulatorConfig::new().custom_header("x-env-region", "eu-west-1");
    tracing::info!("Try: curl -i http://{}/post/42", config.bind_addr());

    EdgeEmulator::with_apis(config, page_handler, api_handler)
        .run()
        .await
}
