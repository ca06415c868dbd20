use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::{http::RequestDescriptor, runtime::Runtime};

use super::config::ConfigOptions;
use super::{connect, failure};

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: String,
    pub path: String,
    /// JSON body.
    pub data: Option<String>,
    /// `Name: value` pairs.
    pub headers: Vec<String>,
    pub no_refresh: bool,
}

/// Send an arbitrary authenticated request and print the response body.
/// Ctrl-C aborts the call.
#[tracing::instrument(skip(runtime, options))]
pub async fn request<R: Runtime + 'static>(
    runtime: R,
    options: ConfigOptions,
    request: RequestOptions,
) -> Result<()> {
    let desc = build_descriptor(&request)?;
    let (_, services) = connect(runtime, options)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling request");
            on_interrupt.cancel();
        }
    });

    let result = services.client.request_with_cancel(&desc, &cancel).await;
    watcher.abort();

    let response = result.map_err(|e| failure(e, "Request failed"))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read response body")?;

    eprintln!("{}", status);
    println!("{}", render_body(&body));
    Ok(())
}

fn build_descriptor(request: &RequestOptions) -> Result<RequestDescriptor> {
    let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", request.method))?;

    let mut desc = RequestDescriptor::new(method, request.path.as_str());

    if let Some(data) = &request.data {
        let body: serde_json::Value =
            serde_json::from_str(data).context("Request body is not valid JSON")?;
        desc = desc.json(&body)?;
    }

    for header in &request.headers {
        let Some((name, value)) = header.split_once(':') else {
            bail!("Invalid header '{}', expected 'Name: value'", header);
        };
        desc = desc.header(name.trim(), value.trim());
    }

    if request.no_refresh {
        desc = desc.without_refresh();
    }
    Ok(desc)
}

/// Pretty-prints JSON bodies and passes anything else through.
fn render_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}
