//! # Petrel Engine
//!
//! Orchestration of the Petrel pipeline: build a request, fetch the
//! response over the wire, tokenize the body, and construct the styled
//! document, invoking the layout collaborator as elements close.

use petrel_dom::{build_document, Document, DomError, Layout};
use petrel_html::tokenize;
use petrel_http::{HttpError, RequestOptions, Response};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub use petrel_common::{init_logging, LogConfig, LogFormat};
pub use petrel_dom::NoLayout;

/// Errors that can occur in the pipeline.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
}

/// Parse an HTML string into a styled document.
pub fn parse_document<L: Layout>(html: &str, layout: &mut L) -> Result<Document, EngineError> {
    let tokens = tokenize(html);
    debug!(tokens = tokens.len(), "tokenized document");
    Ok(build_document(tokens, layout)?)
}

/// Send a request and parse the response body into a styled document.
pub async fn load<L: Layout>(
    options: &RequestOptions,
    layout: &mut L,
) -> Result<Document, EngineError> {
    let response = options.send().await?;
    debug!(
        status = response.status_code,
        body_len = response.body.len(),
        "response received"
    );
    parse_document(&response.body, layout)
}

/// Fetch a URL and parse the response body into a styled document.
pub async fn load_url<L: Layout>(url: &str, layout: &mut L) -> Result<Document, EngineError> {
    let url = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
    let options = RequestOptions::from_url(&url)?;
    load(&options, layout).await
}

/// Fetch without interpreting: send the request and return the raw
/// response.
pub async fn fetch(options: &RequestOptions) -> Result<Response, EngineError> {
    Ok(options.send().await?)
}
