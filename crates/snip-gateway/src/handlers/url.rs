use crate::error::Result;
use crate::extract::ClientIp;
use crate::model::{EncodeRequest, EncodeResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_core::{ResolveParams, ShortenParams};
use tracing::info;

pub async fn encode_handler(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(request): Json<EncodeRequest>,
) -> Result<Json<EncodeResponse>> {
    let mut params = ShortenParams::new(request.url).with_client_ip(client_ip);
    if let Some(alias) = request.alias {
        params = params.with_alias(alias);
    }

    let shortened = state.shortener().shorten(params).await?;
    info!(
        code = %shortened.code,
        created = shortened.created,
        "url shortened"
    );

    Ok(Json(EncodeResponse {
        short_url: shortened.short_url,
    }))
}

/// Answers with `302 Found` pointing at the original URL.
pub async fn redirect_handler(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Path(alias): Path<String>,
) -> Result<Response> {
    let record = state
        .shortener()
        .resolve(ResolveParams::new(alias).with_client_ip(client_ip))
        .await?;

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, record.original_url)],
    )
        .into_response())
}
