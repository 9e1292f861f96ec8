use log::{debug, warn};
use omr_common::{parse_analyze_response, ColumnDetections, ColumnRequest, Error};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

/// 列解析エンドポイント
pub const PROCESS_COLUMN_PATH: &str = "/process_column";

/// パース前のレスポンス
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// 検出サービスのHTTPクライアント
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> crate::error::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, PROCESS_COLUMN_PATH)
    }

    /// 1列分を送信し、レスポンスをそのまま返す
    ///
    /// 通信自体の失敗のみエラーにする。HTTPステータスは呼び出し側で判定。
    pub async fn post_column(&self, request: &ColumnRequest) -> omr_common::Result<RawResponse> {
        let form = build_form(request)?;
        let url = self.endpoint();
        debug!("POST {} ({} bytes image)", url, request.image.len());

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        debug!("response {} ({} bytes)", status, body.len());
        Ok(RawResponse { status, body })
    }

    /// 1列分を解析する（リトライしない）
    pub async fn analyze_column(&self, request: &ColumnRequest) -> omr_common::Result<ColumnDetections> {
        let raw = self.post_column(request).await?;
        parse_analyze_response(raw.status, &raw.body)
    }
}

fn build_form(request: &ColumnRequest) -> omr_common::Result<Form> {
    let image = Part::bytes(request.image.to_vec())
        .file_name(request.file_name.clone())
        .mime_str(&request.media_type)
        .map_err(|e| Error::BackendRequestFailed(format!("Invalid media type {}: {}", request.media_type, e)))?;

    Ok(Form::new()
        .part("image", image)
        .text("rect_x", request.rect.x.to_string())
        .text("rect_y", request.rect.y.to_string())
        .text("rect_width", request.rect.width.to_string())
        .text("rect_height", request.rect.height.to_string())
        .text("num_rows", request.num_rows.to_string())
        .text("confidence_score", request.confidence_score.to_string()))
}

fn transport_error(e: reqwest::Error) -> Error {
    warn!("detection service unreachable: {}", e);
    let message = if e.is_timeout() {
        "Detection service timed out".to_string()
    } else if e.is_connect() {
        "Could not connect to detection service".to_string()
    } else {
        format!("Network error: {}", e)
    };
    Error::BackendRequestFailed(message)
}
