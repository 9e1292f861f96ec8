//! 検出サービス連携
//!
//! - `client`: HTTPクライアント（multipart POST）
//! - [`ColumnAnalyzer`]: ワークフローから見た検出の窓口（テストでは差し替える）
//! - [`submit_column`]: 送信 → 結果の反映までを1回分まとめて行う

mod client;

pub use client::{BackendClient, RawResponse, PROCESS_COLUMN_PATH};

use log::debug;
use omr_common::{ColumnDetections, ColumnRequest, Session, SubmitOutcome};

/// 1列分の検出を行うもの
#[allow(async_fn_in_trait)]
pub trait ColumnAnalyzer {
    async fn analyze_column(&self, request: &ColumnRequest) -> omr_common::Result<ColumnDetections>;
}

impl ColumnAnalyzer for BackendClient {
    async fn analyze_column(&self, request: &ColumnRequest) -> omr_common::Result<ColumnDetections> {
        BackendClient::analyze_column(self, request).await
    }
}

/// 検出を実行し、結果をセッションに反映する
///
/// 待っている間にチケットが無効になっていれば `Stale` が返る。
pub async fn submit_column<A: ColumnAnalyzer>(
    session: &mut Session,
    analyzer: &A,
    request: ColumnRequest,
) -> SubmitOutcome {
    debug!("submitting request #{} to analyzer", request.ticket.id());
    let result = analyzer.analyze_column(&request).await;
    session.complete_submit(request.ticket, result)
}
