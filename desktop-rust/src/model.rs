use std::path::PathBuf;

use omr_common::{ColumnDetections, ColumnRequest, RequestTicket};

/// ワーカースレッドで実行する1列分の検出
#[derive(Debug, Clone)]
pub struct AnalyzeJob {
    pub ticket: RequestTicket,
    pub image_path: PathBuf,
    pub rect: [f64; 4],
    pub num_rows: usize,
    pub confidence_score: f64,
}

impl AnalyzeJob {
    pub fn new(request: &ColumnRequest, image_path: PathBuf) -> Self {
        Self {
            ticket: request.ticket,
            image_path,
            rect: [request.rect.x, request.rect.y, request.rect.width, request.rect.height],
            num_rows: request.num_rows,
            confidence_score: request.confidence_score,
        }
    }

    /// `--rect` に渡す文字列
    pub fn rect_arg(&self) -> String {
        let [x, y, w, h] = self.rect;
        format!("{x},{y},{w},{h}")
    }
}

pub enum UiMessage {
    AnalyzeDone {
        ticket: RequestTicket,
        result: omr_common::Result<ColumnDetections>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Txt,
    Excel,
}

/// 読み込んだ画像のピクセル（テクスチャ化する前）
pub struct SheetPixels {
    pub size: [usize; 2],
    pub rgba: Vec<u8>,
}
