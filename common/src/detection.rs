//! 検出サービスのレスポンス型とパーサー
//!
//! 成功時: `{"column_data": [[{label, box_in_column}, ...], ...]}`
//! 失敗時: `{"error": "..."}`

use crate::error::{Error, Result};
use crate::geometry::CropRect;
use serde::{Deserialize, Deserializer, Serialize};

/// クロップ画像内のバブル位置
///
/// `crop_origin_w/h` は送ったクロップのピクセルサイズで、
/// 表示上の列矩形に対する倍率を求めるのに使う。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BubbleBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub crop_origin_w: f64,
    pub crop_origin_h: f64,
}

impl BubbleBox {
    pub fn rect(&self) -> CropRect {
        CropRect::new(self.x, self.y, self.w, self.h)
    }
}

/// 1行分の候補バブル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// サービスは数値（1始まりのバブル番号）を返すが、文字列も受け付ける
    #[serde(deserialize_with = "deserialize_label")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_in_column: Option<BubbleBox>,
}

impl Candidate {
    pub fn new(label: impl Into<String>, box_in_column: Option<BubbleBox>) -> Self {
        Self {
            label: label.into(),
            box_in_column,
        }
    }
}

/// 1行の候補列（空ならしきい値を超えるマークなし）
pub type RowDetections = Vec<Candidate>;

/// 1列分の検出結果（行順）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnDetections {
    pub rows: Vec<RowDetections>,
}

impl ColumnDetections {
    pub fn new(rows: Vec<RowDetections>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 指定行の先頭候補のラベル
    ///
    /// サービスは信頼度の降順で候補を返す前提。
    pub fn first_label(&self, row: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|candidates| candidates.first())
            .map(|c| c.label.as_str())
    }

    /// 全行のバブル矩形
    pub fn bubbles(&self) -> impl Iterator<Item = &BubbleBox> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|c| c.box_in_column.as_ref())
    }

    /// マークが検出された行数
    pub fn marked_rows(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_empty()).count()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelRepr {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn deserialize_label<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LabelRepr::deserialize(deserializer)? {
        LabelRepr::Text(s) => s,
        LabelRepr::Integer(n) => n.to_string(),
        LabelRepr::Float(f) => f.to_string(),
    })
}

/// レスポンス本体（成功・失敗の両方を受ける）
#[derive(Debug, Default, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    column_data: Option<Vec<RowDetections>>,
    #[serde(default)]
    error: Option<String>,
}

const GENERIC_SERVER_ERROR: &str = "Server error processing column";

/// HTTPステータスと本文から検出結果をパース
///
/// # Arguments
/// * `status` - HTTPステータスコード
/// * `body` - レスポンス本文
///
/// # Returns
/// * `Ok(ColumnDetections)` - 2xxかつ `column_data` あり
/// * `Err(BackendRequestFailed)` - 非2xx、または `error` フィールドあり
/// * `Err(BackendResponseMalformed)` - 2xxだが本文が解釈できない
pub fn parse_analyze_response(status: u16, body: &str) -> Result<ColumnDetections> {
    let success = (200..300).contains(&status);

    if !success {
        let message = match serde_json::from_str::<ResponseEnvelope>(body) {
            Ok(ResponseEnvelope { error: Some(message), .. }) if !message.is_empty() => message,
            Ok(_) => format!("HTTP error! status: {}", status),
            Err(_) => GENERIC_SERVER_ERROR.to_string(),
        };
        return Err(Error::BackendRequestFailed(message));
    }

    let envelope: ResponseEnvelope = serde_json::from_str(body)
        .map_err(|e| Error::BackendResponseMalformed(e.to_string()))?;

    match envelope {
        ResponseEnvelope { column_data: Some(rows), .. } => Ok(ColumnDetections::new(rows)),
        ResponseEnvelope { error: Some(message), .. } => Err(Error::BackendRequestFailed(message)),
        _ => Err(Error::BackendResponseMalformed("missing column_data".into())),
    }
}
