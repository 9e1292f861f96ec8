//! 解答キーの組み立て
//!
//! 確定済みの列を列順・行順に並べ、通し番号を振る。

use crate::config::Configuration;
use crate::session::ColumnResult;
use serde::Serialize;

/// マークが無い（または行が欠けている）設問のラベル
pub const PLACEHOLDER_LABEL: &str = "-";

/// ファイル名が使えないときの出力名
pub const DEFAULT_EXPORT_NAME: &str = "omr_results.txt";

/// 1設問分の解答
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    /// 1始まりの通し番号
    pub question: usize,
    pub label: String,
}

/// 確定済みの列を解答リストに展開
///
/// 未確定の列や欠けた行は `"-"` で埋めるので、
/// 件数は常に `num_columns * num_rows_per_column` になる。
pub fn assemble(columns: &[Option<ColumnResult>], config: &Configuration) -> Vec<Answer> {
    let rows = config.num_rows_per_column;
    (0..config.num_columns)
        .flat_map(|col| (0..rows).map(move |row| (col, row)))
        .map(|(col, row)| {
            let label = columns
                .get(col)
                .and_then(Option::as_ref)
                .and_then(|c| c.data.first_label(row))
                .unwrap_or(PLACEHOLDER_LABEL);
            Answer {
                question: col * rows + row + 1,
                label: label.to_string(),
            }
        })
        .collect()
}

/// `"<番号>\t<ラベル>\n"` 形式のテキスト
pub fn to_tsv(answers: &[Answer]) -> String {
    answers
        .iter()
        .map(|a| format!("{}\t{}\n", a.question, a.label))
        .collect()
}

/// 入力ファイル名から出力ファイル名を決める
///
/// 最後の拡張子を `.txt` に置き換える。拡張子が無ければ付け足す。
/// 空の名前や先頭のドットしか無い名前（`.png` など）は既定名にする。
pub fn export_file_name(source: &str) -> String {
    match source.rfind('.') {
        Some(dot) if dot > 0 => format!("{}.txt", &source[..dot]),
        None if !source.is_empty() => format!("{}.txt", source),
        _ => DEFAULT_EXPORT_NAME.to_string(),
    }
}

/// 書き出し用の解答キー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerKey {
    pub file_name: String,
    pub answers: Vec<Answer>,
}

impl AnswerKey {
    pub fn new(file_name: impl Into<String>, answers: Vec<Answer>) -> Self {
        Self {
            file_name: file_name.into(),
            answers,
        }
    }

    pub fn to_tsv(&self) -> String {
        to_tsv(&self.answers)
    }

    /// マークが読み取れた設問数
    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| a.label != PLACEHOLDER_LABEL).count()
    }
}
