//! Excel生成（共通ライブラリ）
//!
//! 「Question」「Answer」の2列の解答シートを作る。

use crate::assemble::{Answer, PLACEHOLDER_LABEL};
use crate::error::Result;
use rust_xlsxwriter::*;

const SHEET_NAME: &str = "Answers";
const QUESTION_COL_WIDTH: f64 = 12.0;
const ANSWER_COL_WIDTH: f64 = 14.0;

/// Excelをバッファに生成
///
/// # Arguments
/// * `answers` - 設問順の解答
/// * `title` - 1行目に入れる見出し（元画像のファイル名など）
pub fn answer_sheet_buffer(answers: &[Answer], title: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    let title_format = Format::new().set_bold().set_font_size(12.0);

    let header_format = Format::new()
        .set_bold()
        .set_font_size(10.0)
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA));

    let cell_format = Format::new()
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(0xCCCCCC));

    // 未検出の設問は目立たせる
    let blank_format = cell_format
        .clone()
        .set_font_color(Color::RGB(0x999999))
        .set_background_color(Color::RGB(0xFFF4E5));

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    worksheet.set_column_width(0, QUESTION_COL_WIDTH)?;
    worksheet.set_column_width(1, ANSWER_COL_WIDTH)?;

    worksheet.write_string_with_format(0, 0, title, &title_format)?;
    worksheet.write_string_with_format(2, 0, "Question", &header_format)?;
    worksheet.write_string_with_format(2, 1, "Answer", &header_format)?;

    let first_row: u32 = 3;
    for (offset, answer) in answers.iter().enumerate() {
        let row = first_row + offset as u32;
        let format = if answer.label == PLACEHOLDER_LABEL {
            &blank_format
        } else {
            &cell_format
        };
        worksheet.write_number_with_format(row, 0, answer.question as f64, &cell_format)?;
        worksheet.write_string_with_format(row, 1, &answer.label, format)?;
    }

    worksheet.set_freeze_panes(first_row, 0)?;

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}
