//! 対話式アノテーション（端末版）
//!
//! ポインタが無いので、列の矩形は表示座標 `x,y,w,h` で入力する。
//! `--preview` を指定すると操作ごとにオーバーレイ付きPNGを書き出すので、
//! それを見ながら座標を決める。

use crate::backend::{submit_column, ColumnAnalyzer};
use crate::cli::ExportFormat;
use crate::error::Result;
use crate::export;
use crate::loader;
use crate::raster;
use dialoguer::Input;
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use omr_common::{
    render, ConfirmOutcome, Configuration, DisplayRect, Point, Session, SubmitOutcome, Viewport,
};
use std::path::PathBuf;
use std::time::Duration;

/// 端末から入力されるコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotateCommand {
    /// 表示座標の矩形で列を描く
    Draw(DisplayRect),
    Confirm,
    Configure {
        columns: usize,
        rows: usize,
        confidence: f64,
    },
    Resize { width: f64, height: f64 },
    Export,
    Status,
    Help,
    Quit,
    Unknown(String),
}

/// 入力行をコマンドに変換
pub fn parse_command(input: &str) -> AnnotateCommand {
    let trimmed = input.trim();
    let mut words = trimmed.split_whitespace();
    let head = words.next().unwrap_or("");
    let args: Vec<&str> = words.collect();

    match (head, args.as_slice()) {
        ("c" | "confirm", []) => AnnotateCommand::Confirm,
        ("e" | "export", []) => AnnotateCommand::Export,
        ("s" | "status" | "", []) => AnnotateCommand::Status,
        ("h" | "help" | "?", []) => AnnotateCommand::Help,
        ("q" | "quit", []) => AnnotateCommand::Quit,
        ("set", [columns, rows, confidence]) => {
            match (columns.parse(), rows.parse(), confidence.parse()) {
                (Ok(columns), Ok(rows), Ok(confidence)) => AnnotateCommand::Configure {
                    columns,
                    rows,
                    confidence,
                },
                _ => AnnotateCommand::Unknown(trimmed.to_string()),
            }
        }
        ("viewport", [width, height]) => match (width.parse(), height.parse()) {
            (Ok(width), Ok(height)) => AnnotateCommand::Resize { width, height },
            _ => AnnotateCommand::Unknown(trimmed.to_string()),
        },
        (rect, []) => parse_rect(rect)
            .map(AnnotateCommand::Draw)
            .unwrap_or_else(|| AnnotateCommand::Unknown(trimmed.to_string())),
        _ => AnnotateCommand::Unknown(trimmed.to_string()),
    }
}

/// `x,y,w,h`（幅・高さは負でもよい。ドラッグ方向とみなす）
fn parse_rect(text: &str) -> Option<DisplayRect> {
    let values: Vec<f64> = text
        .split(',')
        .map(|v| v.trim().parse().ok())
        .collect::<Option<_>>()?;
    match values.as_slice() {
        [x, y, w, h] => Some(DisplayRect::new(*x, *y, *w, *h)),
        _ => None,
    }
}

/// コマンド実行後の扱い
#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue,
    Exported(Vec<PathBuf>),
    Quit,
}

pub struct AnnotateOptions {
    pub image: PathBuf,
    pub config: Configuration,
    pub viewport: Viewport,
    pub preview: Option<PathBuf>,
    pub output: PathBuf,
    pub format: ExportFormat,
}

/// 1画像分のセッションと描画用ビットマップ
pub struct Annotator {
    pub session: Session,
    bitmap: Option<DynamicImage>,
    preview: Option<PathBuf>,
    output: PathBuf,
    format: ExportFormat,
    viewport: Viewport,
}

impl Annotator {
    /// 画像を読み込んでセッションを開始
    pub fn open(options: AnnotateOptions) -> Result<Self> {
        let mut session = Session::new(options.config)?;
        let file = loader::load_file(&options.image)?;
        session.load_image(file.source, file.size, &options.viewport)?;

        Ok(Self {
            session,
            bitmap: file.bitmap,
            preview: options.preview,
            output: options.output,
            format: options.format,
            viewport: options.viewport,
        })
    }

    /// コマンドを1つ実行する
    ///
    /// 描き直しで回復できるエラーはステータスに出して続行する。
    pub async fn execute<A: ColumnAnalyzer>(&mut self, analyzer: &A, command: AnnotateCommand) -> Result<Flow> {
        debug!("command: {:?}", command);
        let flow = match command {
            AnnotateCommand::Draw(rect) => {
                self.draw(analyzer, rect).await;
                Flow::Continue
            }
            AnnotateCommand::Confirm => {
                if self.session.confirm() == ConfirmOutcome::NothingPending {
                    println!("  確定する列がありません");
                }
                Flow::Continue
            }
            AnnotateCommand::Configure {
                columns,
                rows,
                confidence,
            } => {
                match Configuration::new(columns, rows, confidence).and_then(|c| self.session.set_config(c)) {
                    Ok(()) => println!("✔ 設定: {}列 × {}行, 信頼度 {}", columns, rows, confidence),
                    Err(e) => println!("✗ {}", e),
                }
                Flow::Continue
            }
            AnnotateCommand::Resize { width, height } => {
                self.viewport = Viewport::new(width, height);
                match self.session.resize(&self.viewport) {
                    Ok(true) => print_display_size(&self.session),
                    Ok(false) => println!("  表示サイズは変わりません"),
                    Err(e) => println!("✗ {}", e),
                }
                Flow::Continue
            }
            AnnotateCommand::Export => match self.session.export() {
                Ok(key) => {
                    let written = export::export_answer_key(&key, &self.format, &self.output)?;
                    let names: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
                    self.session.note_exported(&names.join(", "));
                    Flow::Exported(written)
                }
                Err(_) => Flow::Continue,
            },
            AnnotateCommand::Status => Flow::Continue,
            AnnotateCommand::Help => {
                print_help();
                Flow::Continue
            }
            AnnotateCommand::Quit => Flow::Quit,
            AnnotateCommand::Unknown(text) => {
                println!("  不明なコマンド: {} (h でヘルプ)", text);
                Flow::Continue
            }
        };

        self.write_preview()?;
        Ok(flow)
    }

    /// 矩形をドラッグ操作として流し、検出まで行う
    async fn draw<A: ColumnAnalyzer>(&mut self, analyzer: &A, rect: DisplayRect) {
        self.session.pointer_down(Point::new(rect.x, rect.y));
        self.session
            .pointer_move(Point::new(rect.x + rect.width, rect.y + rect.height));

        let request = match self.session.pointer_up() {
            Ok(Some(request)) => request,
            Ok(None) => {
                println!("  描画できません（全列確定済み、または画像なし）");
                return;
            }
            Err(e) => {
                println!("✗ {}", e);
                return;
            }
        };

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(self.session.status().message.clone());
        spinner.enable_steady_tick(Duration::from_millis(100));

        let outcome = submit_column(&mut self.session, analyzer, request).await;
        spinner.finish_and_clear();

        match outcome {
            SubmitOutcome::Accepted { logical_index } => print_rows(&self.session, logical_index),
            SubmitOutcome::Stale => println!("  古い応答を破棄しました"),
            SubmitOutcome::Failed(_) => {}
        }
    }

    fn write_preview(&self) -> Result<()> {
        if let (Some(path), Some(bitmap)) = (&self.preview, &self.bitmap) {
            raster::save_preview(&render(&self.session), bitmap, path)?;
        }
        Ok(())
    }
}

/// 対話ループ
pub async fn run_interactive_annotate<A: ColumnAnalyzer>(options: AnnotateOptions, analyzer: &A) -> Result<()> {
    let mut annotator = Annotator::open(options)?;

    print_display_size(&annotator.session);
    if let Some(path) = &annotator.preview {
        println!("  プレビュー: {}", path.display());
    }
    print_help();
    annotator.write_preview()?;

    loop {
        println!("\n[{}] {}", annotator.session.column_counter(), annotator.session.status());

        let input: String = Input::new()
            .with_prompt(prompt_for(&annotator.session))
            .allow_empty(true)
            .interact_text()?;

        match annotator.execute(analyzer, parse_command(&input)).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exported(_)) => {
                println!("\n✅ {}", annotator.session.status());
                break;
            }
            Ok(Flow::Quit) => {
                println!("保存せずに終了します");
                break;
            }
            Err(e) if e.is_recoverable() => {
                warn!("command failed: {}", e);
                println!("✗ {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn prompt_for(session: &Session) -> String {
    let controls = session.controls();
    let mut actions = vec!["x,y,w,h:描画"];
    if controls.confirm_enabled {
        actions.push("c:確定");
    }
    if controls.config_enabled {
        actions.push("set 列 行 信頼度");
    }
    if controls.export_enabled {
        actions = vec!["e:出力"];
    }
    actions.push("q:終了");
    actions.join(" ")
}

fn print_display_size(session: &Session) {
    if let Some(display) = session.display() {
        println!(
            "  表示サイズ: {}x{} (元画像 {}x{})",
            display.display_width, display.display_height, display.original.width, display.original.height
        );
    }
}

fn print_rows(session: &Session, logical_index: usize) {
    let Some(pending) = session.pending() else {
        return;
    };
    let rows = session.config().num_rows_per_column;
    let first = logical_index * rows + 1;
    let labels: Vec<String> = (0..rows)
        .map(|row| format!("{}:{}", first + row, pending.data.first_label(row).unwrap_or("-")))
        .collect();
    println!("  {}", labels.join("  "));
}

fn print_help() {
    println!("---");
    println!("操作:");
    println!("  x,y,w,h          表示座標で列を描く（例: 40,120,90,600）");
    println!("  c                保留中の列を確定");
    println!("  set 列 行 信頼度  設定を変更（最初の列を描く前のみ）");
    println!("  viewport 幅 高さ  表示サイズを再計算");
    println!("  e                解答キーを出力（全列確定後）");
    println!("  s / h / q        ステータス / ヘルプ / 終了");
    println!("---");
}
