//! 列ごとの注釈ワークフロー
//!
//! 1列のライフサイクル:
//!
//! ```text
//! NotStarted → Drawn → Submitting → Reviewing → Confirmed
//!                ↑         │            │
//!                └─────────┴────────────┘  (失敗 / 再描画)
//! ```
//!
//! セッション状態は [`Session`] が一元管理し、名前付きの遷移
//! （`load_image` / `set_config` / `resize` / `pointer_*` /
//! `begin_submit` / `complete_submit` / `confirm`）でのみ更新する。
//!
//! 検出呼び出しは非同期なので `begin_submit` と `complete_submit` に分かれる。
//! 各リクエストにはチケットを付け、再描画や新規読み込みでチケットが
//! 無効になった後に届いたレスポンスは捨てる。
//!
//! 矩形は正規化座標（元画像に対する `[0,1]`）で保持し、
//! 描画時に表示座標、送信時に元画像座標へ変換する。
//! そのためリサイズ後も注釈がずれない。

use crate::assemble::{self, AnswerKey};
use crate::config::Configuration;
use crate::detection::ColumnDetections;
use crate::error::{Error, Result};
use crate::geometry::{DisplayRect, ImageRect, ImageSize, NormalizedRect, Point};
use crate::mapper;
use crate::scaler::{fit_to_viewport, DisplayImage, Viewport};
use crate::selection::{PointerOutcome, SelectionController, MIN_SELECTION_SIZE};
use crate::status::{Controls, Status, CONFIRM_LAST_LABEL, CONFIRM_NEXT_LABEL};
use log::{debug, info, warn};
use std::sync::Arc;

/// 読み込んだファイル
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    /// 例: "image/png"
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub file: SourceFile,
    pub display: DisplayImage,
}

/// 検出済みの1列
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnResult {
    pub rect: NormalizedRect,
    pub data: ColumnDetections,
    pub logical_index: usize,
}

impl ColumnResult {
    pub fn display_rect(&self, display: &DisplayImage) -> DisplayRect {
        mapper::normalized_to_display(self.rect, display)
    }
}

/// 送信中リクエストの識別子
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestTicket {
    id: u64,
    logical_index: usize,
    rect: NormalizedRect,
}

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn logical_index(&self) -> usize {
        self.logical_index
    }
}

/// 検出サービスへ送る内容
#[derive(Debug, Clone)]
pub struct ColumnRequest {
    pub ticket: RequestTicket,
    pub file_name: String,
    pub media_type: String,
    pub image: Arc<[u8]>,
    /// 元画像ピクセル座標
    pub rect: ImageRect,
    pub num_rows: usize,
    pub confidence_score: f64,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// 保留中の結果として保持した
    Accepted { logical_index: usize },
    /// チケットが無効になっていたので捨てた
    Stale,
    /// 失敗。列は Drawn に戻る
    Failed(Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    NothingPending,
    Committed { logical_index: usize, complete: bool },
}

#[derive(Debug, Clone)]
pub struct Session {
    config: Configuration,
    image: Option<LoadedImage>,
    columns: Vec<Option<ColumnResult>>,
    current: usize,
    pending: Option<ColumnResult>,
    selection: SelectionController,
    in_flight: Option<RequestTicket>,
    next_request_id: u64,
    status: Status,
    export_name: String,
}

impl Session {
    pub fn new(config: Configuration) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            image: None,
            columns: vec![None; config.num_columns],
            current: 0,
            pending: None,
            selection: SelectionController::new(),
            in_flight: None,
            next_request_id: 1,
            status: Status::default(),
            export_name: assemble::DEFAULT_EXPORT_NAME.to_string(),
        })
    }

    // ---------------------------------------------------------------
    // 参照
    // ---------------------------------------------------------------

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn display(&self) -> Option<&DisplayImage> {
        self.image.as_ref().map(|i| &i.display)
    }

    pub fn columns(&self) -> &[Option<ColumnResult>] {
        &self.columns
    }

    pub fn current_column(&self) -> usize {
        self.current
    }

    pub fn pending(&self) -> Option<&ColumnResult> {
        self.pending.as_ref()
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn in_flight(&self) -> Option<RequestTicket> {
        self.in_flight
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn export_name(&self) -> &str {
        &self.export_name
    }

    pub fn is_complete(&self) -> bool {
        self.image.is_some() && self.current >= self.config.num_columns
    }

    /// 最初の列に手を付けた時点で設定はロックされる
    pub fn config_locked(&self) -> bool {
        self.image.is_some()
            && (self.current > 0
                || self.pending.is_some()
                || self.in_flight.is_some()
                || self.selection.is_drawing())
    }

    /// 確定済みの列が `[0, current)` に連続して並んでいるか
    pub fn invariants_hold(&self) -> bool {
        let prefix = self
            .columns
            .iter()
            .enumerate()
            .all(|(i, c)| c.is_some() == (i < self.current));
        let pending = self
            .pending
            .as_ref()
            .map_or(true, |p| p.logical_index == self.current);
        prefix && pending && self.current <= self.config.num_columns
    }

    // ---------------------------------------------------------------
    // 遷移
    // ---------------------------------------------------------------

    /// 画像を読み込み、セッションを初期化する
    ///
    /// 画像以外のファイルは拒否し、セッション状態は変更しない。
    pub fn load_image(&mut self, file: SourceFile, natural: ImageSize, viewport: &Viewport) -> Result<()> {
        if !file.is_image() {
            warn!("rejected non-image upload {} ({})", file.name, file.media_type);
            self.status = Status::error("Invalid file type. Please upload an image.");
            return Err(Error::InvalidFileType(format!("{} ({})", file.name, file.media_type)));
        }

        let display = fit_to_viewport(natural, viewport)?;
        info!(
            "loaded {} ({}x{}) displayed at {}x{}",
            file.name, natural.width, natural.height, display.display_width, display.display_height
        );

        self.export_name = assemble::export_file_name(&file.name);
        self.image = Some(LoadedImage { file, display });
        self.reset_columns();
        self.status = Status::info("2. Set configuration if needed. Then, draw Column 1.");
        Ok(())
    }

    /// 設定を差し替える（ロック中は不可）
    pub fn set_config(&mut self, config: Configuration) -> Result<()> {
        if self.config_locked() {
            return Err(Error::ConfigLocked);
        }
        config.validate()?;
        self.config = config;
        self.reset_columns();
        debug!("configuration set to {:?}", config);
        Ok(())
    }

    /// ビューポート変更に合わせて表示サイズを再計算する
    ///
    /// 描画中は無視する。表示サイズが変わった場合に `true`。
    pub fn resize(&mut self, viewport: &Viewport) -> Result<bool> {
        if self.selection.is_drawing() {
            debug!("resize ignored while drawing");
            return Ok(false);
        }
        let Some(image) = self.image.as_mut() else {
            return Ok(false);
        };

        let display = fit_to_viewport(image.display.original, viewport)?;
        if display == image.display {
            return Ok(false);
        }
        debug!(
            "display resized {}x{} -> {}x{}",
            image.display.display_width, image.display.display_height, display.display_width, display.display_height
        );
        image.display = display;
        Ok(true)
    }

    /// 描画開始。保留中の結果と送信中のリクエストは破棄する
    pub fn pointer_down(&mut self, at: Point) -> PointerOutcome {
        let can_start = self.image.is_some() && self.current < self.config.num_columns;
        let outcome = self.selection.pointer_down(at, can_start);

        if outcome == PointerOutcome::Started {
            if self.pending.take().is_some() {
                self.status = Status::info(format!(
                    "Previous drawing for Column {} cleared. Redraw it.",
                    self.current + 1
                ));
            }
            if let Some(ticket) = self.in_flight.take() {
                debug!("request #{} invalidated by redraw", ticket.id);
            }
        }
        outcome
    }

    pub fn pointer_move(&mut self, at: Point) -> PointerOutcome {
        self.selection.pointer_move(at)
    }

    /// 描画終了。十分な大きさなら送信内容を返す
    pub fn pointer_up(&mut self) -> Result<Option<ColumnRequest>> {
        match self.selection.pointer_up() {
            PointerOutcome::Completed(rect) => self.begin_submit(rect).map(Some),
            PointerOutcome::TooSmall(rect) => Err(self.too_small(rect.width, rect.height)),
            _ => Ok(None),
        }
    }

    /// 表示座標の矩形から送信内容を作り、チケットを発行する
    ///
    /// 以前の保留結果と送信中チケットはここで無効になる。
    pub fn begin_submit(&mut self, rect: DisplayRect) -> Result<ColumnRequest> {
        let rect = rect.normalized();
        if rect.width < MIN_SELECTION_SIZE || rect.height < MIN_SELECTION_SIZE {
            return Err(self.too_small(rect.width, rect.height));
        }
        self.issue_request(rect)
    }

    /// 元画像座標の矩形から送信内容を作る（座標を直接指定する場合）
    ///
    /// 表示サイズは呼び出し側ごとに違うので、最小サイズは確認せず
    /// 幅・高さが正であることだけを求める。
    pub fn begin_submit_original(&mut self, rect: ImageRect) -> Result<ColumnRequest> {
        let rect = rect.normalized();
        if !(rect.width > 0.0 && rect.height > 0.0) {
            return Err(self.too_small(rect.width, rect.height));
        }
        let Some(display) = self.display().copied() else {
            self.status = Status::error("Error: No image file is currently loaded for processing.");
            return Err(Error::NoFileLoaded);
        };
        self.issue_request(mapper::image_to_display(rect, display.scale()))
    }

    fn issue_request(&mut self, rect: DisplayRect) -> Result<ColumnRequest> {
        self.pending = None;
        if self.image.is_some() && self.current >= self.config.num_columns {
            return Err(Error::AllColumnsConfirmed);
        }
        let id = self.next_request_id;
        let Some(image) = self.image.as_ref() else {
            self.status = Status::error("Error: No image file is currently loaded for processing.");
            return Err(Error::NoFileLoaded);
        };
        let ticket = RequestTicket {
            id,
            logical_index: self.current,
            rect: mapper::display_to_normalized(rect, &image.display),
        };
        let request = ColumnRequest {
            ticket,
            file_name: image.file.name.clone(),
            media_type: image.file.media_type.clone(),
            image: Arc::clone(&image.file.bytes),
            rect: mapper::display_to_image(rect, image.display.scale()),
            num_rows: self.config.num_rows_per_column,
            confidence_score: self.config.min_confidence_score,
        };

        debug!(
            "request #{} for column {}: rect=({:.1},{:.1},{:.1},{:.1})",
            id,
            self.current + 1,
            request.rect.x,
            request.rect.y,
            request.rect.width,
            request.rect.height
        );
        self.next_request_id += 1;
        self.in_flight = Some(ticket);
        self.status = Status::info(format!("Processing drawn Column {}...", self.current + 1));
        Ok(request)
    }

    /// 検出結果を受け取る
    pub fn complete_submit(&mut self, ticket: RequestTicket, result: Result<ColumnDetections>) -> SubmitOutcome {
        if self.in_flight != Some(ticket) {
            warn!(
                "discarding stale response for request #{} (column {})",
                ticket.id,
                ticket.logical_index + 1
            );
            return SubmitOutcome::Stale;
        }
        self.in_flight = None;
        let column = ticket.logical_index + 1;

        match result {
            Ok(data) => {
                if data.len() != self.config.num_rows_per_column {
                    warn!(
                        "column {} returned {} rows, expected {}",
                        column,
                        data.len(),
                        self.config.num_rows_per_column
                    );
                }
                self.pending = Some(ColumnResult {
                    rect: ticket.rect,
                    data,
                    logical_index: ticket.logical_index,
                });
                let label = self.confirm_label();
                self.status = Status::success(format!(
                    "Column {} analyzed. Use '{}' or redraw the column.",
                    column, label
                ));
                SubmitOutcome::Accepted {
                    logical_index: ticket.logical_index,
                }
            }
            Err(err) => {
                warn!("column {} analysis failed: {}", column, err);
                self.pending = None;
                self.status = Status::error(format!("Error analyzing Column {}: {}. Please redraw.", column, err));
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// 保留中の結果を確定し、次の列へ進む
    pub fn confirm(&mut self) -> ConfirmOutcome {
        let Some(result) = self.pending.take() else {
            return ConfirmOutcome::NothingPending;
        };

        let logical_index = result.logical_index;
        self.columns[logical_index] = Some(result);
        self.current += 1;

        let total = self.config.num_columns;
        let complete = self.current >= total;
        if complete {
            self.selection.lock();
            self.status = Status::success(format!("All {} columns confirmed! Ready to export.", total));
        } else {
            self.status = Status::info(format!(
                "Column {} confirmed. Draw Column {}.",
                logical_index + 1,
                self.current + 1
            ));
        }
        info!("column {} confirmed ({}/{})", logical_index + 1, self.current, total);

        ConfirmOutcome::Committed { logical_index, complete }
    }

    /// 解答キーを組み立てる（全列確定後のみ）
    pub fn answer_key(&self) -> Result<AnswerKey> {
        if !self.is_complete() {
            return Err(Error::Incomplete {
                confirmed: self.current,
                total: self.config.num_columns,
            });
        }
        Ok(AnswerKey::new(
            self.export_name.clone(),
            assemble::assemble(&self.columns, &self.config),
        ))
    }

    /// 書き出し用の解答キーを取り出す
    ///
    /// 未完了ならステータスにエラーを出す。ファイル書き込みは呼び出し側。
    pub fn export(&mut self) -> Result<AnswerKey> {
        let key = self.answer_key();
        if let Err(err) = &key {
            self.status = Status::error(format!("Error: {}", err));
        }
        key
    }

    /// 書き出し完了をステータスに反映
    pub fn note_exported(&mut self, target: &str) {
        self.status = Status::success(format!("Results exported as {}.", target));
    }

    // ---------------------------------------------------------------
    // 表示用
    // ---------------------------------------------------------------

    pub fn column_counter(&self) -> String {
        let total = self.config.num_columns;
        match &self.image {
            None => String::new(),
            Some(_) if self.current < total => format!("Drawing Column {} of {}", self.current + 1, total),
            Some(_) => format!("All {} columns processed.", total),
        }
    }

    pub fn controls(&self) -> Controls {
        if self.image.is_none() {
            return Controls::default();
        }
        let complete = self.current >= self.config.num_columns;
        Controls {
            confirm_enabled: self.pending.is_some() && !complete,
            confirm_label: self.confirm_label(),
            export_enabled: complete,
            config_enabled: !self.config_locked(),
            crosshair: !complete,
        }
    }

    fn confirm_label(&self) -> &'static str {
        if self.pending.is_some() && self.current + 1 == self.config.num_columns {
            CONFIRM_LAST_LABEL
        } else {
            CONFIRM_NEXT_LABEL
        }
    }

    fn too_small(&mut self, width: f64, height: f64) -> Error {
        self.status = Status::error(format!("Rectangle too small. Redraw Column {}.", self.current + 1));
        Error::SelectionTooSmall { width, height }
    }

    fn reset_columns(&mut self) {
        self.columns = vec![None; self.config.num_columns];
        self.current = 0;
        self.pending = None;
        self.in_flight = None;
        self.selection.reset();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            config: Configuration::default(),
            image: None,
            columns: vec![None; Configuration::default().num_columns],
            current: 0,
            pending: None,
            selection: SelectionController::new(),
            in_flight: None,
            next_request_id: 1,
            status: Status::default(),
            export_name: assemble::DEFAULT_EXPORT_NAME.to_string(),
        }
    }
}
