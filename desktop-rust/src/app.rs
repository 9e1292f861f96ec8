use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use eframe::egui::{self, Color32, RichText};
use eframe::egui::{FontData, FontDefinitions, FontFamily};
use omr_common::{
    render, Configuration, DrawOp, Point, Scene, Session, StatusKind, SubmitOutcome, Viewport,
};

use crate::io::{default_export_name, read_sheet, run_analyze_cli, save_answer_key};
use crate::model::{AnalyzeJob, ExportFormat, SheetPixels, UiMessage};

const SIDE_PANEL_WIDTH: f32 = 260.0;

pub struct DesktopApp {
    session: Session,
    image_path: Option<PathBuf>,
    texture: Option<egui::TextureHandle>,
    pending_pixels: Option<SheetPixels>,
    config_draft: Configuration,
    export_format: ExportFormat,
    export_status: String,
    viewport: Viewport,
    analyze_tx: Sender<UiMessage>,
    analyze_rx: Receiver<UiMessage>,
}

impl DesktopApp {
    fn open_image(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"])
            .add_filter("All files", &["*"])
            .pick_file()
        else {
            return;
        };
        if let Err(err) = self.load_from_path(&path) {
            self.export_status = format!("Load failed: {err:#}");
        }
    }

    fn load_from_path(&mut self, path: &Path) -> anyhow::Result<()> {
        let (file, size, pixels) = read_sheet(path)?;
        // 画像以外はセッションがステータスを出して拒否する
        if self.session.load_image(file, size, &self.viewport).is_ok() {
            self.image_path = Some(path.to_path_buf());
            self.texture = None;
            self.pending_pixels = pixels;
            self.config_draft = *self.session.config();
            self.export_status.clear();
        }
        Ok(())
    }

    fn apply_config(&mut self) {
        match self.session.set_config(self.config_draft) {
            Ok(()) => self.export_status = "Configuration applied".to_string(),
            Err(err) => self.export_status = err.to_string(),
        }
    }

    fn export(&mut self) {
        let Ok(key) = self.session.export() else {
            return;
        };
        let default_name = default_export_name(&key, self.export_format);
        let Some(path) = rfd::FileDialog::new().set_file_name(&default_name).save_file() else {
            return;
        };
        match save_answer_key(&path, &key, self.export_format) {
            Ok(()) => {
                let name = path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or(default_name.as_str())
                    .to_string();
                self.session.note_exported(&name);
            }
            Err(err) => self.export_status = format!("Export failed: {err:#}"),
        }
    }

    /// 検出をワーカースレッドで実行（CLIの analyze を子プロセスで呼ぶ）
    fn spawn_analyze(&mut self, job: AnalyzeJob) {
        let cli = resolve_cli_binary();
        let sender = self.analyze_tx.clone();
        log::debug!("analyze job #{} via {}", job.ticket.id(), cli.display());

        std::thread::spawn(move || {
            let result = run_analyze_cli(&cli, &job);
            let _ = sender.send(UiMessage::AnalyzeDone {
                ticket: job.ticket,
                result,
            });
        });
    }

    fn poll_messages(&mut self) {
        while let Ok(msg) = self.analyze_rx.try_recv() {
            let UiMessage::AnalyzeDone { ticket, result } = msg;
            if let SubmitOutcome::Stale = self.session.complete_submit(ticket, result) {
                log::debug!("dropped stale result #{}", ticket.id());
            }
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if let Some(pixels) = self.pending_pixels.take() {
            let color_image = egui::ColorImage::from_rgba_unmultiplied(pixels.size, &pixels.rgba);
            self.texture = Some(ctx.load_texture("answer_sheet", color_image, egui::TextureOptions::LINEAR));
        }
    }

    /// ウィンドウサイズが変わったら表示サイズを再計算
    fn track_viewport(&mut self, container_width: f32, window_height: f32) {
        let viewport = Viewport::new(f64::from(container_width), f64::from(window_height));
        if viewport == self.viewport {
            return;
        }
        match self.session.resize(&viewport) {
            // 描画中は見送って次のフレームで再試行
            Ok(false) if self.session.selection().is_drawing() => {}
            Ok(_) => self.viewport = viewport,
            Err(err) => log::warn!("resize skipped: {err}"),
        }
    }

    fn render_canvas(&mut self, ui: &mut egui::Ui) {
        let Some(display) = self.session.display().copied() else {
            ui.centered_and_justified(|ui| {
                ui.label("Load an answer sheet image (File > Open Image).");
            });
            return;
        };

        let size = egui::vec2(display.display_width as f32, display.display_height as f32);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::drag());
        let origin = response.rect.min;
        let to_point = |pos: egui::Pos2| Point::new(f64::from(pos.x - origin.x), f64::from(pos.y - origin.y));

        if response.drag_started() {
            // ドラッグ判定は少し動いてからなので、押した位置を起点にする
            let press = ui.ctx().input(|i| i.pointer.press_origin());
            if let Some(pos) = press.or(response.interact_pointer_pos()) {
                self.session.pointer_down(to_point(pos));
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.session.pointer_move(to_point(pos));
            }
        }
        if response.drag_stopped() {
            match self.session.pointer_up() {
                Ok(Some(request)) => {
                    if let Some(path) = self.image_path.clone() {
                        self.spawn_analyze(AnalyzeJob::new(&request, path));
                    }
                }
                Ok(None) => {}
                Err(err) => log::debug!("selection rejected: {err}"),
            }
        }

        if response.hovered() && self.session.controls().crosshair {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Crosshair);
        }

        paint_scene(&painter, origin, &render(&self.session), self.texture.as_ref());
    }

    fn render_side_panel(&mut self, ui: &mut egui::Ui) {
        let controls = self.session.controls();

        ui.heading("Configuration");
        ui.add_enabled_ui(controls.config_enabled, |ui| {
            egui::Grid::new("config_grid").num_columns(2).show(ui, |ui| {
                ui.label("Columns");
                ui.add(egui::DragValue::new(&mut self.config_draft.num_columns).clamp_range(1..=50));
                ui.end_row();
                ui.label("Rows per column");
                ui.add(egui::DragValue::new(&mut self.config_draft.num_rows_per_column).clamp_range(1..=200));
                ui.end_row();
                ui.label("Min confidence");
                ui.add(
                    egui::DragValue::new(&mut self.config_draft.min_confidence_score)
                        .clamp_range(0.0..=1.0)
                        .speed(0.01),
                );
                ui.end_row();
            });
            if ui.button("Apply").clicked() {
                self.apply_config();
            }
        });

        ui.separator();
        ui.label(RichText::new(self.session.column_counter()).strong());
        if ui
            .add_enabled(controls.confirm_enabled, egui::Button::new(controls.confirm_label))
            .clicked()
        {
            self.session.confirm();
        }

        ui.separator();
        ui.heading("Export");
        ui.radio_value(&mut self.export_format, ExportFormat::Txt, "Text (.txt)");
        ui.radio_value(&mut self.export_format, ExportFormat::Excel, "Excel (.xlsx)");
        if ui
            .add_enabled(controls.export_enabled, egui::Button::new("Export Results"))
            .clicked()
        {
            self.export();
        }
        if !self.export_status.is_empty() {
            ui.label(RichText::new(&self.export_status).color(Color32::from_rgb(246, 196, 69)));
        }

        if let Some(pending) = self.session.pending() {
            ui.separator();
            ui.heading("Detected");
            let rows = self.session.config().num_rows_per_column;
            let first = pending.logical_index * rows + 1;
            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::Grid::new("pending_grid").striped(true).show(ui, |ui| {
                    for row in 0..rows {
                        ui.label(format!("{}", first + row));
                        ui.label(pending.data.first_label(row).unwrap_or("-"));
                        ui.end_row();
                    }
                });
            });
        }
    }
}

fn paint_scene(painter: &egui::Painter, origin: egui::Pos2, scene: &Scene, texture: Option<&egui::TextureHandle>) {
    for op in &scene.ops {
        match *op {
            DrawOp::Clear => {
                let rect = egui::Rect::from_min_size(origin, egui::vec2(scene.width as f32, scene.height as f32));
                painter.rect_filled(rect, 0.0, Color32::from_gray(20));
            }
            DrawOp::Image { width, height } => {
                if let Some(texture) = texture {
                    let rect = egui::Rect::from_min_size(origin, egui::vec2(width as f32, height as f32));
                    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                    painter.image(texture.id(), rect, uv, Color32::WHITE);
                }
            }
            DrawOp::Stroke { rect, style } => {
                let [r, g, b, a] = style.rgba();
                let rect = egui::Rect::from_min_size(
                    origin + egui::vec2(rect.x as f32, rect.y as f32),
                    egui::vec2(rect.width as f32, rect.height as f32),
                );
                let stroke = egui::Stroke::new(style.line_width() as f32, Color32::from_rgba_unmultiplied(r, g, b, a));
                painter.rect_stroke(rect, 0.0, stroke);
            }
        }
    }
}

fn status_color(kind: StatusKind) -> Color32 {
    match kind {
        StatusKind::Info => Color32::from_gray(200),
        StatusKind::Success => Color32::from_rgb(110, 200, 120),
        StatusKind::Error => Color32::from_rgb(230, 90, 90),
    }
}

pub fn configure_fonts(ctx: &egui::Context) {
    let mut fonts = FontDefinitions::default();
    let candidates = [
        r"C:\Windows\Fonts\meiryo.ttc",
        r"C:\Windows\Fonts\msgothic.ttc",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    ];

    for path in candidates {
        if let Ok(data) = std::fs::read(path) {
            add_fallback_font(&mut fonts, data);
            ctx.set_fonts(fonts);
            return;
        }
    }
}

/// 日本語フォントを両方のファミリーに登録（等幅は既定フォントの後ろ）
fn add_fallback_font(fonts: &mut FontDefinitions, data: Vec<u8>) {
    fonts.font_data.insert("jp_fallback".to_string(), FontData::from_owned(data));
    fonts
        .families
        .entry(FontFamily::Proportional)
        .or_default()
        .insert(0, "jp_fallback".to_string());
    fonts
        .families
        .entry(FontFamily::Monospace)
        .or_default()
        .push("jp_fallback".to_string());
}

impl Default for DesktopApp {
    fn default() -> Self {
        let (analyze_tx, analyze_rx) = mpsc::channel();
        Self {
            session: Session::default(),
            image_path: None,
            texture: None,
            pending_pixels: None,
            config_draft: Configuration::default(),
            export_format: ExportFormat::default(),
            export_status: String::new(),
            viewport: Viewport::new(1280.0, 900.0),
            analyze_tx,
            analyze_rx,
        }
    }
}

impl eframe::App for DesktopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.session.in_flight().is_some() {
            ctx.request_repaint();
        }
        self.poll_messages();
        self.ensure_texture(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Image").clicked() {
                        self.open_image();
                        ui.close_menu();
                    }
                });
                ui.separator();
                let status = self.session.status();
                ui.label(RichText::new(&status.message).color(status_color(status.kind)));
            });
        });

        egui::SidePanel::right("controls")
            .resizable(false)
            .exact_width(SIDE_PANEL_WIDTH)
            .show(ctx, |ui| {
                self.render_side_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let window_height = ctx.screen_rect().height();
            self.track_viewport(ui.available_width(), window_height);
            egui::ScrollArea::both().show(ui, |ui| {
                self.render_canvas(ui);
            });
        });
    }
}

fn resolve_cli_binary() -> PathBuf {
    let name = if cfg!(windows) { "omr-annotator.exe" } else { "omr-annotator" };
    let exe = std::env::current_exe().ok();
    if let Some(base_dir) = exe.as_ref().and_then(|p| p.parent()) {
        let local = base_dir.join(name);
        if local.exists() {
            return local;
        }
        if let Some(target_dir) = base_dir.parent() {
            let sibling = target_dir.join("debug").join(name);
            if sibling.exists() {
                return sibling;
            }
            let release = target_dir.join("release").join(name);
            if release.exists() {
                return release;
            }
        }
    }
    PathBuf::from(name)
}
