//! オーバーレイ描画
//!
//! セッション状態から描画命令のリスト（[`Scene`]）を作る純粋関数。
//! 実際のラスタライズは各UI側（CLIは `image`、デスクトップは egui）が行う。
//!
//! 描画順: 背景画像 → 確定済みの列 → 保留中の列 → 描画中の矩形

use crate::geometry::DisplayRect;
use crate::mapper;
use crate::scaler::DisplayImage;
use crate::session::{ColumnResult, Session};

/// オーバーレイの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStyle {
    /// 確定済みの列（緑）
    CommittedColumn,
    /// 検出されたバブル（マゼンタ）
    Bubble,
    /// 確認待ちの列（青）
    PendingColumn,
    /// ドラッグ中の矩形（赤）
    InProgress,
}

impl OverlayStyle {
    pub fn rgba(self) -> [u8; 4] {
        match self {
            OverlayStyle::CommittedColumn => [0, 255, 0, 255],
            OverlayStyle::Bubble => [255, 0, 255, 255],
            OverlayStyle::PendingColumn => [0, 0, 255, 255],
            OverlayStyle::InProgress => [255, 0, 0, 255],
        }
    }

    pub fn line_width(self) -> u32 {
        match self {
            OverlayStyle::CommittedColumn => 3,
            OverlayStyle::Bubble => 1,
            OverlayStyle::PendingColumn | OverlayStyle::InProgress => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOp {
    Clear,
    /// 元画像を表示サイズで描く
    Image { width: f64, height: f64 },
    Stroke { rect: DisplayRect, style: OverlayStyle },
}

/// 1フレーム分の描画命令
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<DrawOp>,
}

impl Scene {
    pub fn strokes(&self) -> impl Iterator<Item = (DisplayRect, OverlayStyle)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Stroke { rect, style } => Some((*rect, *style)),
            _ => None,
        })
    }

    pub fn count(&self, style: OverlayStyle) -> usize {
        self.strokes().filter(|(_, s)| *s == style).count()
    }
}

/// セッション状態からシーンを組み立てる
///
/// 画像が無ければ空のシーンを返す。
pub fn render(session: &Session) -> Scene {
    let Some(display) = session.display() else {
        return Scene::default();
    };

    let mut ops = vec![
        DrawOp::Clear,
        DrawOp::Image {
            width: display.display_width,
            height: display.display_height,
        },
    ];

    for column in session.columns().iter().flatten() {
        push_column(&mut ops, column, display, OverlayStyle::CommittedColumn);
    }
    if let Some(pending) = session.pending() {
        push_column(&mut ops, pending, display, OverlayStyle::PendingColumn);
    }
    if let Some(rect) = session.selection().in_progress() {
        ops.push(DrawOp::Stroke {
            rect,
            style: OverlayStyle::InProgress,
        });
    }

    Scene {
        width: display.display_width,
        height: display.display_height,
        ops,
    }
}

fn push_column(ops: &mut Vec<DrawOp>, column: &ColumnResult, display: &DisplayImage, style: OverlayStyle) {
    let rect = column.display_rect(display);
    ops.push(DrawOp::Stroke { rect, style });
    for bubble in column.data.bubbles() {
        if let Some(rect) = mapper::bubble_to_display(rect, bubble) {
            ops.push(DrawOp::Stroke {
                rect,
                style: OverlayStyle::Bubble,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::detection::{BubbleBox, Candidate, ColumnDetections};
    use crate::geometry::{ImageSize, Point};
    use crate::scaler::Viewport;
    use crate::session::SourceFile;

    fn loaded() -> Session {
        let mut session = Session::new(Configuration::new(2, 1, 0.2).unwrap()).unwrap();
        session
            .load_image(
                SourceFile::new("a.png", "image/png", vec![0u8]),
                ImageSize::new(400, 800),
                &Viewport::new(1000.0, 1000.0),
            )
            .unwrap();
        session
    }

    fn detect(session: &mut Session, x: f64) {
        session.pointer_down(Point::new(x, 0.0));
        session.pointer_move(Point::new(x + 100.0, 400.0));
        let request = session.pointer_up().unwrap().unwrap();
        let bubble = BubbleBox {
            x: 10.0,
            y: 10.0,
            w: 20.0,
            h: 20.0,
            crop_origin_w: 100.0,
            crop_origin_h: 400.0,
        };
        let data = ColumnDetections::new(vec![vec![Candidate::new("1", Some(bubble))]]);
        session.complete_submit(request.ticket, Ok(data));
    }

    #[test]
    fn test_empty_session_renders_nothing() {
        assert!(render(&Session::default()).ops.is_empty());
    }

    #[test]
    fn test_base_image_first() {
        let scene = render(&loaded());
        assert_eq!(scene.ops[0], DrawOp::Clear);
        assert_eq!(scene.ops[1], DrawOp::Image { width: 400.0, height: 800.0 });
        assert_eq!(scene.strokes().count(), 0);
    }

    #[test]
    fn test_layer_order() {
        let mut session = loaded();
        detect(&mut session, 0.0);
        session.confirm();
        detect(&mut session, 150.0);
        session.pointer_down(Point::new(300.0, 0.0));
        // pointer_down で保留は破棄されるので、描画中の矩形のみ増える
        session.pointer_move(Point::new(350.0, 100.0));

        let styles: Vec<OverlayStyle> = render(&session).strokes().map(|(_, s)| s).collect();
        assert_eq!(
            styles,
            vec![OverlayStyle::CommittedColumn, OverlayStyle::Bubble, OverlayStyle::InProgress]
        );
    }

    #[test]
    fn test_pending_drawn_after_committed() {
        let mut session = loaded();
        detect(&mut session, 0.0);
        session.confirm();
        detect(&mut session, 150.0);

        let scene = render(&session);
        let styles: Vec<OverlayStyle> = scene.strokes().map(|(_, s)| s).collect();
        assert_eq!(
            styles,
            vec![
                OverlayStyle::CommittedColumn,
                OverlayStyle::Bubble,
                OverlayStyle::PendingColumn,
                OverlayStyle::Bubble,
            ]
        );
        let (bubble, _) = scene.strokes().nth(3).unwrap();
        assert!(bubble.approx_eq(&DisplayRect::new(160.0, 10.0, 20.0, 20.0), 1e-6));
    }

    #[test]
    fn test_style_widths() {
        assert_eq!(OverlayStyle::CommittedColumn.line_width(), 3);
        assert_eq!(OverlayStyle::Bubble.line_width(), 1);
        assert_eq!(OverlayStyle::PendingColumn.line_width(), 2);
        assert_eq!(OverlayStyle::InProgress.rgba(), [255, 0, 0, 255]);
    }
}
