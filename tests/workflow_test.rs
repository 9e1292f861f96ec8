//! 列ワークフローの統合テスト
//!
//! 検出サービスの代わりに、あらかじめ決めた応答を返す解析器を使う。

use image::{Rgba, RgbaImage};
use omr_annotator::annotate::{AnnotateCommand, AnnotateOptions, Annotator, Flow};
use omr_annotator::backend::{submit_column, ColumnAnalyzer};
use omr_annotator::cli::ExportFormat;
use omr_common::{
    Candidate, ColumnDetections, ColumnRequest, Configuration, DisplayRect, Error, ImageSize, Point,
    Session, SourceFile, SubmitOutcome, Viewport,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use tempfile::tempdir;

/// 決められた順に応答を返す解析器
struct ScriptedAnalyzer {
    responses: Mutex<VecDeque<omr_common::Result<ColumnDetections>>>,
    requests: Mutex<Vec<ColumnRequest>>,
}

impl ScriptedAnalyzer {
    fn new(responses: Vec<omr_common::Result<ColumnDetections>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ColumnAnalyzer for ScriptedAnalyzer {
    async fn analyze_column(&self, request: &ColumnRequest) -> omr_common::Result<ColumnDetections> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::BackendRequestFailed("no scripted response".into())))
    }
}

fn labels(rows: &[&str]) -> ColumnDetections {
    ColumnDetections::new(
        rows.iter()
            .map(|l| if l.is_empty() { vec![] } else { vec![Candidate::new(*l, None)] })
            .collect(),
    )
}

fn loaded(columns: usize, rows: usize) -> Session {
    let mut session = Session::new(Configuration::new(columns, rows, 0.2).unwrap()).unwrap();
    session
        .load_image(
            SourceFile::new("exam.jpg", "image/jpeg", vec![0xFF, 0xD8]),
            ImageSize::new(800, 1600),
            &Viewport::new(1000.0, 1000.0),
        )
        .unwrap();
    session
}

fn drag(session: &mut Session, x: f64) -> Option<ColumnRequest> {
    session.pointer_down(Point::new(x, 20.0));
    session.pointer_move(Point::new(x + 60.0, 700.0));
    session.pointer_up().ok().flatten()
}

#[tokio::test]
async fn test_single_column_scenario() {
    let analyzer = ScriptedAnalyzer::new(vec![Ok(labels(&["B", ""]))]);
    let mut session = loaded(1, 2);

    let request = drag(&mut session, 10.0).unwrap();
    let outcome = submit_column(&mut session, &analyzer, request).await;
    assert!(matches!(outcome, SubmitOutcome::Accepted { logical_index: 0 }));
    session.confirm();

    assert!(session.controls().export_enabled);
    let key = session.export().unwrap();
    assert_eq!(key.file_name, "exam.txt");
    assert_eq!(key.to_tsv(), "1\tB\n2\t-\n");
}

#[tokio::test]
async fn test_second_column_failure_keeps_first() {
    let analyzer = ScriptedAnalyzer::new(vec![
        Ok(labels(&["1", "2"])),
        Err(Error::BackendRequestFailed("Server error processing column".into())),
        Ok(labels(&["3", "4"])),
    ]);
    let mut session = loaded(2, 2);

    let request = drag(&mut session, 10.0).unwrap();
    submit_column(&mut session, &analyzer, request).await;
    session.confirm();

    let request = drag(&mut session, 100.0).unwrap();
    let outcome = submit_column(&mut session, &analyzer, request).await;
    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_eq!(session.current_column(), 1);
    assert!(session.columns()[0].is_some());
    assert!(!session.controls().export_enabled);
    assert!(session.status().message.contains("Error analyzing Column 2"));

    let request = drag(&mut session, 100.0).unwrap();
    submit_column(&mut session, &analyzer, request).await;
    session.confirm();
    assert_eq!(session.export().unwrap().to_tsv(), "1\t1\n2\t2\n3\t3\n4\t4\n");
    assert_eq!(analyzer.calls(), 3);
}

#[tokio::test]
async fn test_redraw_before_confirm_discards_old_result() {
    let analyzer = ScriptedAnalyzer::new(vec![Ok(labels(&["A"])), Ok(labels(&["D"]))]);
    let mut session = loaded(1, 1);

    let request = drag(&mut session, 10.0).unwrap();
    submit_column(&mut session, &analyzer, request).await;
    let request = drag(&mut session, 200.0).unwrap();
    submit_column(&mut session, &analyzer, request).await;
    session.confirm();

    assert_eq!(session.export().unwrap().to_tsv(), "1\tD\n");
}

#[tokio::test]
async fn test_tiny_rectangle_never_calls_service() {
    let analyzer = ScriptedAnalyzer::new(vec![]);
    let mut session = loaded(1, 1);

    session.pointer_down(Point::new(10.0, 10.0));
    session.pointer_move(Point::new(13.0, 400.0));
    assert!(matches!(session.pointer_up(), Err(Error::SelectionTooSmall { .. })));
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test]
async fn test_requests_use_original_pixels() {
    let analyzer = ScriptedAnalyzer::new(vec![Ok(labels(&["A"]))]);
    let mut session = loaded(1, 1);
    // 800x1600 → 450x900（倍率 0.5625）
    let request = drag(&mut session, 45.0).unwrap();
    submit_column(&mut session, &analyzer, request).await;

    let sent = analyzer.requests.lock().unwrap()[0].clone();
    assert!((sent.rect.x - 80.0).abs() < 1e-6);
    assert!((sent.rect.width - 60.0 / 0.5625).abs() < 1e-6);
    assert_eq!(sent.media_type, "image/jpeg");
    assert_eq!(sent.num_rows, 1);
}

fn write_sheet(path: &Path) {
    RgbaImage::from_pixel(200, 400, Rgba([255, 255, 255, 255]))
        .save(path)
        .expect("failed to write test image");
}

#[tokio::test]
async fn test_terminal_session_exports_and_previews() {
    let dir = tempdir().expect("Failed to create temp dir");
    let image = dir.path().join("answers.png");
    let preview = dir.path().join("preview.png");
    write_sheet(&image);

    let analyzer = ScriptedAnalyzer::new(vec![Ok(labels(&["2", "", "4"])), Ok(labels(&["1", "1", ""]))]);
    let mut annotator = Annotator::open(AnnotateOptions {
        image,
        config: Configuration::new(2, 3, 0.2).unwrap(),
        viewport: Viewport::new(1000.0, 1000.0),
        preview: Some(preview.clone()),
        output: dir.path().join("out"),
        format: ExportFormat::Txt,
    })
    .unwrap();

    let commands = [
        AnnotateCommand::Draw(DisplayRect::new(10.0, 10.0, 60.0, 380.0)),
        AnnotateCommand::Confirm,
        // 描画後は設定変更できない
        AnnotateCommand::Configure {
            columns: 4,
            rows: 3,
            confidence: 0.2,
        },
        AnnotateCommand::Draw(DisplayRect::new(110.0, 10.0, 60.0, 380.0)),
        AnnotateCommand::Confirm,
    ];
    for command in commands {
        assert_eq!(annotator.execute(&analyzer, command).await.unwrap(), Flow::Continue);
    }
    assert_eq!(annotator.session.config().num_columns, 2);
    assert!(preview.exists());

    let flow = annotator.execute(&analyzer, AnnotateCommand::Export).await.unwrap();
    let expected = dir.path().join("out").join("answers.txt");
    assert_eq!(flow, Flow::Exported(vec![expected.clone()]));
    assert_eq!(
        std::fs::read_to_string(expected).unwrap(),
        "1\t2\n2\t-\n3\t4\n4\t1\n5\t1\n6\t-\n"
    );
    assert!(annotator.session.status().message.starts_with("Results exported as"));
}

/// 出力先に書けない場合はエラーになるが、セッションは続けられる
#[tokio::test]
async fn test_export_failure_is_recoverable() {
    let dir = tempdir().expect("Failed to create temp dir");
    let image = dir.path().join("answers.png");
    write_sheet(&image);
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let analyzer = ScriptedAnalyzer::new(vec![Ok(labels(&["3"]))]);
    let mut annotator = Annotator::open(AnnotateOptions {
        image,
        config: Configuration::new(1, 1, 0.2).unwrap(),
        viewport: Viewport::new(1000.0, 1000.0),
        preview: None,
        output: blocker.join("out"),
        format: ExportFormat::Txt,
    })
    .unwrap();

    for command in [
        AnnotateCommand::Draw(DisplayRect::new(10.0, 10.0, 60.0, 380.0)),
        AnnotateCommand::Confirm,
    ] {
        assert_eq!(annotator.execute(&analyzer, command).await.unwrap(), Flow::Continue);
    }

    let err = annotator
        .execute(&analyzer, AnnotateCommand::Export)
        .await
        .expect_err("export into a file path should fail");
    assert!(err.is_recoverable());
    assert!(annotator.session.is_complete());
    assert!(annotator.session.export().is_ok());
}

#[tokio::test]
async fn test_export_before_completion_continues() {
    let dir = tempdir().expect("Failed to create temp dir");
    let image = dir.path().join("answers.png");
    write_sheet(&image);

    let analyzer = ScriptedAnalyzer::new(vec![]);
    let mut annotator = Annotator::open(AnnotateOptions {
        image,
        config: Configuration::default(),
        viewport: Viewport::new(1000.0, 1000.0),
        preview: None,
        output: dir.path().to_path_buf(),
        format: ExportFormat::Txt,
    })
    .unwrap();

    let flow = annotator.execute(&analyzer, AnnotateCommand::Export).await.unwrap();
    assert_eq!(flow, Flow::Continue);
    assert!(annotator.session.status().is_error());
    assert!(!dir.path().join("answers.txt").exists());
}

#[test]
fn test_open_rejects_non_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "not an image").unwrap();

    let result = Annotator::open(AnnotateOptions {
        image: path,
        config: Configuration::default(),
        viewport: Viewport::new(1000.0, 1000.0),
        preview: None,
        output: dir.path().to_path_buf(),
        format: ExportFormat::Txt,
    });
    assert!(matches!(
        result,
        Err(omr_annotator::error::OmrError::Common(Error::InvalidFileType(_)))
    ));
}
