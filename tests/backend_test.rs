//! 検出サービスクライアントの統合テスト
//!
//! ローカルに1回だけ応答するTCPサーバーを立てて検証する。

use omr_annotator::backend::{submit_column, BackendClient};
use omr_common::{
    Configuration, Error, ImageSize, Point, Session, SourceFile, SubmitOutcome, Viewport,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// 1リクエストだけ受けて固定のレスポンスを返す
///
/// 受信したリクエスト全体（ヘッダ＋本文）を返す。
async fn one_shot_server(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept failed");
        let request = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{}", addr), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        let Some(header_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let headers = text[..header_end].to_ascii_lowercase();
        let body_len = buf.len() - (header_end + 4);

        let content_length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok());
        match content_length {
            Some(len) if body_len >= len => break,
            Some(_) => continue,
            None if text.ends_with("0\r\n\r\n") => break,
            None => continue,
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn loaded_session(rows: usize) -> Session {
    let mut session = Session::new(Configuration::new(1, rows, 0.2).unwrap()).unwrap();
    session
        .load_image(
            SourceFile::new("sheet.png", "image/png", b"fake-png-bytes".to_vec()),
            ImageSize::new(1000, 2000),
            &Viewport::new(1200.0, 1000.0),
        )
        .unwrap();
    session
}

fn draw(session: &mut Session) -> omr_common::ColumnRequest {
    session.pointer_down(Point::new(45.0, 90.0));
    session.pointer_move(Point::new(90.0, 540.0));
    session.pointer_up().unwrap().unwrap()
}

#[tokio::test]
async fn test_multipart_fields_and_success() {
    let (url, server) = one_shot_server("200 OK", r#"{"column_data": [[{"label": 2}], []]}"#).await;
    let client = BackendClient::new(&url, 5).unwrap();

    let mut session = loaded_session(2);
    let request = draw(&mut session);
    let outcome = submit_column(&mut session, &client, request).await;
    assert!(matches!(outcome, SubmitOutcome::Accepted { logical_index: 0 }));

    let received = server.await.unwrap();
    assert!(received.starts_with("POST /process_column "));
    assert!(received.contains("multipart/form-data"));
    for field in ["image", "rect_x", "rect_y", "rect_width", "rect_height", "num_rows", "confidence_score"] {
        assert!(received.contains(&format!("name=\"{}\"", field)), "missing field {}", field);
    }
    assert!(received.contains("filename=\"sheet.png\""));
    assert!(received.contains("fake-png-bytes"));
    // 表示 45,90 → 元画像 100,200（倍率 0.45）
    assert!(received.contains("\r\n\r\n100\r\n"));
    assert!(received.contains("\r\n\r\n1000\r\n"));

    session.confirm();
    assert_eq!(session.answer_key().unwrap().to_tsv(), "1\t2\n2\t-\n");
}

#[tokio::test]
async fn test_service_error_message_is_surfaced() {
    let (url, server) = one_shot_server("400 Bad Request", r#"{"error": "Invalid rectangle dimensions."}"#).await;
    let client = BackendClient::new(&url, 5).unwrap();

    let mut session = loaded_session(2);
    let request = draw(&mut session);
    let result = client.analyze_column(&request).await;
    server.await.unwrap();

    assert!(matches!(result, Err(Error::BackendRequestFailed(ref m)) if m == "Invalid rectangle dimensions."));
}

#[tokio::test]
async fn test_malformed_body() {
    let (url, server) = one_shot_server("200 OK", "this is not json").await;
    let client = BackendClient::new(&url, 5).unwrap();

    let mut session = loaded_session(1);
    let request = draw(&mut session);
    let outcome = submit_column(&mut session, &client, request).await;
    server.await.unwrap();

    assert!(matches!(outcome, SubmitOutcome::Failed(Error::BackendResponseMalformed(_))));
    assert!(session.pending().is_none());
    assert!(session.status().is_error());
}

#[tokio::test]
async fn test_raw_response_keeps_body() {
    let (url, server) = one_shot_server("500 Internal Server Error", "{}").await;
    let client = BackendClient::new(&url, 5).unwrap();

    let mut session = loaded_session(1);
    let request = draw(&mut session);
    let raw = client.post_column(&request).await.unwrap();
    server.await.unwrap();

    assert_eq!(raw.status, 500);
    assert_eq!(raw.body, "{}");
}

#[tokio::test]
async fn test_unreachable_service() {
    // 一度バインドして閉じたポートには誰も居ない
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = BackendClient::new(&format!("http://{}", addr), 2).unwrap();
    let mut session = loaded_session(1);
    let request = draw(&mut session);
    let result = client.analyze_column(&request).await;

    assert!(matches!(result, Err(Error::BackendRequestFailed(_))));
}
