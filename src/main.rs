use clap::Parser;
use omr_annotator::{annotate, backend, cli, config, error, loader};
use cli::{Cli, Commands};
use config::AppConfig;
use error::Result;
use omr_common::{ImageRect, Session};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AppConfig::load()?;
    let backend_url = cli.backend_url.clone().unwrap_or_else(|| config.backend_url());

    match cli.command {
        Commands::Annotate {
            image,
            columns,
            rows,
            confidence,
            viewport_width,
            viewport_height,
            preview,
            output,
            format,
        } => {
            println!("📝 omr-annotator - 列アノテーション\n");
            println!("  検出サービス: {}", backend_url);

            let client = backend::BackendClient::new(&backend_url, config.timeout_seconds)?;
            let mut viewport = config.viewport();
            if let Some(width) = viewport_width {
                viewport.container_width = width;
            }
            if let Some(height) = viewport_height {
                viewport.viewport_height = height;
            }

            let options = annotate::AnnotateOptions {
                image,
                config: config.session_config(columns, rows, confidence)?,
                viewport,
                preview,
                output: output.unwrap_or_else(|| std::path::PathBuf::from(".")),
                format,
            };
            annotate::run_interactive_annotate(options, &client).await?;
        }

        Commands::Analyze {
            image,
            rect,
            rows,
            confidence,
            output,
        } => {
            println!("🔍 omr-annotator - 列解析\n");

            let mut session = Session::new(config.session_config(Some(1), rows, confidence)?)?;
            let file = loader::load_file(&image)?;
            session.load_image(file.source, file.size, &config.viewport())?;
            let request =
                session.begin_submit_original(ImageRect::new(rect.x, rect.y, rect.width, rect.height))?;

            let client = backend::BackendClient::new(&backend_url, config.timeout_seconds)?;
            let raw = client.post_column(&request).await?;

            // 本文は加工せずに出力する（デスクトップ版がこれを読む）
            match &output {
                Some(path) => {
                    std::fs::write(path, &raw.body)?;
                    println!("✔ レスポンスを保存: {}", path.display());
                }
                None => println!("{}", raw.body),
            }

            let detections = omr_common::parse_analyze_response(raw.status, &raw.body)?;
            println!("✔ {}行を検出（マークあり {}行）", detections.len(), detections.marked_rows());
        }

        Commands::Config { set_backend_url, show } => {
            let mut config = config;

            if let Some(url) = set_backend_url {
                config.set_backend_url(url)?;
                config.save()?;
                println!("✔ 検出サービスのURLを設定しました");
            }

            if show {
                println!("設定: {}", AppConfig::config_path()?.display());
                println!("  検出サービス: {}", config.backend_url());
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!(
                    "  既定値: {}列 × {}行, 信頼度 {}",
                    config.default_columns, config.default_rows, config.default_confidence
                );
                println!("  ビューポート: {}x{}", config.viewport_width, config.viewport_height);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}
