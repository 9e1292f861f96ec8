use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "omr-annotator")]
#[command(about = "マークシート列アノテーション・解答キー生成ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 検出サービスのURL（設定ファイル・環境変数より優先）
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像の列を対話的に指定して解答キーを作成
    Annotate {
        /// マークシート画像
        #[arg(required = true)]
        image: PathBuf,

        /// 列数
        #[arg(short, long)]
        columns: Option<usize>,

        /// 1列あたりの行数
        #[arg(short, long)]
        rows: Option<usize>,

        /// 最低信頼度 (0.0-1.0)
        #[arg(long)]
        confidence: Option<f64>,

        /// 表示サイズ計算に使うビューポート幅
        #[arg(long)]
        viewport_width: Option<f64>,

        /// 表示サイズ計算に使うビューポート高さ
        #[arg(long)]
        viewport_height: Option<f64>,

        /// 各操作後にオーバーレイ付きプレビューPNGを書き出す
        #[arg(long)]
        preview: Option<PathBuf>,

        /// 出力ファイル/ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (txt/excel/both)
        #[arg(short, long, default_value = "txt")]
        format: ExportFormat,
    },

    /// 1列分だけ検出を実行し、レスポンスJSONを出力
    Analyze {
        /// マークシート画像
        #[arg(required = true)]
        image: PathBuf,

        /// 元画像ピクセル座標の矩形 x,y,width,height
        #[arg(long, required = true)]
        rect: RectArg,

        /// 行数
        #[arg(short, long)]
        rows: Option<usize>,

        /// 最低信頼度 (0.0-1.0)
        #[arg(long)]
        confidence: Option<f64>,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// 検出サービスのURLを設定
        #[arg(long)]
        set_backend_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Debug, Default)]
pub enum ExportFormat {
    #[default]
    Txt,
    Excel,
    Both,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Txt),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "both" => Ok(ExportFormat::Both),
            _ => Err(format!("Unknown format: {}. Use txt, excel, or both", s)),
        }
    }
}

/// `x,y,width,height` 形式の矩形
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectArg {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl std::str::FromStr for RectArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("Invalid rect {:?}: {}", s, e))?;

        match values.as_slice() {
            [x, y, width, height] if *width > 0.0 && *height > 0.0 => Ok(RectArg {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            }),
            [_, _, _, _] => Err(format!("Rect width and height must be positive: {}", s)),
            _ => Err(format!("Rect must be x,y,width,height: {}", s)),
        }
    }
}
