//! OMR Column Annotator Common Library
//!
//! CLIとデスクトップで共有される型とワークフロー

pub mod assemble;
pub mod config;
pub mod detection;
pub mod error;
pub mod export;
pub mod geometry;
pub mod mapper;
pub mod render;
pub mod scaler;
pub mod selection;
pub mod session;
pub mod status;

pub use assemble::{assemble, export_file_name, to_tsv, Answer, AnswerKey};
pub use config::Configuration;
pub use detection::{parse_analyze_response, BubbleBox, Candidate, ColumnDetections, RowDetections};
pub use error::{Error, Result};
pub use geometry::{DisplayRect, ImageRect, ImageSize, NormalizedRect, Point, Rect, Scale};
pub use render::{render, DrawOp, OverlayStyle, Scene};
pub use scaler::{fit_to_viewport, DisplayImage, Viewport};
pub use selection::{PointerOutcome, SelectionController, SelectionState, MIN_SELECTION_SIZE};
pub use session::{
    ColumnRequest, ColumnResult, ConfirmOutcome, LoadedImage, RequestTicket, Session, SourceFile,
    SubmitOutcome,
};
pub use status::{Controls, Status, StatusKind};
