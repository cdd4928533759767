use pdfqa_core::Config;

use crate::pipeline::RagPipeline;

pub struct AppState {
    pub config: Config,
    pub pipeline: RagPipeline,
}
