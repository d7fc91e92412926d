pub mod diagram;
pub mod import_fix;
pub mod pricing;
pub mod rag;
pub mod report;

pub use diagram::GenerateDiagramTool;
pub use import_fix::{CheckDiagramCodeTool, FixDiagramCodeTool, SuggestImportsTool};
pub use pricing::{LookupPriceTool, SearchForServiceTool};
pub use rag::SearchRagTool;
pub use report::GenerateReportTool;

use sdk::types::TaskKind;
use std::sync::Arc;

use crate::agent::ToolBox;
use crate::services::Services;

/// Task-specific tools for one kind of agent.
///
/// The universal `done` / `need_help` tools are added by the agent factory,
/// not here.
pub fn tools_for(kind: TaskKind, services: &Services) -> ToolBox {
    match kind {
        TaskKind::TextToDiagram => {
            ToolBox::new().with(GenerateDiagramTool::new(Arc::clone(&services.renderer)))
        }
        TaskKind::TextToRag => ToolBox::new().with(SearchRagTool::new(Arc::clone(&services.search))),
        TaskKind::PriceLookup => ToolBox::new()
            .with(SearchForServiceTool::new(Arc::clone(&services.prices)))
            .with(LookupPriceTool::new(Arc::clone(&services.prices))),
        TaskKind::Report => ToolBox::new().with(GenerateReportTool::new(services.reports_dir.clone())),
        TaskKind::ImportFix => ToolBox::new()
            .with(CheckDiagramCodeTool::new(Arc::clone(&services.renderer)))
            .with(SuggestImportsTool::new(Arc::clone(&services.search)))
            .with(FixDiagramCodeTool::new(Arc::clone(&services.renderer))),
    }
}
