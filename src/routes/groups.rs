//! `/api/groups/{group}`: read-only panel geometry for render screens.

use axum::Json;
use axum::extract::Path;
use axum::http::StatusCode;
use serde::Serialize;
use walls::PanelSize;
use walls::layout::{PanelGroup, WallRect};

#[cfg(test)]
#[path = "groups_test.rs"]
mod tests;

#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub group: PanelGroup,
    pub canvas: PanelSize,
    pub walls: &'static [WallRect],
}

impl From<PanelGroup> for GroupView {
    fn from(group: PanelGroup) -> Self {
        Self { group, canvas: group.canvas(), walls: group.walls() }
    }
}

pub async fn get_group(Path(group): Path<String>) -> Result<Json<GroupView>, StatusCode> {
    PanelGroup::parse(&group)
        .map(|g| Json(GroupView::from(g)))
        .ok_or(StatusCode::NOT_FOUND)
}
