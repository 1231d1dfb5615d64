use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::wizard::{Photoshoot, ProductCard, Step};

/// Body for creating a photoshoot. All fields optional so `{}` starts a
/// fresh session; a populated snapshot resumes an earlier one.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CreateRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploaded_assets: Vec<SnapshotAsset>,
    #[serde(default)]
    pub selected_model_ids: Vec<String>,
    #[serde(default)]
    pub selected_background_ids: Vec<String>,
    #[serde(default)]
    pub generated_images: Vec<String>,
}

/// Uploaded file travelling inside a snapshot, bytes base64-encoded.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SnapshotAsset {
    pub file_name: String,
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SelectionRequest {
    pub model_ids: Vec<String>,
    pub background_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NavigateRequest {
    pub step: Step,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExportParams {
    pub export_type: String,
}

/// One entry in the step indicator. `enabled` is the tap affordance: only
/// Export is ever gated, on having generated images.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StepInfo {
    pub id: Step,
    pub label: String,
    pub number: usize,
    pub current: bool,
    pub enabled: bool,
}

/// Client-facing projection of a session, including the affordance flags the
/// step indicator and the Previous/Next buttons render from.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PhotoshootView {
    pub id: Uuid,
    pub title: String,
    pub current_step: Step,
    pub can_advance: bool,
    pub can_retreat: bool,
    pub steps: Vec<StepInfo>,
    pub products: Vec<ProductCard>,
    pub selected_models: Vec<String>,
    pub selected_backgrounds: Vec<String>,
    pub generated_images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Photoshoot> for PhotoshootView {
    fn from(shoot: &Photoshoot) -> Self {
        Self {
            id: shoot.id,
            title: shoot.title.clone(),
            current_step: shoot.step(),
            can_advance: shoot.can_advance(),
            can_retreat: shoot.can_retreat(),
            steps: Step::all()
                .into_iter()
                .map(|step| StepInfo {
                    id: step,
                    label: step.label().to_string(),
                    number: step.number(),
                    current: step == shoot.step(),
                    enabled: shoot.can_jump_to(step),
                })
                .collect(),
            products: shoot.products().to_vec(),
            selected_models: shoot.selected_models().to_vec(),
            selected_backgrounds: shoot.selected_backgrounds().to_vec(),
            generated_images: shoot.generated_images().to_vec(),
            created_at: shoot.created_at,
            updated_at: shoot.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::Seed;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_body_deserializes_to_fresh_request() {
        let req: CreateRequest = serde_json::from_str("{}").unwrap();
        assert!(req.title.is_none());
        assert!(req.uploaded_assets.is_empty());
        assert!(req.generated_images.is_empty());
    }

    #[test]
    fn view_disables_export_until_images_exist() {
        let shoot = Photoshoot::new();
        let view = PhotoshootView::from(&shoot);
        assert_eq!(view.current_step, Step::Upload);
        assert!(!view.can_advance);
        assert!(!view.can_retreat);

        let export = view.steps.iter().find(|s| s.id == Step::Export).unwrap();
        assert!(!export.enabled);
        assert_eq!(view.steps.iter().filter(|s| s.enabled).count(), 3);
    }

    #[test]
    fn view_reflects_seeded_export_state() {
        let shoot = Photoshoot::from_seed(Seed {
            generated_images: vec!["img.png".to_string()],
            ..Seed::default()
        });
        let view = PhotoshootView::from(&shoot);
        assert_eq!(view.current_step, Step::Export);
        assert!(view.steps.iter().all(|s| s.enabled));
        assert_eq!(view.generated_images, vec!["img.png".to_string()]);
    }

    #[test]
    fn step_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Step::Preview).unwrap(), "\"preview\"");
        let nav: NavigateRequest = serde_json::from_str(r#"{"step":"export"}"#).unwrap();
        assert_eq!(nav.step, Step::Export);
    }
}
