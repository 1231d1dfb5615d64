use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_TITLE: &str = "New Photoshoot";

/// Step in the photoshoot assembly flow. Exactly one is current at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Upload,
    Model,
    Preview,
    Export,
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Upload => "Upload Products",
            Step::Model => "Select Models",
            Step::Preview => "Preview & Generate",
            Step::Export => "Export",
        }
    }

    /// 1-indexed position, as shown in the step indicator.
    pub fn number(&self) -> usize {
        match self {
            Step::Upload => 1,
            Step::Model => 2,
            Step::Preview => 3,
            Step::Export => 4,
        }
    }

    pub fn next(&self) -> Option<Step> {
        match self {
            Step::Upload => Some(Step::Model),
            Step::Model => Some(Step::Preview),
            Step::Preview => Some(Step::Export),
            Step::Export => None,
        }
    }

    pub fn previous(&self) -> Option<Step> {
        match self {
            Step::Upload => None,
            Step::Model => Some(Step::Upload),
            Step::Preview => Some(Step::Model),
            Step::Export => Some(Step::Preview),
        }
    }

    pub fn is_first(&self) -> bool {
        matches!(self, Step::Upload)
    }

    pub fn is_last(&self) -> bool {
        matches!(self, Step::Export)
    }

    pub fn all() -> [Step; 4] {
        [Step::Upload, Step::Model, Step::Preview, Step::Export]
    }
}

impl Default for Step {
    fn default() -> Self {
        Step::Upload
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Raw file handed over by the upload panel. Order is upload order.
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    pub file_name: String,
    pub data: Bytes,
}

/// Display record derived 1:1 from an uploaded asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub image: String,
}

/// Model descriptor handed to the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: String,
    pub name: String,
    pub image: String,
    pub ethnicity: String,
    pub body_type: String,
    pub style: String,
}

impl ModelProfile {
    // TODO: resolve from the model catalog once the selection service exposes
    // a lookup; until then profiles are synthesized from the bare id.
    pub fn synthesized(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Model {id}"),
            image: format!("https://images.unsplash.com/photo-{id}?w=400&q=80"),
            ethnicity: "Various".to_string(),
            body_type: "Various".to_string(),
            style: "Various".to_string(),
        }
    }
}

/// Backdrop descriptor handed to the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backdrop {
    pub id: String,
    pub name: String,
    pub image: String,
    pub category: String,
}

impl Backdrop {
    pub fn synthesized(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Background {id}"),
            image: format!("https://images.unsplash.com/photo-{id}?w=800&q=80"),
            category: "Various".to_string(),
        }
    }
}

/// Payload handed back to the host when the flow ends. Two distinct call
/// sites produce two distinct shapes, so the type is an explicit union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    ExportRequested {
        images: Vec<String>,
        export_type: String,
    },
    Completed {
        images: Vec<String>,
    },
}

/// Optional starting snapshot for resuming an existing photoshoot.
#[derive(Debug, Default)]
pub struct Seed {
    pub title: Option<String>,
    pub uploaded_assets: Vec<UploadedAsset>,
    pub selected_model_ids: Vec<String>,
    pub selected_background_ids: Vec<String>,
    pub generated_images: Vec<String>,
}

/// One photoshoot session: wizard step plus everything the four panels have
/// handed back so far. All mutation happens through the `complete_*` and
/// navigation methods; derived data is recomputed in full, never patched.
#[derive(Debug, Clone)]
pub struct Photoshoot {
    pub id: Uuid,
    pub title: String,
    step: Step,
    assets: Vec<UploadedAsset>,
    upload_batch: Uuid,
    products: Vec<ProductCard>,
    selected_models: Vec<String>,
    selected_backgrounds: Vec<String>,
    generated_images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Photoshoot {
    pub fn new() -> Self {
        Self::from_seed(Seed::default())
    }

    pub fn from_seed(seed: Seed) -> Self {
        // Resuming a shoot that already has generated images lands on Export.
        let step = if seed.generated_images.is_empty() {
            Step::Upload
        } else {
            Step::Export
        };
        let now = Utc::now();
        let mut shoot = Self {
            id: Uuid::new_v4(),
            title: seed.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            step,
            assets: Vec::new(),
            upload_batch: Uuid::new_v4(),
            products: Vec::new(),
            selected_models: seed.selected_model_ids,
            selected_backgrounds: seed.selected_background_ids,
            generated_images: seed.generated_images,
            created_at: now,
            updated_at: now,
        };
        if !seed.uploaded_assets.is_empty() {
            shoot.complete_upload(seed.uploaded_assets);
        }
        shoot
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn products(&self) -> &[ProductCard] {
        &self.products
    }

    pub fn selected_models(&self) -> &[String] {
        &self.selected_models
    }

    pub fn selected_backgrounds(&self) -> &[String] {
        &self.selected_backgrounds
    }

    pub fn generated_images(&self) -> &[String] {
        &self.generated_images
    }

    /// Batch id stamped into the current display URLs. Replaced on every
    /// upload, which is what revokes the previous batch's URLs.
    pub fn upload_batch(&self) -> Uuid {
        self.upload_batch
    }

    /// Asset bytes for a display URL, or None once the batch is stale.
    pub fn asset(&self, batch: Uuid, index: usize) -> Option<&UploadedAsset> {
        if batch != self.upload_batch {
            return None;
        }
        self.assets.get(index)
    }

    /// Whether the "Next" affordance is enabled on the current step.
    pub fn can_advance(&self) -> bool {
        match self.step {
            Step::Upload => !self.assets.is_empty(),
            Step::Model => {
                !self.selected_models.is_empty() && !self.selected_backgrounds.is_empty()
            }
            Step::Preview => !self.generated_images.is_empty(),
            Step::Export => false,
        }
    }

    pub fn can_retreat(&self) -> bool {
        !self.step.is_first()
    }

    /// Step-indicator taps only check Export reachability; sequential
    /// advancement checks the full guard table. The asymmetry is the shipped
    /// behavior and is kept for compatibility.
    pub fn can_jump_to(&self, step: Step) -> bool {
        step != Step::Export || !self.generated_images.is_empty()
    }

    /// Move to the next step if the current step's guard passes. Idempotent
    /// at Export. Returns the (possibly unchanged) current step.
    pub fn advance(&mut self) -> Step {
        if self.can_advance() {
            if let Some(next) = self.step.next() {
                self.step = next;
                self.touch();
            }
        }
        self.step
    }

    /// Move to the previous step. Idempotent at Upload, no guard.
    pub fn retreat(&mut self) -> Step {
        if let Some(prev) = self.step.previous() {
            self.step = prev;
            self.touch();
        }
        self.step
    }

    pub fn jump_to(&mut self, step: Step) -> Step {
        if self.can_jump_to(step) {
            self.step = step;
            self.touch();
        }
        self.step
    }

    /// Full replacement of the uploaded assets; product cards and display
    /// URLs are rebuilt from scratch under a fresh batch id.
    pub fn complete_upload(&mut self, assets: Vec<UploadedAsset>) {
        self.assets = assets;
        self.upload_batch = Uuid::new_v4();
        self.products = self
            .assets
            .iter()
            .enumerate()
            .map(|(index, asset)| ProductCard {
                id: format!("upload-{index}"),
                name: product_name(&asset.file_name, index),
                image: format!(
                    "/api/photoshoots/{}/uploads/{}/{}",
                    self.id, self.upload_batch, index
                ),
            })
            .collect();
        self.touch();
    }

    /// Full replacement of both selection sequences.
    pub fn complete_model_selection(
        &mut self,
        model_ids: Vec<String>,
        background_ids: Vec<String>,
    ) {
        self.selected_models = model_ids;
        self.selected_backgrounds = background_ids;
        self.touch();
    }

    /// Full replacement of the generated images. Last write wins, so a late
    /// or duplicate completion from the generation backend is harmless.
    pub fn complete_generation(&mut self, image_urls: Vec<String>) {
        self.generated_images = image_urls;
        self.touch();
    }

    /// Model profiles for the generation backend, in selection order.
    pub fn casting(&self) -> Vec<ModelProfile> {
        self.selected_models
            .iter()
            .map(|id| ModelProfile::synthesized(id))
            .collect()
    }

    /// Backdrop for the generation backend. Only the first selected
    /// background is used downstream.
    pub fn backdrop(&self) -> Option<Backdrop> {
        self.selected_backgrounds
            .first()
            .map(|id| Backdrop::synthesized(id))
    }

    /// Host payload for an export action. Does not mutate the session.
    pub fn request_export(&self, export_type: String) -> Outcome {
        Outcome::ExportRequested {
            images: self.generated_images.clone(),
            export_type,
        }
    }

    /// Host payload for the terminal step's primary action.
    pub fn finish(&self) -> Outcome {
        Outcome::Completed {
            images: self.generated_images.clone(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Photoshoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Display name for an uploaded file: everything before the first dot, or a
/// positional placeholder when that leaves nothing.
pub fn product_name(file_name: &str, index: usize) -> String {
    let stem = file_name.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        format!("Product {}", index + 1)
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn asset(file_name: &str) -> UploadedAsset {
        UploadedAsset {
            file_name: file_name.to_string(),
            data: Bytes::from_static(b"fake image bytes"),
        }
    }

    #[test]
    fn step_ordering() {
        assert_eq!(Step::Upload.next(), Some(Step::Model));
        assert_eq!(Step::Model.next(), Some(Step::Preview));
        assert_eq!(Step::Preview.next(), Some(Step::Export));
        assert_eq!(Step::Export.next(), None);

        assert_eq!(Step::Upload.previous(), None);
        assert_eq!(Step::Export.previous(), Some(Step::Preview));

        assert!(Step::Upload.is_first());
        assert!(Step::Export.is_last());
        assert_eq!(Step::all().len(), 4);
        assert_eq!(Step::Upload.number(), 1);
        assert_eq!(Step::Export.number(), 4);
    }

    #[test]
    fn new_shoot_starts_at_upload() {
        let shoot = Photoshoot::new();
        assert_eq!(shoot.step(), Step::Upload);
        assert_eq!(shoot.title, DEFAULT_TITLE);
        assert!(shoot.products().is_empty());
        assert!(shoot.generated_images().is_empty());
        assert!(!shoot.can_advance());
        assert!(!shoot.can_retreat());
    }

    #[test]
    fn seeded_shoot_with_generated_images_starts_at_export() {
        let shoot = Photoshoot::from_seed(Seed {
            title: Some("Spring catalog".to_string()),
            generated_images: vec!["x".to_string()],
            ..Seed::default()
        });
        assert_eq!(shoot.step(), Step::Export);
        assert_eq!(shoot.title, "Spring catalog");
        assert!(shoot.can_jump_to(Step::Export));
    }

    #[test]
    fn advance_blocked_without_uploads() {
        let mut shoot = Photoshoot::new();
        assert_eq!(shoot.advance(), Step::Upload);
        assert_eq!(shoot.step(), Step::Upload);
    }

    #[test]
    fn empty_upload_replacement_keeps_guard_closed() {
        let mut shoot = Photoshoot::new();
        shoot.complete_upload(vec![asset("a.png")]);
        shoot.complete_upload(Vec::new());
        assert_eq!(shoot.advance(), Step::Upload);
    }

    #[test]
    fn retreat_is_idempotent_at_upload() {
        let mut shoot = Photoshoot::new();
        shoot.retreat();
        shoot.retreat();
        assert_eq!(shoot.step(), Step::Upload);
    }

    #[test]
    fn advance_is_idempotent_at_export() {
        let mut shoot = Photoshoot::from_seed(Seed {
            generated_images: vec!["img".to_string()],
            ..Seed::default()
        });
        assert_eq!(shoot.step(), Step::Export);
        shoot.advance();
        shoot.advance();
        assert_eq!(shoot.step(), Step::Export);
    }

    #[test]
    fn product_cards_track_uploads() {
        let mut shoot = Photoshoot::new();
        shoot.complete_upload(vec![asset("fileA.png"), asset("fileB.jpg")]);

        let products = shoot.products();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, "upload-0");
        assert_eq!(products[0].name, "fileA");
        assert_eq!(products[1].id, "upload-1");
        assert_eq!(products[1].name, "fileB");
        assert!(products[0]
            .image
            .starts_with(&format!("/api/photoshoots/{}/uploads/", shoot.id)));
    }

    #[test]
    fn product_name_fallbacks() {
        assert_eq!(product_name("fileA.png", 0), "fileA");
        assert_eq!(product_name("archive.tar.gz", 0), "archive");
        assert_eq!(product_name("plain", 2), "plain");
        assert_eq!(product_name("", 0), "Product 1");
        assert_eq!(product_name(".hidden", 4), "Product 5");
    }

    #[test]
    fn upload_replacement_revokes_old_display_urls() {
        let mut shoot = Photoshoot::new();
        shoot.complete_upload(vec![asset("first.png")]);
        let old_batch = shoot.upload_batch();
        assert!(shoot.asset(old_batch, 0).is_some());

        shoot.complete_upload(vec![asset("second.png")]);
        assert!(shoot.asset(old_batch, 0).is_none());
        assert_eq!(
            shoot
                .asset(shoot.upload_batch(), 0)
                .map(|a| a.file_name.as_str()),
            Some("second.png")
        );
    }

    #[test]
    fn full_flow_reaches_export_and_finishes() {
        let mut shoot = Photoshoot::new();

        shoot.complete_upload(vec![asset("fileA.png"), asset("fileB.jpg")]);
        assert_eq!(shoot.advance(), Step::Model);

        // Both sequences must be filled before Model lets go.
        shoot.complete_model_selection(vec!["m1".to_string()], Vec::new());
        assert_eq!(shoot.advance(), Step::Model);
        shoot.complete_model_selection(vec!["m1".to_string()], vec!["b2".to_string()]);
        assert_eq!(shoot.advance(), Step::Preview);

        assert_eq!(shoot.advance(), Step::Preview);
        shoot.complete_generation(vec!["img1.png".to_string()]);
        assert_eq!(shoot.advance(), Step::Export);

        assert_eq!(
            shoot.finish(),
            Outcome::Completed {
                images: vec!["img1.png".to_string()]
            }
        );
    }

    #[test]
    fn jump_to_export_requires_generated_images() {
        let mut shoot = Photoshoot::new();
        assert_eq!(shoot.jump_to(Step::Export), Step::Upload);

        // Any non-Export step is reachable from anywhere.
        assert_eq!(shoot.jump_to(Step::Preview), Step::Preview);
        assert_eq!(shoot.jump_to(Step::Model), Step::Model);

        shoot.complete_generation(vec!["img.png".to_string()]);
        assert_eq!(shoot.jump_to(Step::Export), Step::Export);
    }

    #[test]
    fn generation_completion_is_last_write_wins() {
        let mut shoot = Photoshoot::new();
        shoot.complete_generation(vec!["stale.png".to_string()]);
        shoot.complete_generation(vec!["fresh-1.png".to_string(), "fresh-2.png".to_string()]);
        assert_eq!(
            shoot.generated_images(),
            &["fresh-1.png".to_string(), "fresh-2.png".to_string()]
        );
    }

    #[test]
    fn export_request_carries_kind_and_leaves_state_alone() {
        let mut shoot = Photoshoot::from_seed(Seed {
            generated_images: vec!["img.png".to_string()],
            ..Seed::default()
        });
        shoot.jump_to(Step::Export);

        let outcome = shoot.request_export("download".to_string());
        assert_eq!(
            outcome,
            Outcome::ExportRequested {
                images: vec!["img.png".to_string()],
                export_type: "download".to_string(),
            }
        );
        assert_eq!(shoot.step(), Step::Export);
        assert_eq!(shoot.generated_images(), &["img.png".to_string()]);
    }

    #[test]
    fn synthesized_descriptors_follow_selection() {
        let mut shoot = Photoshoot::new();
        shoot.complete_model_selection(
            vec!["m1".to_string(), "m2".to_string()],
            vec!["b7".to_string(), "b8".to_string()],
        );

        let casting = shoot.casting();
        assert_eq!(casting.len(), 2);
        assert_eq!(casting[0].name, "Model m1");
        assert_eq!(casting[0].ethnicity, "Various");

        // Only the first background counts.
        let backdrop = shoot.backdrop().unwrap();
        assert_eq!(backdrop.id, "b7");
        assert_eq!(backdrop.name, "Background b7");
        assert_eq!(backdrop.category, "Various");
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let outcome = Outcome::ExportRequested {
            images: vec!["a.png".to_string()],
            export_type: "social".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "export_requested");
        assert_eq!(json["export_type"], "social");

        let done = serde_json::to_value(Outcome::Completed {
            images: vec!["a.png".to_string()],
        })
        .unwrap();
        assert_eq!(done["outcome"], "completed");
    }
}
