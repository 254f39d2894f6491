use garde::Validate;
use serde::{Deserialize, Serialize};

/// What the user asked for, before plan policy is applied.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerationRequest {
    /// Topic or instructions for the deck.
    #[garde(length(chars, min = 10, max = 500))]
    pub task: String,
    /// Optional source page to extract content from.
    #[garde(skip)]
    pub url: String,
    #[garde(length(min = 1))]
    pub design_style: String,
    #[garde(range(min = 1))]
    pub slide_count: u32,
    #[garde(skip)]
    pub graphs: bool,
    #[garde(skip)]
    pub tables: bool,
    #[garde(skip)]
    pub pie_charts: bool,
    #[garde(skip)]
    pub images: bool,
}

impl GenerationRequest {
    pub const DEFAULT_DESIGN_STYLE: &'static str = "minimal_1";
    pub const DEFAULT_SLIDE_COUNT: u32 = 3;

    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            url: String::new(),
            design_style: Self::DEFAULT_DESIGN_STYLE.to_string(),
            slide_count: Self::DEFAULT_SLIDE_COUNT,
            graphs: false,
            tables: false,
            pie_charts: false,
            images: false,
        }
    }

    pub fn with_slide_count(mut self, slide_count: u32) -> Self {
        self.slide_count = slide_count;
        self
    }

    pub fn wants_visual_elements(&self) -> bool {
        self.graphs || self.tables || self.pie_charts || self.images
    }

    pub fn clear_visual_elements(&mut self) {
        self.graphs = false;
        self.tables = false;
        self.pie_charts = false;
        self.images = false;
    }
}

/// The body of `POST /generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateBody<'a> {
    pub user_id: &'a str,
    pub task: &'a str,
    pub url: &'a str,
    pub design_style: &'a str,
    pub slide_count: u32,
    pub graphs: bool,
    pub tables: bool,
    pub pie_charts: bool,
    pub images: bool,
}

impl<'a> GenerateBody<'a> {
    pub fn new(user_id: &'a str, request: &'a GenerationRequest) -> Self {
        Self {
            user_id,
            task: &request.task,
            url: &request.url,
            design_style: &request.design_style,
            slide_count: request.slide_count,
            graphs: request.graphs,
            tables: request.tables,
            pie_charts: request.pie_charts,
            images: request.images,
        }
    }
}

/// The backend's answer to a generation request.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    /// Expected generation time in seconds.
    #[serde(default)]
    pub estimated_time: Option<f64>,
}

/// A finished deck, ready to download.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDeck {
    pub job_id: String,
    pub filename: Option<String>,
    /// Absolute URL, resolved against the API origin.
    pub download_url: Option<String>,
}
