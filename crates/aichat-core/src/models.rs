/// Model sent when nothing else is selected.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Gemini,
    Gpt,
}

impl ModelFamily {
    pub fn all() -> Vec<ModelFamily> {
        vec![ModelFamily::Gemini, ModelFamily::Gpt]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelFamily::Gemini => "Gemini (Free)",
            ModelFamily::Gpt => "GPT (Paid)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOption {
    pub id: &'static str,
    pub label: &'static str,
    pub family: ModelFamily,
}

/// Models offered by the selector, in display order.
pub const MODELS: &[ModelOption] = &[
    ModelOption {
        id: "google/gemini-2.5-flash",
        label: "Gemini 2.5 Flash",
        family: ModelFamily::Gemini,
    },
    ModelOption {
        id: "google/gemini-2.5-pro",
        label: "Gemini 2.5 Pro",
        family: ModelFamily::Gemini,
    },
    ModelOption {
        id: "google/gemini-2.5-flash-lite",
        label: "Gemini 2.5 Flash Lite",
        family: ModelFamily::Gemini,
    },
    ModelOption {
        id: "openai/gpt-5",
        label: "GPT-5",
        family: ModelFamily::Gpt,
    },
    ModelOption {
        id: "openai/gpt-5-mini",
        label: "GPT-5 Mini",
        family: ModelFamily::Gpt,
    },
    ModelOption {
        id: "openai/gpt-5-nano",
        label: "GPT-5 Nano",
        family: ModelFamily::Gpt,
    },
];

pub fn find(id: &str) -> Option<&'static ModelOption> {
    MODELS.iter().find(|model| model.id == id)
}

pub fn by_family(family: ModelFamily) -> impl Iterator<Item = &'static ModelOption> {
    MODELS.iter().filter(move |model| model.family == family)
}

/// Human-readable name for a model id. Ids outside the catalog are passed to
/// the endpoint unchanged, so they are shown as-is.
pub fn display_label(id: &str) -> &str {
    find(id).map(|model| model.label).unwrap_or(id)
}
