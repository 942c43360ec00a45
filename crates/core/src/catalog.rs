//! Base-model catalog for fine-tuning.

/// Supported base models: `(identifier, display name)`.
///
/// Identifiers are opaque to this crate; the engine's resolver maps them
/// to local artifacts.
pub const BASE_MODELS: &[(&str, &str)] = &[
    ("bert-base-uncased", "BERT Base (Uncased)"),
    ("microsoft/deberta-v3-base", "DeBERTa v3 Base"),
    ("albert-base-v2", "ALBERT Base v2"),
    ("roberta-base", "RoBERTa Base"),
    ("distilbert-base-uncased", "DistilBERT Base"),
];

/// Whether `id` names a supported base model.
pub fn is_supported_base_model(id: &str) -> bool {
    BASE_MODELS.iter().any(|(key, _)| *key == id)
}
