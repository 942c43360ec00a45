//! Fixed two-class label encoding.
//!
//! Every classifier in the system is binary: class 0 is "deceptive",
//! class 1 is "truthful". Probability vectors are always ordered
//! `[deceptive, truthful]`.

/// Numeric encoding of the "deceptive" class.
pub const LABEL_DECEPTIVE: u8 = 0;
/// Numeric encoding of the "truthful" class.
pub const LABEL_TRUTHFUL: u8 = 1;

/// Class names in probability-vector order.
pub const CLASS_NAMES: [&str; 2] = ["deceptive", "truthful"];

/// Map a raw label value to the fixed encoding.
///
/// Accepts `"deceptive"`/`"truthful"` (case-insensitive) and the numeric
/// forms `"0"`/`"1"`. Returns `None` for anything else; callers cleaning
/// a dataset drop such rows rather than erroring.
pub fn normalize_label(raw: &str) -> Option<u8> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "deceptive" | "0" => Some(LABEL_DECEPTIVE),
        "truthful" | "1" => Some(LABEL_TRUTHFUL),
        _ => None,
    }
}

/// Human-readable name for an encoded label.
pub fn label_name(label: u8) -> &'static str {
    if label == LABEL_TRUTHFUL {
        CLASS_NAMES[1]
    } else {
        CLASS_NAMES[0]
    }
}
