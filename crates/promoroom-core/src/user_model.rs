//! Page-classifier seam.
//!
//! The classifier body lives outside the engine; the engine only consumes
//! score vectors and winning categories through this trait. A model is
//! (re)built from locale-specific JSON during initialization and whenever
//! the locale changes.

/// Per-category probability vector for one page. All scores produced by one
/// model share the same length (the model's category count).
pub type PageScore = Vec<f64>;

/// Bayesian page classifier, provided by the host platform.
pub trait UserModel {
    /// Build the classifier from locale-specific model JSON. Returns false
    /// when the payload is unusable; the model stays uninitialized.
    fn initialize(&mut self, model_json: &str) -> bool;

    /// Whether a model is loaded and usable.
    fn is_initialized(&self) -> bool;

    /// Drop the loaded model.
    fn reset(&mut self);

    /// Score a page's HTML against every category.
    fn classify(&self, html: &str) -> PageScore;

    /// Category with the highest score in the vector, as a hyphen-separated
    /// hierarchy (e.g. `technology-computing-hardware`).
    fn winning_category(&self, scores: &[f64]) -> String;
}
