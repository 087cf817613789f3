/// Thresholds for the rule-based behavior heuristics.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Head displacement (px) above which a face counts as inattentive.
    pub head_movement_threshold: f64,
    /// Divisor scaling displacement into an inattentive confidence.
    pub movement_confidence_scale: f64,
    /// Cap on the scaled inattentive confidence.
    pub inattentive_confidence_cap: f64,
    pub first_seen_confidence: f64,
    pub attentive_confidence: f64,
    pub sleeping_confidence: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            head_movement_threshold: 30.0,
            movement_confidence_scale: 100.0,
            inattentive_confidence_cap: 0.9,
            first_seen_confidence: 0.7,
            attentive_confidence: 0.8,
            sleeping_confidence: 0.85,
        }
    }
}
