//! Quality and performance preset configurations
//!
//! This module provides predefined neuron-count combinations for common use
//! cases, trading reconstruction quality for per-frame cost.

use crate::chroma::Nnedi3ChromaSettings;
use crate::shader::Neurons;
use serde::{Deserialize, Serialize};

/// Performance presets controlling the size of the prediction networks
///
/// The first pass dominates the visual result and gets the larger network;
/// the second pass refines the interleaved intermediate and can stay smaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChromaPerformancePreset {
    /// Fastest processing with the smallest networks
    Light,
    /// Balanced performance and quality
    Medium,
    /// Higher quality with moderate performance impact
    High,
    /// Very high quality with significant performance cost
    Ultra,
    /// Maximum quality with the highest performance cost
    Extreme,
}

impl ChromaPerformancePreset {
    /// Returns the human-readable name of this preset
    pub fn name(&self) -> &'static str {
        match self {
            ChromaPerformancePreset::Light => "Light",
            ChromaPerformancePreset::Medium => "Medium",
            ChromaPerformancePreset::High => "High",
            ChromaPerformancePreset::Ultra => "Ultra",
            ChromaPerformancePreset::Extreme => "Extreme",
        }
    }

    /// Returns the network size for the initial prediction pass
    fn for_initial_pass(&self) -> Neurons {
        match self {
            ChromaPerformancePreset::Light => Neurons::Neurons16,
            ChromaPerformancePreset::Medium => Neurons::Neurons32,
            ChromaPerformancePreset::High => Neurons::Neurons64,
            ChromaPerformancePreset::Ultra => Neurons::Neurons128,
            ChromaPerformancePreset::Extreme => Neurons::Neurons256,
        }
    }

    /// Returns the network size for the refinement pass
    fn for_refinement_pass(&self) -> Neurons {
        match self {
            ChromaPerformancePreset::Light => Neurons::Neurons16,
            ChromaPerformancePreset::Medium => Neurons::Neurons16,
            ChromaPerformancePreset::High => Neurons::Neurons32,
            ChromaPerformancePreset::Ultra => Neurons::Neurons64,
            ChromaPerformancePreset::Extreme => Neurons::Neurons128,
        }
    }

    /// Creates strategy settings for this preset, keeping the default code path
    /// and unstructured weights
    pub fn to_settings(&self) -> Nnedi3ChromaSettings {
        Nnedi3ChromaSettings {
            neurons_pass1: self.for_initial_pass(),
            neurons_pass2: self.for_refinement_pass(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::CodePath;

    #[test]
    fn test_preset_neuron_ladder() {
        let expected = [
            (ChromaPerformancePreset::Light, Neurons::Neurons16, Neurons::Neurons16),
            (ChromaPerformancePreset::Medium, Neurons::Neurons32, Neurons::Neurons16),
            (ChromaPerformancePreset::High, Neurons::Neurons64, Neurons::Neurons32),
            (ChromaPerformancePreset::Ultra, Neurons::Neurons128, Neurons::Neurons64),
            (ChromaPerformancePreset::Extreme, Neurons::Neurons256, Neurons::Neurons128),
        ];
        for (preset, pass1, pass2) in expected {
            let settings = preset.to_settings();
            assert_eq!(settings.neurons_pass1, pass1, "{} pass 1", preset.name());
            assert_eq!(settings.neurons_pass2, pass2, "{} pass 2", preset.name());
            assert_eq!(settings.code_path, CodePath::ScalarMad);
            assert!(!settings.structured);
        }
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(ChromaPerformancePreset::Light.name(), "Light");
        assert_eq!(ChromaPerformancePreset::Extreme.name(), "Extreme");
    }
}
