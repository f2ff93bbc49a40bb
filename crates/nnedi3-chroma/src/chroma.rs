//! NNEDI3 chroma doubling strategy
//!
//! Builds the multi-pass filter graph that upscales a composition's chroma planes
//! to luma resolution: per channel, an NNEDI3 prediction pass followed by an
//! interleave pass, run twice, then a merge with luma and RGB conversion.
//! Compositions the strategy cannot or should not double are passed through
//! unchanged; only missing compiled kernels are treated as errors.

use crate::filter_graph::{FilterGraphError, TextureFilter, TextureSize};
use crate::shader::{ChromaChannel, CodePath, Neurons, Nnedi3Params, ShaderStore, ShaderStoreError, ShaderUnit, nnedi3_kernel_filename};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, trace};

/// Source file of the interleave kernel, compiled once per channel
const INTERLEAVE_SHADER_FILE: &str = "Interleave.hlsl";

/// Size mapping of the interleave stage
///
/// An input of (width, height) produces (2 * height, width): the doubled
/// dimension is expressed through a 90-degree-rotated intermediate. The
/// interleave kernel's memory layout depends on this exact mapping; applying it
/// twice yields (2 * width, 2 * height) in the original orientation.
pub fn interleave_transform(size: TextureSize) -> TextureSize {
    TextureSize::new(2 * size.height, size.width)
}

/// A luma/chroma plane pair for one decoded frame
///
/// The chroma filter carries both the U and V channels; the per-channel shaders
/// select their channel at compile time.
#[derive(Debug, Clone)]
pub struct Composition {
    luma: TextureFilter,
    chroma: TextureFilter,
}

impl Composition {
    pub fn new(luma: TextureFilter, chroma: TextureFilter) -> Self {
        Self { luma, chroma }
    }

    pub fn luma(&self) -> &TextureFilter {
        &self.luma
    }

    pub fn chroma(&self) -> &TextureFilter {
        &self.chroma
    }
}

/// Per-pipeline state shared with the host's diagnostics
///
/// Owns the capability answer queried from the host renderer and the sticky
/// fallback flag. The flag is written from the rendering path and read from a
/// diagnostics path, single writer, so a relaxed atomic bit suffices.
#[derive(Debug)]
pub struct PipelineContext {
    gpu_tier_available: bool,
    fallback_occurred: AtomicBool,
}

impl PipelineContext {
    pub fn new(gpu_tier_available: bool) -> Self {
        Self {
            gpu_tier_available,
            fallback_occurred: AtomicBool::new(false),
        }
    }

    pub fn gpu_tier_available(&self) -> bool {
        self.gpu_tier_available
    }

    /// Returns true once any scaling attempt has fallen back for lack of GPU support
    ///
    /// The flag is sticky: it never resets for the lifetime of the context.
    pub fn fallback_occurred(&self) -> bool {
        self.fallback_occurred.load(Ordering::Relaxed)
    }

    fn mark_fallback(&self) {
        self.fallback_occurred.store(true, Ordering::Relaxed);
    }
}

/// Configuration of the chroma doubling strategy
///
/// The two passes may use differently sized networks; code path and structured
/// mode are shared by all four kernel selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Nnedi3ChromaSettings {
    pub neurons_pass1: Neurons,
    pub neurons_pass2: Neurons,
    pub code_path: CodePath,
    pub structured: bool,
}

/// Outcome of a chroma scaling attempt
#[derive(Debug, Clone)]
pub enum ChromaScaleResult {
    /// The chroma-doubled, RGB-converted filter
    Scaled(TextureFilter),
    /// The input composition, returned unchanged
    Passthrough(Composition),
}

impl ChromaScaleResult {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, ChromaScaleResult::Passthrough(_))
    }
}

/// Fatal errors during pipeline construction
///
/// Fallback conditions are not errors; they produce [`ChromaScaleResult::Passthrough`].
#[derive(Debug, Clone, Error)]
pub enum ChromaScaleError {
    #[error(transparent)]
    Store(#[from] ShaderStoreError),
    #[error(transparent)]
    Graph(#[from] FilterGraphError),
}

/// The NNEDI3 chroma doubling strategy
///
/// Stateless apart from its settings; every invocation builds a fresh graph.
#[derive(Debug, Clone, Default)]
pub struct Nnedi3ChromaScaler {
    settings: Nnedi3ChromaSettings,
}

impl Nnedi3ChromaScaler {
    pub fn new(settings: Nnedi3ChromaSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Nnedi3ChromaSettings {
        &self.settings
    }

    /// Returns a human-readable description including the per-pass neuron counts
    pub fn description(&self) -> String {
        format!("NNEDI3 Chroma Doubler {}/{}", self.settings.neurons_pass1.count(), self.settings.neurons_pass2.count())
    }

    /// Builds the chroma doubling filter graph for one composition
    ///
    /// Returns a passthrough when the GPU feature tier is unavailable (marking
    /// the context's sticky fallback flag) or when the luma size is not exactly
    /// twice the chroma size in both dimensions. Kernel resolution failures are
    /// fatal and abort construction. Construction is deterministic and performs
    /// no pixel work; the returned filter is evaluated by the host.
    pub fn scale_chroma<S: ShaderStore>(&self, ctx: &PipelineContext, store: &S, composition: Composition) -> Result<ChromaScaleResult, ChromaScaleError> {
        if !ctx.gpu_tier_available() {
            ctx.mark_fallback();
            debug!("required GPU feature tier unavailable, passing composition through");
            return Ok(ChromaScaleResult::Passthrough(composition));
        }

        let luma_size = composition.luma().size();
        let chroma_size = composition.chroma().size();
        if luma_size.width != 2 * chroma_size.width || luma_size.height != 2 * chroma_size.height {
            trace!(%luma_size, %chroma_size, "chroma is not at half resolution, passing composition through");
            return Ok(ChromaScaleResult::Passthrough(composition));
        }

        let shader_u_pass1 = self.nnedi3_shader(store, self.settings.neurons_pass1, ChromaChannel::U)?;
        let shader_u_pass2 = self.nnedi3_shader(store, self.settings.neurons_pass2, ChromaChannel::U)?;
        let shader_v_pass1 = self.nnedi3_shader(store, self.settings.neurons_pass1, ChromaChannel::V)?;
        let shader_v_pass2 = self.nnedi3_shader(store, self.settings.neurons_pass2, ChromaChannel::V)?;

        let interleave_u = self.interleave_shader(store, ChromaChannel::U)?;
        let interleave_v = self.interleave_shader(store, ChromaChannel::V)?;

        // Two passes per channel, each followed by an interleave with the pass
        // input. The channels share structure but never intermediates; each
        // channel's second pass consumes only its own first-stage result.
        let chroma = composition.chroma();
        let result_u = interleave_u.apply_to(&[chroma, &chroma.apply(&shader_u_pass1)])?;
        let u = interleave_u.apply_to(&[&result_u, &result_u.apply(&shader_u_pass2)])?;

        let result_v = interleave_v.apply_to(&[chroma, &chroma.apply(&shader_v_pass1)])?;
        let v = interleave_v.apply_to(&[&result_v, &result_v.apply(&shader_v_pass2)])?;

        let merged = composition.luma().merge_with(&[&u, &v])?.convert_to_rgb()?;
        trace!(size = %merged.size(), "chroma doubling pipeline constructed");
        Ok(ChromaScaleResult::Scaled(merged))
    }

    /// Resolves one NNEDI3 prediction shader by its deterministic filename
    fn nnedi3_shader<S: ShaderStore>(&self, store: &S, neurons: Neurons, channel: ChromaChannel) -> Result<ShaderUnit, ChromaScaleError> {
        let filename = nnedi3_kernel_filename(neurons, self.settings.code_path, self.settings.structured, channel);
        let kernel = store.from_byte_code(&filename)?;
        Ok(ShaderUnit::nnedi3(
            kernel,
            Nnedi3Params {
                neurons,
                code_path: self.settings.code_path,
                structured: self.settings.structured,
            },
        ))
    }

    /// Compiles the interleave kernel for one channel
    fn interleave_shader<S: ShaderStore>(&self, store: &S, channel: ChromaChannel) -> Result<ShaderUnit, ChromaScaleError> {
        let kernel = store.from_source(INTERLEAVE_SHADER_FILE, &[(channel.interleave_define(), "1")])?;
        Ok(ShaderUnit::new(kernel).with_transform(interleave_transform))
    }
}
