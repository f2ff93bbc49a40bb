//! NNEDI3 chroma doubling for render-script hosts
//!
//! This crate builds the multi-pass GPU filter graph that upscales a frame's
//! chroma planes to luma resolution (4:2:0 to 4:4:4 style) using two-pass
//! NNEDI3 prediction kernels per color channel. The graph is a lazy, immutable
//! DAG; actual pixel work is delegated to the host renderer through the
//! [`KernelExecutor`] seam, and compiled kernels are resolved through the
//! [`ShaderStore`] seam.

pub mod chroma;
pub mod filter_graph;
pub mod presets;
pub mod shader;

pub use chroma::{ChromaScaleError, ChromaScaleResult, Composition, Nnedi3ChromaScaler, Nnedi3ChromaSettings, PipelineContext, interleave_transform};
pub use filter_graph::{EvaluationError, FilterGraphError, FilterOp, KernelExecutor, Plane, TextureFilter, TextureSize};
pub use presets::ChromaPerformancePreset;
pub use shader::{ChromaChannel, CodePath, CompiledKernel, Neurons, Nnedi3Params, ShaderStore, ShaderStoreError, ShaderUnit, nnedi3_kernel_filename};
