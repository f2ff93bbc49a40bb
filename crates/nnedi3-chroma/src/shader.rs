//! Shader unit definitions and compiled kernel resolution
//!
//! This module defines the immutable shader value objects used as processing nodes
//! in the texture filter graph, the NNEDI3 kernel configuration enums, and the
//! deterministic filename mapping used to resolve precompiled kernels from the
//! host's shader store.

use crate::filter_graph::TextureSize;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Neuron counts supported by the NNEDI3 prediction kernels
///
/// Larger networks trade performance for reconstruction quality.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Neurons {
    #[default]
    Neurons16,
    Neurons32,
    Neurons64,
    Neurons128,
    Neurons256,
}

impl Neurons {
    /// Returns the neuron count encoded in the kernel filename
    pub fn count(&self) -> u32 {
        match self {
            Neurons::Neurons16 => 16,
            Neurons::Neurons32 => 32,
            Neurons::Neurons64 => 64,
            Neurons::Neurons128 => 128,
            Neurons::Neurons256 => 256,
        }
    }
}

/// Precompiled kernel code path variants
///
/// Each variant selects a different precompiled instruction-set or algorithmic
/// flavor of the same network, encoded as a single letter in the kernel filename.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodePath {
    Scalar,
    #[default]
    ScalarMad,
    Vector,
    VectorDot,
    Experimental,
}

impl CodePath {
    /// Returns the filename letter for this code path
    pub fn letter(&self) -> char {
        match self {
            CodePath::Scalar => 'A',
            CodePath::ScalarMad => 'B',
            CodePath::Vector => 'C',
            CodePath::VectorDot => 'D',
            CodePath::Experimental => 'E',
        }
    }
}

/// Chroma plane channel selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaChannel {
    U,
    V,
}

impl ChromaChannel {
    /// Returns the filename suffix for this channel
    pub fn suffix(&self) -> &'static str {
        match self {
            ChromaChannel::U => "u",
            ChromaChannel::V => "v",
        }
    }

    /// Returns the compile-time define selecting this channel in the interleave kernel
    pub fn interleave_define(&self) -> &'static str {
        match self {
            ChromaChannel::U => "CHROMA_U",
            ChromaChannel::V => "CHROMA_V",
        }
    }
}

/// Builds the filename of a precompiled NNEDI3 kernel
///
/// The mapping is a pure function of the configuration: identical configurations
/// always resolve to identical filenames. Unstructured 16-neuron ScalarMad for the
/// U channel resolves to `NNEDI3_B_16u.cso`.
pub fn nnedi3_kernel_filename(neurons: Neurons, code_path: CodePath, structured: bool, channel: ChromaChannel) -> String {
    format!(
        "NNEDI3_{}_{}{}{}.cso",
        code_path.letter(),
        neurons.count(),
        if structured { "_S" } else { "" },
        channel.suffix()
    )
}

/// An opaque compiled GPU kernel handle
///
/// Holds the resource name it was resolved under and the compiled bytecode.
/// The bytecode is never interpreted by this crate; it is handed back to the
/// host's kernel executor verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledKernel {
    name: String,
    byte_code: Bytes,
}

impl CompiledKernel {
    pub fn new(name: impl Into<String>, byte_code: Bytes) -> Self {
        Self { name: name.into(), byte_code }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn byte_code(&self) -> &Bytes {
        &self.byte_code
    }
}

/// Static configuration of an NNEDI3 prediction kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nnedi3Params {
    pub neurons: Neurons,
    pub code_path: CodePath,
    pub structured: bool,
}

/// Maps an input texture size to the output size a shader produces
pub type SizeTransform = fn(TextureSize) -> TextureSize;

/// The identity size transform, used by shaders that preserve their input size
pub fn identity_transform(size: TextureSize) -> TextureSize {
    size
}

/// An immutable shader processing unit
///
/// Wraps a compiled kernel plus its static parameters. The output size of an
/// application is derived from the first input's size through the unit's size
/// transform (identity by default); the output component count is fixed per unit.
/// Construction never touches the GPU; evaluation is deferred to the filter graph.
#[derive(Debug, Clone)]
pub struct ShaderUnit {
    kernel: CompiledKernel,
    params: Option<Nnedi3Params>,
    transform: SizeTransform,
    output_components: u32,
}

impl ShaderUnit {
    /// Creates a plain shader unit with the identity transform and a single output component
    pub fn new(kernel: CompiledKernel) -> Self {
        Self {
            kernel,
            params: None,
            transform: identity_transform,
            output_components: 1,
        }
    }

    /// Creates an NNEDI3 prediction shader unit carrying its network configuration
    pub fn nnedi3(kernel: CompiledKernel, params: Nnedi3Params) -> Self {
        Self {
            kernel,
            params: Some(params),
            transform: identity_transform,
            output_components: 1,
        }
    }

    /// Replaces the size transform applied to the first input's size
    pub fn with_transform(mut self, transform: SizeTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Replaces the number of components this shader writes per texel
    pub fn with_output_components(mut self, components: u32) -> Self {
        self.output_components = components;
        self
    }

    pub fn kernel(&self) -> &CompiledKernel {
        &self.kernel
    }

    pub fn params(&self) -> Option<&Nnedi3Params> {
        self.params.as_ref()
    }

    pub fn output_components(&self) -> u32 {
        self.output_components
    }

    /// Computes the output size for an application to an input of the given size
    pub fn output_size(&self, input: TextureSize) -> TextureSize {
        (self.transform)(input)
    }
}

impl PartialEq for ShaderUnit {
    /// Two shader units are interchangeable only when kernel, parameters, and
    /// output shape all match. The size transform is derived from the kernel's
    /// role and is deliberately not part of the comparison.
    fn eq(&self, other: &Self) -> bool {
        self.kernel == other.kernel && self.params == other.params && self.output_components == other.output_components
    }
}

impl Eq for ShaderUnit {}

/// Errors surfaced by the host's compiled shader store
///
/// All of these are fatal configuration errors: a missing or incompatible kernel
/// aborts the current frame's pipeline construction and is never retried.
#[derive(Debug, Clone, Error)]
pub enum ShaderStoreError {
    /// No compiled kernel exists under the requested filename
    #[error("compiled kernel not found: {0}")]
    NotFound(String),
    /// The kernel exists but cannot run on the current device
    #[error("compiled kernel {name} is incompatible: {reason}")]
    Incompatible { name: String, reason: String },
    /// Compiling a kernel from source failed
    #[error("failed to compile {name}: {reason}")]
    CompilationFailed { name: String, reason: String },
}

/// Resolves compiled kernels on behalf of the host
///
/// The store is an excluded collaborator: this crate only defines the contract.
/// Precompiled kernels are resolved by the deterministic filename convention;
/// source kernels are compiled with a set of preprocessor defines.
pub trait ShaderStore {
    /// Resolves a precompiled kernel by filename
    fn from_byte_code(&self, filename: &str) -> Result<CompiledKernel, ShaderStoreError>;

    /// Compiles a kernel from a shader source file with compile-time defines
    fn from_source(&self, filename: &str, defines: &[(&str, &str)]) -> Result<CompiledKernel, ShaderStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel(name: &str) -> CompiledKernel {
        CompiledKernel::new(name, Bytes::from_static(b"\x44\x58\x42\x43"))
    }

    #[test]
    fn test_kernel_filename_unstructured() {
        assert_eq!(nnedi3_kernel_filename(Neurons::Neurons16, CodePath::ScalarMad, false, ChromaChannel::U), "NNEDI3_B_16u.cso");
        assert_eq!(nnedi3_kernel_filename(Neurons::Neurons16, CodePath::ScalarMad, false, ChromaChannel::V), "NNEDI3_B_16v.cso");
        assert_eq!(nnedi3_kernel_filename(Neurons::Neurons256, CodePath::Experimental, false, ChromaChannel::V), "NNEDI3_E_256v.cso");
    }

    #[test]
    fn test_kernel_filename_structured() {
        assert_eq!(nnedi3_kernel_filename(Neurons::Neurons64, CodePath::Scalar, true, ChromaChannel::U), "NNEDI3_A_64_Su.cso");
    }

    #[test]
    fn test_kernel_filename_is_deterministic() {
        let first = nnedi3_kernel_filename(Neurons::Neurons128, CodePath::VectorDot, true, ChromaChannel::V);
        let second = nnedi3_kernel_filename(Neurons::Neurons128, CodePath::VectorDot, true, ChromaChannel::V);
        assert_eq!(first, second);
        assert_eq!(first, "NNEDI3_D_128_Sv.cso");
    }

    #[test]
    fn test_neuron_counts() {
        let expected = [16, 32, 64, 128, 256];
        let variants = [Neurons::Neurons16, Neurons::Neurons32, Neurons::Neurons64, Neurons::Neurons128, Neurons::Neurons256];
        for (variant, count) in variants.iter().zip(expected) {
            assert_eq!(variant.count(), count);
        }
    }

    #[test]
    fn test_code_path_letters() {
        assert_eq!(CodePath::Scalar.letter(), 'A');
        assert_eq!(CodePath::ScalarMad.letter(), 'B');
        assert_eq!(CodePath::Vector.letter(), 'C');
        assert_eq!(CodePath::VectorDot.letter(), 'D');
        assert_eq!(CodePath::Experimental.letter(), 'E');
    }

    #[test]
    fn test_shader_unit_equality_requires_matching_fields() {
        let params = Nnedi3Params {
            neurons: Neurons::Neurons32,
            code_path: CodePath::ScalarMad,
            structured: false,
        };
        let a = ShaderUnit::nnedi3(kernel("NNEDI3_B_32u.cso"), params);
        let b = ShaderUnit::nnedi3(kernel("NNEDI3_B_32u.cso"), params);
        assert_eq!(a, b);

        let structured = ShaderUnit::nnedi3(
            kernel("NNEDI3_B_32u.cso"),
            Nnedi3Params {
                structured: true,
                ..params
            },
        );
        assert_ne!(a, structured);

        let other_kernel = ShaderUnit::nnedi3(kernel("NNEDI3_B_32v.cso"), params);
        assert_ne!(a, other_kernel);
    }

    #[test]
    fn test_shader_unit_transform_is_not_part_of_equality() {
        fn double(size: TextureSize) -> TextureSize {
            TextureSize::new(size.width * 2, size.height * 2)
        }

        let a = ShaderUnit::new(kernel("Interleave.hlsl"));
        let b = ShaderUnit::new(kernel("Interleave.hlsl")).with_transform(double);
        assert_eq!(a, b);
        assert_eq!(b.output_size(TextureSize::new(4, 4)), TextureSize::new(8, 8));
    }

    #[test]
    fn test_default_output_size_is_identity() {
        let unit = ShaderUnit::new(kernel("NNEDI3_B_16u.cso"));
        assert_eq!(unit.output_size(TextureSize::new(128, 64)), TextureSize::new(128, 64));
        assert_eq!(unit.output_components(), 1);
    }
}
