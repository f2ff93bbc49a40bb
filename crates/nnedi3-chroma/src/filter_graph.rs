//! Lazy texture filter graph
//!
//! This module represents image-processing pipelines as immutable DAGs of filter
//! nodes over texture-like buffers. Composing filters only records structure;
//! no pixels are computed until the graph is evaluated, and every node's output
//! size and component count are derivable statically from its inputs.
//!
//! Evaluation walks the graph once per frame through a [`KernelExecutor`], the
//! seam where the host's GPU command submission plugs in. Shared subexpressions
//! are memoized by node identity so each node executes at most once per walk.

use crate::shader::ShaderUnit;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Integer dimensions of a texture, immutable once constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
}

impl TextureSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the number of texels covered by these dimensions
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for TextureSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A CPU-visible texel buffer produced by evaluating a filter node
///
/// Texels are stored row-major as `f32` values, `components` values per texel.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    size: TextureSize,
    components: u32,
    texels: Vec<f32>,
}

impl Plane {
    /// Creates a zero-filled plane of the given shape
    pub fn new(size: TextureSize, components: u32) -> Self {
        Self {
            size,
            components,
            texels: vec![0.0; size.texel_count() * components as usize],
        }
    }

    /// Wraps an existing texel buffer, rejecting buffers whose length does not match the shape
    pub fn from_texels(size: TextureSize, components: u32, texels: Vec<f32>) -> Result<Self, EvaluationError> {
        let expected = size.texel_count() * components as usize;
        if texels.len() != expected {
            return Err(EvaluationError::TexelCountMismatch {
                len: texels.len(),
                size,
                components,
            });
        }
        Ok(Self { size, components, texels })
    }

    pub fn size(&self) -> TextureSize {
        self.size
    }

    pub fn components(&self) -> u32 {
        self.components
    }

    pub fn texels(&self) -> &[f32] {
        &self.texels
    }

    pub fn texels_mut(&mut self) -> &mut [f32] {
        &mut self.texels
    }

    /// Returns the raw byte view of the texel buffer for upload or readback
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

/// The operation a filter node performs on its inputs
#[derive(Debug, Clone)]
pub enum FilterOp {
    /// A leaf plane supplied by the host renderer, resolved by name at evaluation time
    Source { name: String },
    /// A shader unit applied to one or more upstream filters
    Shader(ShaderUnit),
    /// Concatenation of independent single-plane results into one multi-channel result
    Merge,
    /// Color conversion of a merged 3-channel result to RGB
    ConvertToRgb,
}

#[derive(Debug)]
struct FilterNode {
    op: FilterOp,
    inputs: Vec<TextureFilter>,
    size: TextureSize,
    components: u32,
}

/// A node in the lazy filter graph
///
/// Cloning a `TextureFilter` is cheap and preserves identity; two clones refer to
/// the same underlying node. Nodes are immutable after construction and the whole
/// graph is discarded once the frame has been consumed.
#[derive(Debug, Clone)]
pub struct TextureFilter {
    node: Arc<FilterNode>,
}

impl TextureFilter {
    /// Creates a leaf node for a host-supplied plane
    pub fn source(name: impl Into<String>, size: TextureSize, components: u32) -> Self {
        Self {
            node: Arc::new(FilterNode {
                op: FilterOp::Source { name: name.into() },
                inputs: Vec::new(),
                size,
                components,
            }),
        }
    }

    fn shader_node(shader: &ShaderUnit, inputs: Vec<TextureFilter>) -> Self {
        let size = shader.output_size(inputs[0].size());
        let components = shader.output_components();
        Self {
            node: Arc::new(FilterNode {
                op: FilterOp::Shader(shader.clone()),
                inputs,
                size,
                components,
            }),
        }
    }

    /// Applies a shader unit to this filter, returning a new node
    pub fn apply(&self, shader: &ShaderUnit) -> TextureFilter {
        Self::shader_node(shader, vec![self.clone()])
    }

    /// Merges this filter with others into one multi-channel result
    ///
    /// All inputs must agree on size; the output component count is the sum of
    /// the inputs' component counts. A size mismatch here is an invariant
    /// violation, not a fallback, and is rejected outright.
    pub fn merge_with(&self, others: &[&TextureFilter]) -> Result<TextureFilter, FilterGraphError> {
        if others.is_empty() {
            return Err(FilterGraphError::EmptyMerge);
        }
        let size = self.size();
        let mut inputs = Vec::with_capacity(others.len() + 1);
        let mut components = self.components();
        inputs.push(self.clone());
        for (index, other) in others.iter().enumerate() {
            if other.size() != size {
                return Err(FilterGraphError::MergeSizeMismatch {
                    expected: size,
                    actual: other.size(),
                    index: index + 1,
                });
            }
            components += other.components();
            inputs.push((*other).clone());
        }
        Ok(Self {
            node: Arc::new(FilterNode {
                op: FilterOp::Merge,
                inputs,
                size,
                components,
            }),
        })
    }

    /// Appends an RGB conversion node; the input must carry exactly three channels
    pub fn convert_to_rgb(&self) -> Result<TextureFilter, FilterGraphError> {
        if self.components() != 3 {
            return Err(FilterGraphError::RgbComponentMismatch(self.components()));
        }
        Ok(Self {
            node: Arc::new(FilterNode {
                op: FilterOp::ConvertToRgb,
                inputs: vec![self.clone()],
                size: self.size(),
                components: 3,
            }),
        })
    }

    /// Returns the output size without evaluating any pixels
    pub fn size(&self) -> TextureSize {
        self.node.size
    }

    /// Returns the output component count without evaluating any pixels
    pub fn components(&self) -> u32 {
        self.node.components
    }

    pub fn op(&self) -> &FilterOp {
        &self.node.op
    }

    pub fn inputs(&self) -> &[TextureFilter] {
        &self.node.inputs
    }

    /// Returns true when both handles refer to the same graph node
    pub fn ptr_eq(&self, other: &TextureFilter) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    fn node_id(&self) -> usize {
        Arc::as_ptr(&self.node) as usize
    }

    /// Evaluates this filter and its dependencies through the given executor
    ///
    /// Each distinct node executes at most once per call even when referenced by
    /// multiple downstream consumers; results are shared through the memo table.
    /// Executor results are checked against the node's declared shape so a
    /// misbehaving backend cannot silently corrupt downstream passes.
    pub fn evaluate<E: KernelExecutor>(&self, executor: &mut E) -> Result<Arc<Plane>, EvaluationError> {
        let mut memo = HashMap::new();
        self.evaluate_node(executor, &mut memo)
    }

    fn evaluate_node<E: KernelExecutor>(&self, executor: &mut E, memo: &mut HashMap<usize, Arc<Plane>>) -> Result<Arc<Plane>, EvaluationError> {
        if let Some(plane) = memo.get(&self.node_id()) {
            return Ok(plane.clone());
        }

        let input_planes = self
            .inputs()
            .iter()
            .map(|input| input.evaluate_node(executor, memo))
            .collect::<Result<Vec<_>, _>>()?;
        let input_refs = input_planes.iter().map(Arc::as_ref).collect::<Vec<_>>();

        let plane = match self.op() {
            FilterOp::Source { name } => executor.resolve_source(name, self.size(), self.components())?,
            FilterOp::Shader(shader) => {
                tracing::trace!(kernel = shader.kernel().name(), size = %self.size(), "running shader pass");
                executor.run_shader(shader, &input_refs, self.size(), self.components())?
            }
            FilterOp::Merge => executor.merge_planes(&input_refs, self.size())?,
            FilterOp::ConvertToRgb => executor.convert_to_rgb(input_refs[0])?,
        };

        if plane.size() != self.size() || plane.components() != self.components() {
            return Err(EvaluationError::PlaneShapeMismatch {
                expected_size: self.size(),
                expected_components: self.components(),
                actual_size: plane.size(),
                actual_components: plane.components(),
            });
        }

        let plane = Arc::new(plane);
        memo.insert(self.node_id(), plane.clone());
        Ok(plane)
    }
}

/// Executes filter node operations on behalf of the graph
///
/// Implementations own the actual pixel work: a production backend records GPU
/// dispatches against the host renderer, while tests substitute instrumented
/// doubles. The graph guarantees input planes match the shapes declared by the
/// corresponding upstream nodes.
pub trait KernelExecutor {
    /// Produces the plane behind a source leaf
    fn resolve_source(&mut self, name: &str, size: TextureSize, components: u32) -> Result<Plane, EvaluationError>;

    /// Runs a shader unit over its input planes
    fn run_shader(&mut self, shader: &ShaderUnit, inputs: &[&Plane], output_size: TextureSize, output_components: u32) -> Result<Plane, EvaluationError>;

    /// Concatenates equally sized planes into one multi-channel plane
    fn merge_planes(&mut self, inputs: &[&Plane], output_size: TextureSize) -> Result<Plane, EvaluationError>;

    /// Converts a merged 3-channel plane to RGB
    fn convert_to_rgb(&mut self, input: &Plane) -> Result<Plane, EvaluationError>;
}

/// Errors raised while composing the filter graph
#[derive(Debug, Clone, Error)]
pub enum FilterGraphError {
    /// A shader application was attempted without any input filters
    #[error("shader application requires at least one input filter")]
    NoInputs,
    /// A merge was attempted with no partner filters
    #[error("merge requires at least two input filters")]
    EmptyMerge,
    /// A merge input does not match the size of the first input (input index, 0-based)
    #[error("merge size mismatch: expected {expected}, got {actual} from input {index}")]
    MergeSizeMismatch { expected: TextureSize, actual: TextureSize, index: usize },
    /// RGB conversion was attempted on a node without exactly three channels
    #[error("RGB conversion requires a 3-component input, got {0}")]
    RgbComponentMismatch(u32),
}

/// Errors raised while evaluating the filter graph
#[derive(Debug, Clone, Error)]
pub enum EvaluationError {
    /// The host could not supply a source plane
    #[error("source texture {0} is unavailable")]
    SourceUnavailable(String),
    /// A kernel dispatch failed in the executor
    #[error("kernel {kernel} failed: {reason}")]
    KernelFailed { kernel: String, reason: String },
    /// An executor returned a plane that does not match the node's declared shape
    #[error("plane shape mismatch: expected {expected_size} x{expected_components}, got {actual_size} x{actual_components}")]
    PlaneShapeMismatch {
        expected_size: TextureSize,
        expected_components: u32,
        actual_size: TextureSize,
        actual_components: u32,
    },
    /// A texel buffer's length does not match its declared shape
    #[error("texel buffer length {len} does not match {size} x{components}")]
    TexelCountMismatch { len: usize, size: TextureSize, components: u32 },
}

impl ShaderUnit {
    /// Applies this shader to the given input filters, returning a new node
    ///
    /// The output size is derived from the first input's size through the unit's
    /// size transform; remaining inputs are additional shader resources.
    pub fn apply_to(&self, inputs: &[&TextureFilter]) -> Result<TextureFilter, FilterGraphError> {
        if inputs.is_empty() {
            return Err(FilterGraphError::NoInputs);
        }
        Ok(TextureFilter::shader_node(self, inputs.iter().map(|input| (*input).clone()).collect()))
    }
}
