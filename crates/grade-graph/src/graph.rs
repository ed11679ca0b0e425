//! Transform graph: input encoding to display, with interactive grading.
//!
//! The pipeline is always assembled in the same order:
//!
//! 1. Color space conversion, input encoding to workspace
//! 2. Primary grading, exposure and gamma (only if grading is not default)
//! 3. Look application in the workspace (only if looks are set)
//! 4. Display/view render from the workspace
//!
//! Grading nodes are compiled as dynamic, so moving a slider never changes
//! the processor fingerprint. Dropping back to default grading, changing the
//! grading space or any of the string fields does.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use grade_core::{
    ColorEngine, CompiledProcessor, DynamicTarget, GradingParameters, GradingSpace, LookSpec,
    TransformNode, math, parse_looks,
};

use crate::error::{GraphError, GraphResult};

/// Role used as workspace when none is set.
pub const DEFAULT_WORKSPACE: &str = "scene_linear";

/// A graph of color operations that compiles to a processor.
pub trait OpGraph {
    /// Validate and compile into a processor.
    fn processor(&self) -> GraphResult<Box<dyn CompiledProcessor>>;

    /// Check that the graph is complete and every name resolves.
    fn validate(&self) -> GraphResult<()>;

    /// Push the current value of every dynamic property to `target`.
    fn update_dynamic(&self, target: &mut dyn DynamicTarget);
}

/// Everything that decides the compiled shape of a [`TransformGraph`].
///
/// Two graphs with equal shapes compile to processors that differ at most
/// in dynamic values.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphShape {
    /// Input encoding.
    pub input_encoding: Option<String>,
    /// Workspace color space.
    pub workspace: String,
    /// Target display.
    pub display: Option<String>,
    /// Target view.
    pub view: Option<String>,
    /// Parsed looks.
    pub looks: Vec<LookSpec>,
    /// Grading space when grading nodes are present, `None` otherwise.
    pub grading: Option<GradingSpace>,
}

/// Input to display pipeline with interactive grading.
pub struct TransformGraph {
    engine: Arc<dyn ColorEngine>,
    input_encoding: Option<String>,
    workspace: String,
    target_display: Option<String>,
    target_view: Option<String>,
    target_looks: Option<String>,
    grading: GradingParameters,
}

impl TransformGraph {
    /// Empty graph over `engine`, workspace set to the `scene_linear` role.
    pub fn new(engine: Arc<dyn ColorEngine>) -> Self {
        Self {
            engine,
            input_encoding: None,
            workspace: DEFAULT_WORKSPACE.to_string(),
            target_display: None,
            target_view: None,
            target_looks: None,
            grading: GradingParameters::new(),
        }
    }

    /// Fluent construction.
    pub fn builder(engine: Arc<dyn ColorEngine>) -> TransformGraphBuilder {
        TransformGraphBuilder::new(engine)
    }

    // ------------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------------

    /// The engine nodes are compiled with.
    pub fn engine(&self) -> &Arc<dyn ColorEngine> {
        &self.engine
    }

    /// Input encoding (a.k.a. IDT).
    pub fn input_encoding(&self) -> Option<&str> {
        self.input_encoding.as_deref()
    }

    /// Sets the input encoding.
    pub fn set_input_encoding(&mut self, name: impl Into<String>) {
        self.input_encoding = Some(name.into());
    }

    /// Interchange color space for grading and looks.
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// Sets the workspace color space.
    pub fn set_workspace(&mut self, name: impl Into<String>) {
        self.workspace = name.into();
    }

    /// Target display.
    pub fn target_display(&self) -> Option<&str> {
        self.target_display.as_deref()
    }

    /// Sets the target display.
    pub fn set_target_display(&mut self, name: impl Into<String>) {
        self.target_display = Some(name.into());
    }

    /// Target view.
    pub fn target_view(&self) -> Option<&str> {
        self.target_view.as_deref()
    }

    /// Sets the target view.
    pub fn set_target_view(&mut self, name: impl Into<String>) {
        self.target_view = Some(name.into());
    }

    /// Raw look string.
    pub fn target_looks(&self) -> Option<&str> {
        self.target_looks.as_deref()
    }

    /// Sets the looks: comma or colon separated names, each optionally
    /// prefixed with `+` (forward, the default) or `-` (inverse).
    pub fn set_target_looks(&mut self, looks: Option<String>) {
        self.target_looks = looks;
    }

    /// Grading parameters.
    pub fn grading(&self) -> &GradingParameters {
        &self.grading
    }

    /// Mutable grading parameters.
    pub fn grading_mut(&mut self) -> &mut GradingParameters {
        &mut self.grading
    }

    fn looks(&self) -> Vec<LookSpec> {
        self.target_looks.as_deref().map(parse_looks).unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------------

    /// Current structural shape.
    pub fn shape(&self) -> GraphShape {
        GraphShape {
            input_encoding: self.input_encoding.clone(),
            workspace: self.workspace.clone(),
            display: self.target_display.clone(),
            view: self.target_view.clone(),
            looks: self.looks(),
            grading: (!self.grading.is_default()).then(|| self.grading.grading_space()),
        }
    }

    /// Node list in application order.
    ///
    /// Fails only if a required field is unset; names are not resolved.
    pub fn nodes(&self) -> GraphResult<Vec<TransformNode>> {
        let input = required(&self.input_encoding).ok_or(GraphError::MissingInputEncoding)?;
        let display = required(&self.target_display).ok_or(GraphError::MissingTargetDisplay)?;
        let view = required(&self.target_view).ok_or(GraphError::MissingTargetView)?;

        let mut nodes = vec![TransformNode::ColorspaceConversion {
            src: input.clone(),
            dst: self.workspace.clone(),
        }];

        if !self.grading.is_default() {
            nodes.push(TransformNode::GradingPrimary {
                primary: self.grading.grading_primary(),
                dynamic: true,
            });
            nodes.push(TransformNode::Exposure { value: self.grading.exposure(), dynamic: true });
            nodes.push(TransformNode::Gamma {
                value: self.grading.gamma(),
                pivot: math::MID_GREY,
                dynamic: true,
            });
        }

        let looks = self.looks();
        if !looks.is_empty() {
            nodes.push(TransformNode::LookApplication {
                src: self.workspace.clone(),
                dst: self.workspace.clone(),
                looks,
            });
        }

        nodes.push(TransformNode::DisplayRender {
            src: self.workspace.clone(),
            display: display.clone(),
            view: view.clone(),
        });
        Ok(nodes)
    }

    /// Validate, assemble and compile.
    pub fn compile(&self) -> GraphResult<Box<dyn CompiledProcessor>> {
        self.validate()?;
        let nodes = self.nodes()?;
        let processor = self.engine.compile(&nodes)?;
        debug!(
            nodes = nodes.len(),
            graded = !self.grading.is_default(),
            fingerprint = %processor.fingerprint(),
            "compiled transform graph"
        );
        Ok(processor)
    }
}

/// A set, non-empty name; empty strings count as unset.
fn required(field: &Option<String>) -> Option<&String> {
    field.as_ref().filter(|s| !s.is_empty())
}

impl OpGraph for TransformGraph {
    fn processor(&self) -> GraphResult<Box<dyn CompiledProcessor>> {
        self.compile()
    }

    fn validate(&self) -> GraphResult<()> {
        let input = required(&self.input_encoding).ok_or(GraphError::MissingInputEncoding)?;
        let display = required(&self.target_display).ok_or(GraphError::MissingTargetDisplay)?;
        let view = required(&self.target_view).ok_or(GraphError::MissingTargetView)?;

        if !self.engine.colorspace_exists(input) {
            return Err(GraphError::UnknownInputEncoding { name: input.to_string() });
        }
        if !self.engine.display_exists(display) {
            return Err(GraphError::UnknownDisplay { name: display.to_string() });
        }
        if !self.engine.view_exists(display, view) {
            return Err(GraphError::UnknownView { display: display.to_string(), view: view.to_string() });
        }
        Ok(())
    }

    fn update_dynamic(&self, target: &mut dyn DynamicTarget) {
        for property in self.grading.dynamic_properties() {
            target.set_dynamic(&property);
        }
    }
}

impl fmt::Display for TransformGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unset = "<unset>";
        writeln!(f, "ColorSpaceTransform:")?;
        writeln!(f, "    from: {}", self.input_encoding().unwrap_or(unset))?;
        writeln!(f, "    to: {}", self.workspace)?;
        writeln!(f, "Grading:")?;
        writeln!(f, "    ignored (default): {}", self.grading.is_default())?;
        writeln!(f, "    {:?}", self.grading.snapshot())?;
        writeln!(f, "Looks:")?;
        writeln!(f, "    {}", self.target_looks().unwrap_or(""))?;
        writeln!(f, "DisplayViewTransform:")?;
        writeln!(f, "    src: {}", self.workspace)?;
        writeln!(f, "    display: {}", self.target_display().unwrap_or(unset))?;
        write!(f, "    view: {}", self.target_view().unwrap_or(unset))
    }
}

impl fmt::Debug for TransformGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformGraph")
            .field("input_encoding", &self.input_encoding)
            .field("workspace", &self.workspace)
            .field("target_display", &self.target_display)
            .field("target_view", &self.target_view)
            .field("target_looks", &self.target_looks)
            .field("grading", &self.grading)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent builder for [`TransformGraph`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use grade_graph::TransformGraph;
/// use grade_ocio::{Engine, builtin};
///
/// let graph = TransformGraph::builder(Arc::new(Engine::new(builtin::studio())))
///     .input_encoding("sRGB Encoded")
///     .display("sRGB")
///     .view("Filmic")
///     .looks("+Punchy")
///     .build();
/// assert_eq!(graph.nodes().unwrap().len(), 3);
/// ```
pub struct TransformGraphBuilder {
    graph: TransformGraph,
}

impl TransformGraphBuilder {
    /// Starts from an empty graph.
    pub fn new(engine: Arc<dyn ColorEngine>) -> Self {
        Self { graph: TransformGraph::new(engine) }
    }

    /// Sets the input encoding.
    pub fn input_encoding(mut self, name: impl Into<String>) -> Self {
        self.graph.set_input_encoding(name);
        self
    }

    /// Sets the workspace color space.
    pub fn workspace(mut self, name: impl Into<String>) -> Self {
        self.graph.set_workspace(name);
        self
    }

    /// Sets the target display.
    pub fn display(mut self, name: impl Into<String>) -> Self {
        self.graph.set_target_display(name);
        self
    }

    /// Sets the target view.
    pub fn view(mut self, name: impl Into<String>) -> Self {
        self.graph.set_target_view(name);
        self
    }

    /// Sets the look string.
    pub fn looks(mut self, looks: impl Into<String>) -> Self {
        self.graph.set_target_looks(Some(looks.into()));
        self
    }

    /// Replaces the grading parameters.
    pub fn grading(mut self, grading: GradingParameters) -> Self {
        self.graph.grading = grading;
        self
    }

    /// Finishes the graph. Nothing is validated here.
    pub fn build(self) -> TransformGraph {
        self.graph
    }
}
