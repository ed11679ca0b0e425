//! Node list compiler.
//!
//! [`Engine`] turns [`TransformNode`]s into a [`Processor`]: each node is
//! expanded into ops through the catalog, identity ops are dropped, GLSL is
//! generated and a fingerprint is computed from the structural description.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use grade_core::{
    ColorCatalog, ColorEngine, CompiledProcessor, EngineError, EngineResult, GlslVersion,
    TransformNode,
};

use crate::colorspace::ColorSpace;
use crate::config::Config;
use crate::glsl;
use crate::op::Op;
use crate::processor::Processor;
use crate::role::names;

/// Version tag mixed into every fingerprint.
const FINGERPRINT_TAG: &str = "grade-ocio/1";

/// Shader generation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// GLSL dialect.
    pub language: GlslVersion,
    /// Name of the generated entry function.
    pub function_name: String,
    /// Prefix of every generated uniform and texture name.
    pub resource_prefix: String,
    /// Widest 1D texture; longer tables wrap onto rows of a 2D texture.
    pub max_texture_width: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            language: GlslVersion::Glsl400,
            function_name: "OCIOMain".to_string(),
            resource_prefix: "ocio_".to_string(),
            max_texture_width: 4096,
        }
    }
}

impl EngineOptions {
    /// Sets the GLSL dialect.
    pub fn with_language(mut self, language: GlslVersion) -> Self {
        self.language = language;
        self
    }

    /// Sets the widest 1D texture.
    pub fn with_max_texture_width(mut self, width: u32) -> Self {
        self.max_texture_width = width;
        self
    }
}

/// The reference color engine.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Config,
    options: EngineOptions,
}

impl Engine {
    /// Engine over a catalog with default options.
    pub fn new(config: Config) -> Self {
        Self { config, options: EngineOptions::default() }
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// The catalog.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shader options.
    #[inline]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Compile into the concrete processor type.
    pub fn build(&self, nodes: &[TransformNode]) -> EngineResult<Processor> {
        let mut ops = Vec::new();
        for node in nodes {
            self.expand(node, &mut ops)?;
        }
        ops.retain(|op| !op.is_identity());

        let shader = glsl::generate(&ops, &self.options).map_err(|_| EngineError::InvalidTransform {
            reason: "failed to format shader text".to_string(),
        })?;
        let fingerprint = self.fingerprint(nodes, &ops);
        debug!(
            nodes = nodes.len(),
            ops = ops.len(),
            textures = shader.texture_count(),
            uniforms = shader.uniforms.len(),
            fingerprint = %fingerprint,
            "compiled processor"
        );
        Ok(Processor::new(ops, fingerprint, shader))
    }

    fn resolve(&self, name: &str) -> EngineResult<&ColorSpace> {
        self.config
            .colorspace(name)
            .ok_or_else(|| EngineError::ColorSpaceNotFound { name: name.to_string() })
    }

    fn expand(&self, node: &TransformNode, ops: &mut Vec<Op>) -> EngineResult<()> {
        match node {
            TransformNode::ColorspaceConversion { src, dst } => self.conversion(src, dst, ops),
            TransformNode::GradingPrimary { primary, dynamic } => {
                ops.push(Op::GradingPrimary { primary: *primary, dynamic: *dynamic });
                Ok(())
            }
            TransformNode::Exposure { value, dynamic } => {
                ops.push(Op::Exposure { ev: *value, dynamic: *dynamic });
                Ok(())
            }
            TransformNode::Gamma { value, pivot, dynamic } => {
                ops.push(Op::Gamma { value: *value, pivot: *pivot, dynamic: *dynamic });
                Ok(())
            }
            TransformNode::LookApplication { src, dst, looks } => {
                let mut current = self.resolve(src)?.name();
                for spec in looks {
                    let look = self
                        .config
                        .look(&spec.name)
                        .ok_or_else(|| EngineError::LookNotFound { name: spec.name.clone() })?;
                    let look_ops = look
                        .ops(spec.forward)
                        .ok_or_else(|| EngineError::LookNotInvertible { name: look.name().to_string() })?;
                    let process = self.resolve(look.get_process_space().unwrap_or(names::SCENE_LINEAR))?;
                    self.conversion(current, process.name(), ops)?;
                    ops.extend(look_ops.iter().cloned());
                    current = process.name();
                }
                self.conversion(current, dst, ops)
            }
            TransformNode::DisplayRender { src, display, view } => {
                let d = self
                    .config
                    .display(display)
                    .ok_or_else(|| EngineError::DisplayNotFound { name: display.clone() })?;
                let v = d.view(view).ok_or_else(|| EngineError::ViewNotFound {
                    display: display.clone(),
                    view: view.clone(),
                })?;
                self.conversion(src, v.colorspace(), ops)
            }
        }
    }

    /// Ops converting `src` to `dst` through the reference space.
    ///
    /// Conversions touching a data space are skipped.
    fn conversion(&self, src: &str, dst: &str, ops: &mut Vec<Op>) -> EngineResult<()> {
        let src = self.resolve(src)?;
        let dst = self.resolve(dst)?;
        if src.name() == dst.name() || src.is_data() || dst.is_data() {
            return Ok(());
        }
        if let Some(to_ref) = src.to_reference() {
            ops.extend(to_ref.iter().cloned());
        }
        if let Some(from_ref) = dst.from_reference() {
            ops.extend(from_ref.iter().cloned());
        }
        Ok(())
    }

    fn fingerprint(&self, nodes: &[TransformNode], ops: &[Op]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_TAG.as_bytes());
        hasher.update(
            format!(
                "\n{:?}|{}|{}|{}\n",
                self.options.language,
                self.options.function_name,
                self.options.resource_prefix,
                self.options.max_texture_width
            )
            .as_bytes(),
        );
        for node in nodes {
            hasher.update(node.signature().as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(b"--\n");
        for op in ops {
            hasher.update(op.describe().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

impl ColorCatalog for Engine {
    fn colorspace_exists(&self, name: &str) -> bool {
        self.config.colorspace_exists(name)
    }

    fn displays(&self) -> Vec<String> {
        self.config.displays()
    }

    fn views_for_display(&self, display: &str) -> Vec<String> {
        self.config.views_for_display(display)
    }
}

impl ColorEngine for Engine {
    fn compile(&self, nodes: &[TransformNode]) -> EngineResult<Box<dyn CompiledProcessor>> {
        Ok(Box::new(self.build(nodes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use grade_core::{GradingPrimary, GradingSpace, LookSpec};

    fn engine() -> Engine {
        Engine::new(builtin::studio())
    }

    fn display(view: &str) -> TransformNode {
        TransformNode::DisplayRender { src: "scene_linear".into(), display: "sRGB".into(), view: view.into() }
    }

    #[test]
    fn same_space_is_noop() {
        let p = engine()
            .build(&[TransformNode::ColorspaceConversion {
                src: "scene_linear".into(),
                dst: "Linear Rec.709".into(),
            }])
            .unwrap();
        assert!(p.is_noop());
    }

    #[test]
    fn raw_view_is_noop() {
        let p = engine().build(&[display("Raw")]).unwrap();
        assert!(p.is_noop());
    }

    #[test]
    fn standard_view_encodes_srgb() {
        let p = engine().build(&[display("Standard")]).unwrap();
        let mut px = [[0.18_f32, 1.5, -0.2]];
        p.apply_rgb(&mut px);
        assert!((px[0][0] - 0.461356).abs() < 1e-4, "got {}", px[0][0]);
        assert!((px[0][1] - 1.0).abs() < 1e-5, "got {}", px[0][1]);
        assert_eq!(px[0][2], 0.0);
    }

    #[test]
    fn missing_names_are_reported() {
        let e = engine();
        let err = e.build(&[TransformNode::DisplayRender {
            src: "scene_linear".into(),
            display: "Nope".into(),
            view: "Raw".into(),
        }]);
        assert!(matches!(err, Err(EngineError::DisplayNotFound { .. })));

        let err = e.build(&[display("Nope")]);
        assert!(matches!(err, Err(EngineError::ViewNotFound { .. })));

        let err = e.build(&[TransformNode::ColorspaceConversion { src: "Nope".into(), dst: "Raw".into() }]);
        assert!(matches!(err, Err(EngineError::ColorSpaceNotFound { .. })));
    }

    #[test]
    fn looks_resolve_direction() {
        let e = engine();
        let look = |spec: LookSpec| TransformNode::LookApplication {
            src: "scene_linear".into(),
            dst: "scene_linear".into(),
            looks: vec![spec],
        };
        assert!(e.build(&[look(LookSpec::forward("Punchy"))]).is_ok());
        assert!(e.build(&[look(LookSpec::inverse("Warm"))]).is_ok());
        assert!(matches!(
            e.build(&[look(LookSpec::inverse("Punchy"))]),
            Err(EngineError::LookNotInvertible { .. })
        ));
        assert!(matches!(
            e.build(&[look(LookSpec::forward("Nope"))]),
            Err(EngineError::LookNotFound { .. })
        ));
    }

    #[test]
    fn warm_look_roundtrips() {
        let e = engine();
        let p = e
            .build(&[TransformNode::LookApplication {
                src: "scene_linear".into(),
                dst: "scene_linear".into(),
                looks: vec![LookSpec::forward("Warm"), LookSpec::inverse("Warm")],
            }])
            .unwrap();
        let mut px = [[0.3_f32, 0.2, 0.1]];
        p.apply_rgb(&mut px);
        assert!((px[0][0] - 0.3).abs() < 1e-4, "got {}", px[0][0]);
        assert!((px[0][2] - 0.1).abs() < 1e-4, "got {}", px[0][2]);
    }

    #[test]
    fn fingerprint_masks_dynamic_values() {
        let e = engine();
        let nodes = |ev: f32, sat: f32| {
            let primary = GradingPrimary { saturation: sat, ..GradingPrimary::identity(GradingSpace::Linear) };
            vec![
                TransformNode::GradingPrimary { primary, dynamic: true },
                TransformNode::Exposure { value: ev, dynamic: true },
                display("Filmic"),
            ]
        };
        let a = e.build(&nodes(0.0, 1.0)).unwrap();
        let b = e.build(&nodes(2.0, 0.3)).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let c = e.build(&[display("Filmic")]).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn fingerprint_depends_on_options() {
        let nodes = [display("Filmic")];
        let a = engine().build(&nodes).unwrap();
        let b = engine()
            .with_options(EngineOptions::default().with_max_texture_width(1024))
            .build(&nodes)
            .unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert!(a.shader().textures[0].is_1d());
        assert!(!b.shader().textures[0].is_1d());
    }

    #[test]
    fn dynamic_updates_reach_cpu_path() {
        let e = engine();
        let mut p: Box<dyn CompiledProcessor> =
            e.compile(&[TransformNode::Exposure { value: 0.0, dynamic: true }]).unwrap();
        p.set_dynamic(&grade_core::DynamicProperty::Exposure(1.0));
        let mut px = [[0.25_f32, 0.5, 1.0, 0.7]];
        p.apply_rgba(&mut px);
        assert_eq!(px[0], [0.5, 1.0, 2.0, 0.7]);
    }
}
