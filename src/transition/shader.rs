//! Transition shaders and their selection.

use std::fmt;
use std::rc::Rc;

use rand::Rng;

use crate::context::GlslType;
use crate::resource::{Attribute, UniformValue};

/// Vertex stage used by shaders that only provide a fragment stage.
pub static DEFAULT_VERTEX_SRC: &str = include_str!("../builtin/default.vert");

/// Declarations shared by transition fragment shaders: `time`, `progress`,
/// `texture1`, `texture2`, `resolution` and the `vUv` varying.
pub static FRAGMENT_COMMON_SRC: &str = include_str!("../builtin/common.frag");

/// A tweakable uniform declared by a transition shader.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UniformDeclaration {
    /// Value fed to the program every frame.
    pub value: f32,
    pub kind: GlslType,
    /// Suggested bounds for editors.
    pub min: Option<f32>,
    pub max: Option<f32>,
}

impl UniformDeclaration {
    /// A float uniform.
    pub fn float(value: f32) -> Self {
        UniformDeclaration {
            value,
            kind: GlslType::Float,
            min: None,
            max: None,
        }
    }

    /// Sets the suggested bounds.
    pub fn range(mut self, min: f32, max: f32) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// The value as fed to the program.
    pub fn to_value(&self) -> UniformValue {
        match self.kind {
            GlslType::Int => UniformValue::Int(self.value as i32),
            GlslType::Bool => UniformValue::Bool(self.value != 0.0),
            _ => UniformValue::Float(self.value),
        }
    }
}

/// Procedural geometry of shaders animating vertices.
#[derive(Clone)]
pub struct GeometrySource {
    /// Builds the attributes from `(detail, offset_top)`.
    pub build: Rc<dyn Fn(f32, f32) -> Vec<(String, Attribute)>>,
    pub detail: f32,
    pub offset_top: f32,
}

impl fmt::Debug for GeometrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometrySource")
            .field("detail", &self.detail)
            .field("offset_top", &self.offset_top)
            .finish_non_exhaustive()
    }
}

/// A transition effect between two slide textures.
///
/// Fragment-only shaders are drawn on a single plane. Shaders with their own
/// vertex stage are drawn twice, once per slide, on their procedural geometry.
#[derive(Clone, Debug)]
pub struct TransitionShader {
    pub name: String,
    pub fragment: String,
    pub vertex: Option<String>,
    pub uniforms: Vec<(String, UniformDeclaration)>,
    pub geometry: Option<GeometrySource>,
}

impl TransitionShader {
    /// A fragment-only transition.
    pub fn new(name: impl Into<String>, fragment: impl Into<String>) -> Self {
        TransitionShader {
            name: name.into(),
            fragment: fragment.into(),
            vertex: None,
            uniforms: Vec::new(),
            geometry: None,
        }
    }

    /// A fragment-only transition whose `body` relies on the common declarations.
    pub fn from_body(name: impl Into<String>, body: &str) -> Self {
        TransitionShader::new(name, format!("{}\n{}", FRAGMENT_COMMON_SRC, body))
    }

    /// Adds a vertex stage and the geometry it animates.
    pub fn with_vertex(mut self, vertex: impl Into<String>, geometry: GeometrySource) -> Self {
        self.vertex = Some(vertex.into());
        self.geometry = Some(geometry);
        self
    }

    /// Declares a uniform.
    pub fn with_uniform(mut self, name: impl Into<String>, declaration: UniformDeclaration) -> Self {
        self.uniforms.push((name.into(), declaration));
        self
    }

    /// Whether this shader has its own vertex stage.
    #[inline]
    pub fn has_vertex(&self) -> bool {
        self.vertex.is_some()
    }

    /// The vertex stage, or the default one.
    pub fn vertex_source(&self) -> &str {
        self.vertex.as_deref().unwrap_or(DEFAULT_VERTEX_SRC)
    }
}

/// Which shader a slider uses.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShaderSelection {
    /// Always the named shader.
    Fixed(String),
    /// A random shader of the library, changed after every transition.
    Random,
    /// A random shader among the named ones, changed after every transition.
    /// In per-slide mode, the shader of slide `i` is the `i`-th name instead.
    Pool(Vec<String>),
}

impl Default for ShaderSelection {
    fn default() -> Self {
        ShaderSelection::Random
    }
}

impl ShaderSelection {
    /// Whether the shader changes at transition boundaries.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, ShaderSelection::Fixed(_))
    }
}

/// The shaders available to a slider.
#[derive(Clone, Debug, Default)]
pub struct ShaderPool {
    shaders: Vec<TransitionShader>,
}

impl ShaderPool {
    pub fn new(shaders: Vec<TransitionShader>) -> Self {
        ShaderPool { shaders }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&TransitionShader> {
        self.shaders.get(index)
    }

    /// Index of the shader called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.shaders.iter().position(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransitionShader> {
        self.shaders.iter()
    }

    /// Picks the shader to use for `slide`.
    ///
    /// Random picks avoid `current` whenever another candidate exists. Per-slide
    /// pools fall back to their first name when `slide` has none.
    ///
    /// # Returns
    /// The index of the selected shader, `None` if nothing matches.
    pub fn select<R: Rng + ?Sized>(
        &self,
        selection: &ShaderSelection,
        per_slide: bool,
        slide: usize,
        current: Option<usize>,
        rng: &mut R,
    ) -> Option<usize> {
        let mut candidates: Vec<usize> = match selection {
            ShaderSelection::Fixed(name) => return self.position(name),
            ShaderSelection::Pool(names) if !names.is_empty() => {
                if per_slide {
                    let name = names.get(slide).or(names.first())?;
                    return self.position(name);
                }
                (0..self.shaders.len())
                    .filter(|i| names.contains(&self.shaders[*i].name))
                    .collect()
            }
            _ => (0..self.shaders.len()).collect(),
        };

        if candidates.len() > 1 {
            if let Some(current) = current {
                candidates.retain(|i| *i != current);
            }
        }

        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rng.random_range(0..candidates.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool() -> ShaderPool {
        ShaderPool::new(vec![
            TransitionShader::new("ripple", "void main() {}"),
            TransitionShader::new("wave-x", "void main() {}"),
            TransitionShader::new("dots", "void main() {}"),
        ])
    }

    #[test]
    fn fixed_selection() {
        let mut rng = StdRng::seed_from_u64(7);
        let selection = ShaderSelection::Fixed("dots".into());
        assert_eq!(pool().select(&selection, false, 0, None, &mut rng), Some(2));
        let selection = ShaderSelection::Fixed("missing".into());
        assert_eq!(pool().select(&selection, false, 0, None, &mut rng), None);
    }

    #[test]
    fn random_selection_avoids_current() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = pool();
        for _ in 0..50 {
            let picked = pool.select(&ShaderSelection::Random, false, 0, Some(1), &mut rng);
            assert!(matches!(picked, Some(0) | Some(2)));
        }
    }

    #[test]
    fn pool_selection_stays_in_pool() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = pool();
        let selection = ShaderSelection::Pool(vec!["dots".into(), "ripple".into()]);
        for _ in 0..50 {
            let picked = pool.select(&selection, false, 0, None, &mut rng);
            assert!(matches!(picked, Some(0) | Some(2)));
        }
        // A single candidate is kept even if current.
        let selection = ShaderSelection::Pool(vec!["dots".into()]);
        assert_eq!(pool.select(&selection, false, 0, Some(2), &mut rng), Some(2));
    }

    #[test]
    fn per_slide_selection() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = pool();
        let selection = ShaderSelection::Pool(vec!["wave-x".into(), "dots".into()]);
        assert_eq!(pool.select(&selection, true, 1, None, &mut rng), Some(2));
        assert_eq!(pool.select(&selection, true, 5, None, &mut rng), Some(1));
    }
}
