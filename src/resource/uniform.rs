//! Typed uniform values and their lookup paths.

use std::collections::HashMap;

use glamx::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::renderer::UniformCacheEntry;
use crate::resource::TextureRef;

/// A value that can be fed to a shader uniform.
#[derive(Clone, Debug)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
    /// Flat float array, for `float[]`, `vecN[]` and `matN[]` uniforms.
    Floats(Vec<f32>),
    /// Flat integer array.
    Ints(Vec<i32>),
    /// A texture, bound to the next free texture unit when the program is used.
    Texture(TextureRef),
    /// A sampler array, bound to consecutive texture units.
    Textures(Vec<TextureRef>),
    /// Members of a GLSL struct uniform.
    Struct(Uniforms),
    /// Elements of a GLSL struct array uniform.
    StructArray(Vec<Uniforms>),
}

impl UniformValue {
    /// The value as a float, when it is a scalar.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            UniformValue::Float(v) => Some(*v),
            UniformValue::Int(v) => Some(*v as f32),
            UniformValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// The texture this value references, if any.
    pub fn as_texture(&self) -> Option<&TextureRef> {
        match self {
            UniformValue::Texture(t) => Some(t),
            _ => None,
        }
    }

    /// Flattens the value into the payload cached per uniform location.
    ///
    /// Returns `None` for textures and structs, which are never uploaded as-is.
    pub(crate) fn to_cache_entry(&self, integer: bool) -> Option<UniformCacheEntry> {
        let floats: Vec<f32> = match self {
            UniformValue::Float(v) => vec![*v],
            UniformValue::Int(v) => vec![*v as f32],
            UniformValue::Bool(v) => vec![if *v { 1.0 } else { 0.0 }],
            UniformValue::Vec2(v) => v.to_array().to_vec(),
            UniformValue::Vec3(v) => v.to_array().to_vec(),
            UniformValue::Vec4(v) => v.to_array().to_vec(),
            UniformValue::Mat2(m) => m.to_cols_array().to_vec(),
            UniformValue::Mat3(m) => m.to_cols_array().to_vec(),
            UniformValue::Mat4(m) => m.to_cols_array().to_vec(),
            UniformValue::Floats(v) => v.clone(),
            UniformValue::Ints(v) => {
                return Some(if integer {
                    UniformCacheEntry::Ints(v.clone())
                } else {
                    UniformCacheEntry::Floats(v.iter().map(|i| *i as f32).collect())
                });
            }
            UniformValue::Texture(_)
            | UniformValue::Textures(_)
            | UniformValue::Struct(_)
            | UniformValue::StructArray(_) => return None,
        };

        Some(if integer {
            UniformCacheEntry::Ints(floats.into_iter().map(|f| f as i32).collect())
        } else {
            UniformCacheEntry::Floats(floats)
        })
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(v: $ty) -> Self {
                    UniformValue::$variant(v)
                }
            }
        )*
    };
}

impl_from!(
    f32 => Float,
    i32 => Int,
    bool => Bool,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    Mat2 => Mat2,
    Mat3 => Mat3,
    Mat4 => Mat4,
    Vec<f32> => Floats,
    Vec<i32> => Ints,
    TextureRef => Texture,
    Vec<TextureRef> => Textures,
    Uniforms => Struct,
    Vec<Uniforms> => StructArray,
);

/// A named set of uniform values.
#[derive(Clone, Debug, Default)]
pub struct Uniforms {
    values: HashMap<String, UniformValue>,
}

impl Uniforms {
    /// An empty set.
    pub fn new() -> Self {
        Uniforms::default()
    }

    /// Sets (or replaces) a value, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets (or replaces) a value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        let _ = self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut UniformValue> {
        self.values.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<UniformValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Scalar value of `name`, if set and scalar.
    pub fn f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(UniformValue::as_f32)
    }

    /// Texture referenced by `name`, if any.
    pub fn texture(&self, name: &str) -> Option<&TextureRef> {
        self.get(name).and_then(UniformValue::as_texture)
    }

    /// Iterates over all values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &UniformValue)> {
        self.values.iter()
    }

    /// Looks up the value addressed by a pre-resolved uniform path.
    pub fn resolve(&self, path: &UniformPath) -> Option<&UniformValue> {
        match path {
            UniformPath::Plain(name) => self.get(name),
            UniformPath::Member { name, member } => match self.get(name)? {
                UniformValue::Struct(fields) => fields.get(member),
                _ => None,
            },
            UniformPath::Element {
                name,
                index,
                member,
            } => match self.get(name)? {
                UniformValue::StructArray(elements) => elements.get(*index)?.get(member),
                _ => None,
            },
        }
    }
}

/// Where the value of an active uniform lives in a [`Uniforms`] map.
///
/// Computed once when a program is linked.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UniformPath {
    /// `name`, or `name[0]` for plain arrays.
    Plain(String),
    /// `name.member`
    Member { name: String, member: String },
    /// `name[index].member`
    Element {
        name: String,
        index: usize,
        member: String,
    },
}

impl UniformPath {
    /// Parses a uniform name as reported by the driver.
    ///
    /// Only the first nesting level is addressable: deeper names resolve on their
    /// outermost struct and innermost member.
    pub fn parse(full_name: &str) -> UniformPath {
        let parts: Vec<&str> = full_name
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|p| !p.is_empty())
            .collect();

        match parts.as_slice() {
            [] => UniformPath::Plain(full_name.to_string()),
            [name] => UniformPath::Plain(name.to_string()),
            [name, second] => match second.parse::<usize>() {
                Ok(_) => UniformPath::Plain(name.to_string()),
                Err(_) => UniformPath::Member {
                    name: name.to_string(),
                    member: second.to_string(),
                },
            },
            [name, second, .., last] => match second.parse::<usize>() {
                Ok(index) => UniformPath::Element {
                    name: name.to_string(),
                    index,
                    member: last.to_string(),
                },
                Err(_) => UniformPath::Member {
                    name: name.to_string(),
                    member: last.to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uniform_names() {
        assert_eq!(
            UniformPath::parse("progress"),
            UniformPath::Plain("progress".into())
        );
        assert_eq!(
            UniformPath::parse("weights[0]"),
            UniformPath::Plain("weights".into())
        );
        assert_eq!(
            UniformPath::parse("sun.color"),
            UniformPath::Member {
                name: "sun".into(),
                member: "color".into()
            }
        );
        assert_eq!(
            UniformPath::parse("lamps[1].power"),
            UniformPath::Element {
                name: "lamps".into(),
                index: 1,
                member: "power".into()
            }
        );
    }

    #[test]
    fn resolves_nested_values() {
        let uniforms = Uniforms::new()
            .with("progress", 0.25_f32)
            .with("sun", Uniforms::new().with("power", 2.0_f32))
            .with(
                "lamps",
                vec![Uniforms::new(), Uniforms::new().with("power", 5.0_f32)],
            );

        let value = |name: &str| uniforms.resolve(&UniformPath::parse(name)).and_then(UniformValue::as_f32);
        assert_eq!(value("progress"), Some(0.25));
        assert_eq!(value("sun.power"), Some(2.0));
        assert_eq!(value("lamps[1].power"), Some(5.0));
        assert_eq!(value("lamps[0].power"), None);
        assert_eq!(value("missing"), None);
    }

    #[test]
    fn integer_flattening() {
        let entry = UniformValue::Bool(true).to_cache_entry(true);
        assert_eq!(entry, Some(UniformCacheEntry::Ints(vec![1])));
        let entry = UniformValue::Vec2(Vec2::new(1.0, 2.0)).to_cache_entry(false);
        assert_eq!(entry, Some(UniformCacheEntry::Floats(vec![1.0, 2.0])));
    }
}
