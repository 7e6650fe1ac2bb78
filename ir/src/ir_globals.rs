use crate::*;
use rpl_text::SourceLocation;
use serde::{Deserialize, Serialize};

/// Id to a resolved buffer
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct BufferId(pub u32);

/// Id to a resolved sampler
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct SamplerId(pub u32);

/// An active pipeline setting
#[derive(PartialEq, Debug, Clone)]
pub struct Setting {
    pub name: String,
    pub value: SettingValue,
    pub location: SourceLocation,
}

/// A resolved struct field, buffer field, or function argument
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub type_ref: TypeRef,

    /// Byte offset inside the owning struct or buffer
    pub offset: u32,

    pub layout: Layout,
    pub meta: Vec<String>,
    pub location: SourceLocation,
}

/// A resolved struct
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Struct {
    pub name: String,
    pub fields: Vec<Declaration>,
    pub size: u32,
    pub alignment: u32,
    pub location: SourceLocation,
}

impl Struct {
    /// Find a field by name
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A resolved buffer
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Buffer {
    pub name: String,
    pub kind: BufferKind,
    pub fields: Vec<Declaration>,
    pub size: u32,
    pub alignment: u32,

    /// External binding slot, stage output buffers have none
    pub binding: Option<u32>,

    /// Leaf declarations for attribute and stage output buffers
    pub flattening: Option<FlatteningGraph>,

    /// Set when any resolved function accesses the buffer
    pub used: bool,

    pub location: SourceLocation,
}

impl Buffer {
    /// Find a field by name
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Tree mirroring the field nesting of a flattened buffer
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct FlatteningGraph {
    /// Nodes for the top level fields of the buffer
    pub nodes: Vec<FlatteningNode>,

    /// Every leaf declaration in location order
    pub leaves: Vec<FlattenedDeclaration>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct FlatteningNode {
    pub name: String,
    pub kind: FlatteningNodeKind,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum FlatteningNodeKind {
    /// Field with a struct type
    Struct(Vec<FlatteningNode>),

    /// Field with a vector or matrix type, covering a range of leaves
    Leaf {
        type_ref: TypeRef,
        first: u32,
        count: u32,
    },
}

impl FlatteningGraph {
    /// Walk a path of field names through the graph
    ///
    /// Returns the node at the end of the path and the number of path entries consumed.
    /// Stops early when a leaf is reached.
    pub fn walk<'g, 'p>(
        &'g self,
        path: impl IntoIterator<Item = &'p str>,
    ) -> Result<(&'g FlatteningNode, usize), FlatteningWalkError> {
        let mut nodes = &self.nodes;
        let mut consumed = 0;
        let mut current = None;
        for name in path {
            let node = match nodes.iter().find(|n| n.name == name) {
                Some(node) => node,
                None => return Err(FlatteningWalkError::UnknownField(name.to_string())),
            };
            consumed += 1;
            current = Some(node);
            match &node.kind {
                FlatteningNodeKind::Struct(children) => nodes = children,
                FlatteningNodeKind::Leaf { .. } => return Ok((node, consumed)),
            }
        }
        match current {
            Some(node) => Err(FlatteningWalkError::NotALeaf(node.name.clone())),
            None => Err(FlatteningWalkError::EmptyPath),
        }
    }

    /// Leaves in a range
    pub fn get_leaves(&self, first: u32, count: u32) -> &[FlattenedDeclaration] {
        &self.leaves[first as usize..(first + count) as usize]
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum FlatteningWalkError {
    EmptyPath,
    UnknownField(String),
    NotALeaf(String),
}

/// Maximum byte length of a generated leaf name
pub const FLATTENED_NAME_MAX: usize = 64;

/// A single individually bound value inside a flattened buffer
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct FlattenedDeclaration {
    /// Dotted path from the buffer
    pub readable_name: String,

    /// Vector or matrix type, arrays are only present for vertex stage outputs
    pub type_ref: TypeRef,

    /// Location slot of the first column or element
    pub location: u32,

    /// Byte offset from the start of the buffer
    pub offset: u32,

    pub meta: Vec<String>,
}

impl FlattenedDeclaration {
    /// Number of location slots the declaration consumes
    pub fn location_count(&self) -> u32 {
        let per_element = match self.type_ref.base {
            BaseType::Matrix(id) => id.get().columns,
            _ => 1,
        };
        per_element * self.type_ref.element_count()
    }
}

/// A resolved sampler
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Sampler {
    pub name: String,
    pub kind: SamplerKind,
    pub settings: SamplerSettings,
    pub binding: u32,
    pub used: bool,
    pub location: SourceLocation,
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerFilter {
    Nearest,
    Linear,
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerAddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Filtering and addressing state of a sampler
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplerSettings {
    pub mag_filter: SamplerFilter,
    pub min_filter: SamplerFilter,
    pub mipmap_mode: SamplerFilter,
    pub address_u: SamplerAddressMode,
    pub address_v: SamplerAddressMode,
    pub address_w: SamplerAddressMode,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        SamplerSettings {
            mag_filter: SamplerFilter::Linear,
            min_filter: SamplerFilter::Linear,
            mipmap_mode: SamplerFilter::Linear,
            address_u: SamplerAddressMode::Repeat,
            address_v: SamplerAddressMode::Repeat,
            address_w: SamplerAddressMode::Repeat,
        }
    }
}

/// Sampler setting names
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum SamplerSettingKey {
    MagFilter,
    MinFilter,
    MipmapMode,
    AddressU,
    AddressV,
    AddressW,
}

const SAMPLER_SETTING_KEYS: [(&str, SamplerSettingKey); 6] = [
    ("mag_filter", SamplerSettingKey::MagFilter),
    ("min_filter", SamplerSettingKey::MinFilter),
    ("mipmap_mode", SamplerSettingKey::MipmapMode),
    ("address_u", SamplerSettingKey::AddressU),
    ("address_v", SamplerSettingKey::AddressV),
    ("address_w", SamplerSettingKey::AddressW),
];

const FILTER_VALUES: [(&str, SamplerFilter); 2] = [
    ("nearest", SamplerFilter::Nearest),
    ("linear", SamplerFilter::Linear),
];

const ADDRESS_VALUES: [(&str, SamplerAddressMode); 4] = [
    ("repeat", SamplerAddressMode::Repeat),
    ("mirrored_repeat", SamplerAddressMode::MirroredRepeat),
    ("clamp_to_edge", SamplerAddressMode::ClampToEdge),
    ("clamp_to_border", SamplerAddressMode::ClampToBorder),
];

impl SamplerSettingKey {
    /// Find a setting key by name
    pub fn from_name(name: &str) -> Option<SamplerSettingKey> {
        SAMPLER_SETTING_KEYS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, key)| *key)
    }
}

impl SamplerSettings {
    /// Apply a string setting value
    ///
    /// Returns `false` if the value is not valid for the key.
    pub fn apply(&mut self, key: SamplerSettingKey, value: &str) -> bool {
        let filter = FILTER_VALUES
            .iter()
            .find(|(n, _)| *n == value)
            .map(|(_, v)| *v);
        let address = ADDRESS_VALUES
            .iter()
            .find(|(n, _)| *n == value)
            .map(|(_, v)| *v);
        match (key, filter, address) {
            (SamplerSettingKey::MagFilter, Some(f), _) => self.mag_filter = f,
            (SamplerSettingKey::MinFilter, Some(f), _) => self.min_filter = f,
            (SamplerSettingKey::MipmapMode, Some(f), _) => self.mipmap_mode = f,
            (SamplerSettingKey::AddressU, _, Some(a)) => self.address_u = a,
            (SamplerSettingKey::AddressV, _, Some(a)) => self.address_v = a,
            (SamplerSettingKey::AddressW, _, Some(a)) => self.address_w = a,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, first: u32) -> FlatteningNode {
        FlatteningNode {
            name: name.to_string(),
            kind: FlatteningNodeKind::Leaf {
                type_ref: TypeRef::vector(F4),
                first,
                count: 1,
            },
        }
    }

    #[test]
    fn check_flattening_walk() {
        let graph = FlatteningGraph {
            nodes: vec![
                leaf("position", 0),
                FlatteningNode {
                    name: "material".to_string(),
                    kind: FlatteningNodeKind::Struct(vec![leaf("color", 1), leaf("uv", 2)]),
                },
            ],
            leaves: Vec::new(),
        };

        let (node, consumed) = graph.walk(["position", "_0"]).unwrap();
        assert_eq!((node.name.as_str(), consumed), ("position", 1));

        let (node, consumed) = graph.walk(["material", "uv"]).unwrap();
        assert_eq!((node.name.as_str(), consumed), ("uv", 2));

        assert_eq!(
            graph.walk(["material"]),
            Err(FlatteningWalkError::NotALeaf("material".to_string()))
        );
        assert_eq!(
            graph.walk(["material", "normal"]),
            Err(FlatteningWalkError::UnknownField("normal".to_string()))
        );
    }

    #[test]
    fn check_sampler_settings() {
        let mut settings = SamplerSettings::default();
        assert!(settings.apply(SamplerSettingKey::MagFilter, "nearest"));
        assert!(settings.apply(SamplerSettingKey::AddressV, "clamp_to_edge"));
        assert!(!settings.apply(SamplerSettingKey::MinFilter, "repeat"));
        assert!(!settings.apply(SamplerSettingKey::AddressW, "linear"));
        assert_eq!(settings.mag_filter, SamplerFilter::Nearest);
        assert_eq!(settings.min_filter, SamplerFilter::Linear);
        assert_eq!(settings.address_v, SamplerAddressMode::ClampToEdge);
        assert_eq!(SamplerSettingKey::from_name("lod_bias"), None);
    }
}
