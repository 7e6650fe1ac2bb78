//! Projection of a [CompilerInstance] into the description consumed by the pipeline management layer
//!
//! The output holds no references into the instance so the instance may be dropped after emission.

use crate::*;
use rpl_text::{CompileError, MessagePrinter, Severity, SourceLocation};
use serde::{Deserialize, Serialize};

/// Variable types that can be described to the pipeline management layer
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MetaVariableType {
    F1,
    F2,
    F3,
    F4,
    I1,
    I2,
    I3,
    I4,
    F3X3,
    F4X4,
}

impl MetaVariableType {
    /// Map a built-in type to its metadata type
    pub fn from_base(base: BaseType) -> Option<MetaVariableType> {
        match base {
            BaseType::Vector(F1) => Some(MetaVariableType::F1),
            BaseType::Vector(F2) => Some(MetaVariableType::F2),
            BaseType::Vector(F3) => Some(MetaVariableType::F3),
            BaseType::Vector(F4) => Some(MetaVariableType::F4),
            BaseType::Vector(I1) => Some(MetaVariableType::I1),
            BaseType::Vector(I2) => Some(MetaVariableType::I2),
            BaseType::Vector(I3) => Some(MetaVariableType::I3),
            BaseType::Vector(I4) => Some(MetaVariableType::I4),
            BaseType::Matrix(F3X3) => Some(MetaVariableType::F3X3),
            BaseType::Matrix(F4X4) => Some(MetaVariableType::F4X4),
            _ => None,
        }
    }
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolygonMode {
    Fill,
    Wireframe,
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullMode {
    None,
    Back,
    Front,
}

/// Fixed function state of the pipeline
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub fragment_output_count: u32,
}

impl Default for PipelineMetadata {
    fn default() -> Self {
        PipelineMetadata {
            polygon_mode: PolygonMode::Fill,
            cull_mode: CullMode::None,
            depth_test: false,
            depth_write: false,
            fragment_output_count: 0,
        }
    }
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaBufferKind {
    VertexAttribute,
    InstancedAttribute,
    Uniform,
    ReadOnlyStorage,
    InstancedUniform,
    InstancedReadOnlyStorage,
}

/// A single vertex input of an attribute buffer
#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct AttributeMetadata {
    pub name: String,
    pub location: u32,
    pub offset: u32,
    pub variable_type: MetaVariableType,
}

/// A single value inside a uniform or storage buffer
#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct ParameterMetadata {
    /// Dotted path from the buffer
    pub name: String,

    /// Byte offset from the start of the buffer
    pub offset: u32,

    pub variable_type: MetaVariableType,

    /// Number of elements across all array dimensions
    pub total_count: u32,

    pub meta: Vec<String>,
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferContents {
    Attributes(Vec<AttributeMetadata>),
    Parameters(Vec<ParameterMetadata>),
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct BufferMetadata {
    pub name: String,
    pub binding: u32,
    pub kind: MetaBufferKind,
    pub size: u32,
    pub contents: BufferContents,
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct SamplerMetadata {
    pub name: String,
    pub binding: u32,
    pub kind: MetaSamplerKind,
    pub settings: SamplerSettings,
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaSamplerKind {
    Sampler2d,
}

/// Description of a compiled shader family
#[derive(PartialEq, Eq, Hash, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub pipeline: PipelineMetadata,
    pub buffers: Vec<BufferMetadata>,
    pub samplers: Vec<SamplerMetadata>,
}

/// Failures when projecting an instance to metadata
#[derive(PartialEq, Eq, Debug, Clone, thiserror::Error)]
pub enum MetadataError {
    #[error("unknown pipeline setting '{0}'")]
    UnknownPipelineSetting(String, SourceLocation),

    #[error("invalid value for pipeline setting '{0}'")]
    InvalidPipelineSettingValue(String, SourceLocation),

    #[error("'{0}' has a type that can not be described in metadata")]
    UnsupportedVariableType(String, SourceLocation),

    #[error("buffer '{0}' has no binding")]
    MissingBinding(String, SourceLocation),
}

impl MetadataError {
    pub fn location(&self) -> SourceLocation {
        match self {
            MetadataError::UnknownPipelineSetting(_, loc)
            | MetadataError::InvalidPipelineSettingValue(_, loc)
            | MetadataError::UnsupportedVariableType(_, loc)
            | MetadataError::MissingBinding(_, loc) => *loc,
        }
    }
}

impl CompileError for MetadataError {
    fn print(&self, w: &mut MessagePrinter) -> std::fmt::Result {
        w.write_message(&|f| write!(f, "{}", self), self.location(), Severity::Error)
    }
}

/// Build the metadata description of an instance
pub fn emit_metadata(instance: &CompilerInstance) -> Result<Metadata, MetadataError> {
    let mut metadata = Metadata {
        pipeline: emit_pipeline(instance)?,
        ..Default::default()
    };

    for buffer in &instance.buffers {
        let kind = match buffer.kind {
            BufferKind::VertexAttribute => MetaBufferKind::VertexAttribute,
            BufferKind::InstancedAttribute => MetaBufferKind::InstancedAttribute,
            BufferKind::Uniform => MetaBufferKind::Uniform,
            BufferKind::ReadOnlyStorage => MetaBufferKind::ReadOnlyStorage,
            BufferKind::InstancedUniform => MetaBufferKind::InstancedUniform,
            BufferKind::InstancedReadOnlyStorage => MetaBufferKind::InstancedReadOnlyStorage,
            BufferKind::VertexStageOutput => continue,
            BufferKind::FragmentStageOutput => {
                if let Some(graph) = &buffer.flattening {
                    metadata.pipeline.fragment_output_count += graph.leaves.len() as u32;
                }
                continue;
            }
        };

        let binding = match buffer.binding {
            Some(binding) => binding,
            None => {
                return Err(MetadataError::MissingBinding(
                    buffer.name.clone(),
                    buffer.location,
                ))
            }
        };

        let contents = match &buffer.flattening {
            Some(graph) => BufferContents::Attributes(emit_attributes(graph, buffer.location)?),
            None => {
                let mut parameters = Vec::new();
                emit_parameters(instance, &buffer.fields, "", 0, &mut parameters)?;
                BufferContents::Parameters(parameters)
            }
        };

        metadata.buffers.push(BufferMetadata {
            name: buffer.name.clone(),
            binding,
            kind,
            size: buffer.size,
            contents,
        });
    }

    for sampler in &instance.samplers {
        metadata.samplers.push(SamplerMetadata {
            name: sampler.name.clone(),
            binding: sampler.binding,
            kind: match sampler.kind {
                SamplerKind::Sampler2d => MetaSamplerKind::Sampler2d,
            },
            settings: sampler.settings,
        });
    }

    log::debug!(
        "emitted metadata for {} buffers and {} samplers",
        metadata.buffers.len(),
        metadata.samplers.len()
    );

    Ok(metadata)
}

fn emit_pipeline(instance: &CompilerInstance) -> Result<PipelineMetadata, MetadataError> {
    let mut pipeline = PipelineMetadata::default();
    for setting in &instance.settings {
        let invalid =
            || MetadataError::InvalidPipelineSettingValue(setting.name.clone(), setting.location);
        match (setting.name.as_str(), &setting.value) {
            ("polygon_mode", SettingValue::String(value)) => {
                pipeline.polygon_mode = match value.as_str() {
                    "fill" => PolygonMode::Fill,
                    "wireframe" => PolygonMode::Wireframe,
                    _ => return Err(invalid()),
                }
            }
            ("cull_mode", SettingValue::String(value)) => {
                pipeline.cull_mode = match value.as_str() {
                    "none" => CullMode::None,
                    "back" => CullMode::Back,
                    "front" => CullMode::Front,
                    _ => return Err(invalid()),
                }
            }
            ("depth_test", SettingValue::Flag(value)) => pipeline.depth_test = *value,
            ("depth_write", SettingValue::Flag(value)) => pipeline.depth_write = *value,
            ("polygon_mode" | "cull_mode" | "depth_test" | "depth_write", _) => {
                return Err(invalid())
            }
            _ => {
                return Err(MetadataError::UnknownPipelineSetting(
                    setting.name.clone(),
                    setting.location,
                ))
            }
        }
    }
    Ok(pipeline)
}

fn emit_attributes(
    graph: &FlatteningGraph,
    location: SourceLocation,
) -> Result<Vec<AttributeMetadata>, MetadataError> {
    graph
        .leaves
        .iter()
        .map(|leaf| {
            let variable_type = MetaVariableType::from_base(leaf.type_ref.base).ok_or_else(|| {
                MetadataError::UnsupportedVariableType(leaf.readable_name.clone(), location)
            })?;
            Ok(AttributeMetadata {
                name: leaf.readable_name.clone(),
                location: leaf.location,
                offset: leaf.offset,
                variable_type,
            })
        })
        .collect()
}

fn emit_parameters(
    instance: &CompilerInstance,
    fields: &[Declaration],
    prefix: &str,
    base_offset: u32,
    output: &mut Vec<ParameterMetadata>,
) -> Result<(), MetadataError> {
    for field in fields {
        let name = format!("{}{}", prefix, field.name);
        let offset = base_offset + field.offset;
        match field.type_ref.base {
            BaseType::Struct(id) => {
                let sd = instance.get_struct(id);
                if field.type_ref.is_array() {
                    let stride = field.type_ref.base.layout(&instance.structs).stride();
                    for element in 0..field.type_ref.element_count() {
                        let element_name =
                            format!("{}[{}].", name, element_path(&field.type_ref, element));
                        emit_parameters(
                            instance,
                            &sd.fields,
                            &element_name,
                            offset + element * stride,
                            output,
                        )?;
                    }
                } else {
                    emit_parameters(instance, &sd.fields, &(name + "."), offset, output)?;
                }
            }
            base => {
                let variable_type = MetaVariableType::from_base(base).ok_or_else(|| {
                    MetadataError::UnsupportedVariableType(name.clone(), field.location)
                })?;
                output.push(ParameterMetadata {
                    name,
                    offset,
                    variable_type,
                    total_count: field.type_ref.element_count(),
                    meta: field.meta.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Format a flat element index as per dimension indices
fn element_path(type_ref: &TypeRef, mut element: u32) -> String {
    let mut indices = vec![0; type_ref.array_sizes.len()];
    for (index, size) in indices.iter_mut().zip(&type_ref.array_sizes).rev() {
        *index = element % size;
        element /= size;
    }
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("][")
}
