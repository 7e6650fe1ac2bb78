use super::errors::*;
use super::Generator;
use bumpalo::collections::Vec as BumpVec;
use rpl_ir as ir;
use rpl_ir::{BufferKind, GlobalAccess, IntrinsicAccess, Stage};
use rspirv::dr::Operand;
use rspirv::spirv::{self, BuiltIn, Decoration, StorageClass, Word};

/// Descriptor set for buffers and samplers that keep their binding across instances
const STABLE_DESCRIPTOR_SET: u32 = 0;

/// Descriptor set for buffers indexed by the instance index
const INSTANCED_DESCRIPTOR_SET: u32 = 1;

/// Variables created for a buffer
pub(super) enum BufferVariables {
    /// The buffer is not accessed by any function
    Unused,

    /// A single block variable
    ///
    /// Instanced blocks wrap the buffer in a runtime array indexed by the instance index.
    Block {
        variable: Word,
        class: StorageClass,
        instanced: bool,
    },

    /// One variable per flattened leaf, in leaf order
    ///
    /// Vertex stage outputs have both, the outputs are written by the vertex stage and the inputs
    /// are read by the fragment stage.
    Flattened {
        inputs: Vec<Word>,
        outputs: Vec<Word>,
    },
}

/// Variable for a used sampler
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(super) struct SamplerVariable {
    pub variable: Word,
    pub sampled_image_type: Word,
}

/// Built-in variables declared for intrinsic accesses
#[derive(Default)]
pub(super) struct BuiltinVariables {
    pub position: Option<Word>,
    pub instance_index: Option<Word>,
}

impl<'a> Generator<'a> {
    /// Declare variables for every used buffer and sampler and every accessed built-in
    pub(super) fn emit_globals(&mut self) -> GenerateResult<()> {
        let instance = self.instance;

        for buffer in &instance.buffers {
            let variables = if buffer.used {
                self.emit_buffer(buffer)?
            } else {
                BufferVariables::Unused
            };
            self.buffers.push(variables);
        }

        for sampler in &instance.samplers {
            let variable = if sampler.used {
                Some(self.emit_sampler(sampler))
            } else {
                None
            };
            self.samplers.push(variable);
        }

        let intrinsics = instance
            .functions
            .iter()
            .flat_map(|f| f.accesses.iter())
            .filter_map(|access| match access {
                GlobalAccess::Intrinsic(intrinsic) => Some(*intrinsic),
                _ => None,
            })
            .collect::<Vec<_>>();
        if intrinsics.contains(&IntrinsicAccess::VertexPosition) {
            let ty = self.vector_type(ir::F4);
            let variable = self.emit_builtin(BuiltIn::Position, StorageClass::Output, ty);
            self.builtins.position = Some(variable);
        }
        if intrinsics.contains(&IntrinsicAccess::InstanceIndex) {
            let ty = self.types.int;
            let variable = self.emit_builtin(BuiltIn::InstanceIndex, StorageClass::Input, ty);
            self.builtins.instance_index = Some(variable);
        }

        log::trace!(
            "declared {} buffers and {} samplers",
            self.buffers
                .iter()
                .filter(|b| !matches!(b, BufferVariables::Unused))
                .count(),
            self.samplers.iter().flatten().count()
        );
        Ok(())
    }

    fn emit_buffer(&mut self, buffer: &ir::Buffer) -> GenerateResult<BufferVariables> {
        let (class, instanced, read_only) = match buffer.kind {
            BufferKind::VertexAttribute
            | BufferKind::InstancedAttribute
            | BufferKind::VertexStageOutput
            | BufferKind::FragmentStageOutput => return self.emit_flattened_buffer(buffer),
            BufferKind::Uniform => (StorageClass::Uniform, false, false),
            BufferKind::ReadOnlyStorage => (StorageClass::StorageBuffer, false, true),
            BufferKind::InstancedUniform | BufferKind::InstancedReadOnlyStorage => {
                (StorageClass::StorageBuffer, true, true)
            }
        };

        let binding = match buffer.binding {
            Some(binding) => binding,
            None => {
                return Err(GeneratorError::InvalidInstance(
                    format!("buffer '{}' has no binding", buffer.name),
                    buffer.location,
                ))
            }
        };

        let members = buffer
            .fields
            .iter()
            .map(|field| self.type_ref_type(&field.type_ref))
            .collect::<Vec<_>>();
        let contents = self.builder.id();
        self.builder.type_struct_id(Some(contents), members);
        self.decorate_members(contents, &buffer.fields);
        self.debug_name(contents, &buffer.name);

        let block = if instanced {
            let array = self.builder.type_runtime_array(contents);
            let stride = ir::align_up(buffer.size, buffer.alignment);
            self.builder
                .decorate(array, Decoration::ArrayStride, [Operand::LiteralBit32(stride)]);

            let wrapper = self.builder.id();
            self.builder.type_struct_id(Some(wrapper), [array]);
            self.builder.member_decorate(
                wrapper,
                0,
                Decoration::Offset,
                [Operand::LiteralBit32(0)],
            );
            self.debug_name(wrapper, &format!("{}_instances", buffer.name));
            wrapper
        } else {
            contents
        };

        self.builder.decorate(block, Decoration::Block, []);
        if read_only {
            let count = if instanced { 1 } else { buffer.fields.len() };
            for member in 0..count {
                self.builder
                    .member_decorate(block, member as u32, Decoration::NonWritable, []);
            }
        }

        let pointer = self.pointer_type(class, block);
        let variable = self.builder.variable(pointer, None, class, None);
        let set = if instanced {
            INSTANCED_DESCRIPTOR_SET
        } else {
            STABLE_DESCRIPTOR_SET
        };
        self.builder.decorate(
            variable,
            Decoration::DescriptorSet,
            [Operand::LiteralBit32(set)],
        );
        self.builder
            .decorate(variable, Decoration::Binding, [Operand::LiteralBit32(binding)]);
        self.debug_name(variable, &buffer.name);

        Ok(BufferVariables::Block {
            variable,
            class,
            instanced,
        })
    }

    fn emit_flattened_buffer(&mut self, buffer: &ir::Buffer) -> GenerateResult<BufferVariables> {
        let graph = match &buffer.flattening {
            Some(graph) => graph,
            None => {
                return Err(GeneratorError::InvalidInstance(
                    format!("buffer '{}' was not flattened", buffer.name),
                    buffer.location,
                ))
            }
        };

        let (has_inputs, has_outputs) = match buffer.kind {
            BufferKind::VertexStageOutput => (true, true),
            BufferKind::FragmentStageOutput => (false, true),
            _ => (true, false),
        };

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for leaf in &graph.leaves {
            let ty = self.type_ref_type(&leaf.type_ref);
            let name = format!("{}.{}", buffer.name, leaf.readable_name);

            if has_inputs {
                let variable = self.emit_location(StorageClass::Input, ty, leaf.location, &name);
                let is_int = match leaf.type_ref.base {
                    ir::BaseType::Vector(id) => id.get().item == ir::ItemType::Int,
                    _ => false,
                };
                if buffer.kind == BufferKind::VertexStageOutput && is_int {
                    self.builder.decorate(variable, Decoration::Flat, []);
                }
                inputs.push(variable);
            }
            if has_outputs {
                let variable = self.emit_location(StorageClass::Output, ty, leaf.location, &name);
                outputs.push(variable);
            }
        }

        Ok(BufferVariables::Flattened { inputs, outputs })
    }

    fn emit_location(&mut self, class: StorageClass, ty: Word, location: u32, name: &str) -> Word {
        let pointer = self.pointer_type(class, ty);
        let variable = self.builder.variable(pointer, None, class, None);
        self.builder
            .decorate(variable, Decoration::Location, [Operand::LiteralBit32(location)]);
        self.debug_name(variable, name);
        variable
    }

    fn emit_sampler(&mut self, sampler: &ir::Sampler) -> SamplerVariable {
        let image = match sampler.kind {
            ir::SamplerKind::Sampler2d => self.builder.type_image(
                self.types.float,
                spirv::Dim::Dim2D,
                0,
                0,
                0,
                1,
                spirv::ImageFormat::Unknown,
                None,
            ),
        };
        let sampled_image = self.builder.type_sampled_image(image);
        let pointer = self.pointer_type(StorageClass::UniformConstant, sampled_image);
        let variable = self
            .builder
            .variable(pointer, None, StorageClass::UniformConstant, None);
        self.builder.decorate(
            variable,
            Decoration::DescriptorSet,
            [Operand::LiteralBit32(STABLE_DESCRIPTOR_SET)],
        );
        self.builder.decorate(
            variable,
            Decoration::Binding,
            [Operand::LiteralBit32(sampler.binding)],
        );
        self.debug_name(variable, &sampler.name);
        SamplerVariable {
            variable,
            sampled_image_type: sampled_image,
        }
    }

    fn emit_builtin(&mut self, builtin: BuiltIn, class: StorageClass, ty: Word) -> Word {
        let pointer = self.pointer_type(class, ty);
        let variable = self.builder.variable(pointer, None, class, None);
        self.builder
            .decorate(variable, Decoration::BuiltIn, [Operand::BuiltIn(builtin)]);
        variable
    }

    /// Get the variable for a flattened leaf as seen from a stage
    pub(super) fn leaf_variable(
        &self,
        buffer: ir::BufferId,
        leaf: u32,
        stage: Option<Stage>,
    ) -> Option<(Word, StorageClass)> {
        let kind = self.instance.get_buffer(buffer).kind;
        match &self.buffers[buffer.0 as usize] {
            BufferVariables::Flattened { inputs, outputs } => {
                let writes_outputs = match kind {
                    BufferKind::VertexStageOutput => stage == Some(Stage::Vertex),
                    BufferKind::FragmentStageOutput => true,
                    _ => false,
                };
                if writes_outputs {
                    outputs
                        .get(leaf as usize)
                        .map(|v| (*v, StorageClass::Output))
                } else {
                    inputs.get(leaf as usize).map(|v| (*v, StorageClass::Input))
                }
            }
            _ => None,
        }
    }

    /// Collect the input and output variables an entry point touches
    pub(super) fn entry_point_interface(
        &self,
        function: &ir::Function,
        stage: Stage,
    ) -> BumpVec<'a, Word> {
        let mut interface = BumpVec::new_in(self.arena);
        for access in &function.accesses {
            match access {
                GlobalAccess::Buffer { id, .. } => {
                    if let BufferVariables::Flattened { inputs, outputs } =
                        &self.buffers[id.0 as usize]
                    {
                        let kind = self.instance.get_buffer(*id).kind;
                        let variables = match kind {
                            BufferKind::VertexStageOutput if stage == Stage::Vertex => outputs,
                            BufferKind::FragmentStageOutput => outputs,
                            _ => inputs,
                        };
                        interface.extend(variables.iter().copied());
                    }
                }
                GlobalAccess::Intrinsic(IntrinsicAccess::VertexPosition) => {
                    interface.extend(self.builtins.position);
                }
                GlobalAccess::Intrinsic(IntrinsicAccess::InstanceIndex) => {
                    interface.extend(self.builtins.instance_index);
                }
                GlobalAccess::Sampler(_) => {}
            }
        }
        interface
    }
}
