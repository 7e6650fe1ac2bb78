use super::errors::*;
use super::{Generator, PointerKey};
use rpl_ir as ir;
use rpl_ir::{BaseType, ExpressionType, OutputKind, TypeRef};
use rspirv::dr::{Builder, Operand};
use rspirv::spirv::{Decoration, StorageClass, Word};

/// Types that every module declares up front
pub(super) struct FixedTypes {
    pub void: Word,
    pub bool: Word,
    pub int: Word,
    pub float: Word,

    /// Indexed by [ir::VectorId], single component vectors are scalars
    pub vectors: Vec<Word>,

    /// Indexed by [ir::MatrixId]
    pub matrices: Vec<Word>,
}

impl FixedTypes {
    pub fn new(builder: &mut Builder) -> Self {
        let void = builder.type_void();
        let bool = builder.type_bool();
        let int = builder.type_int(32, 1);
        let float = builder.type_float(32);

        let vectors = ir::VECTOR_TYPES
            .iter()
            .map(|vector| {
                let scalar = match vector.item {
                    ir::ItemType::Float => float,
                    ir::ItemType::Int => int,
                };
                if vector.components == 1 {
                    scalar
                } else {
                    builder.type_vector(scalar, vector.components)
                }
            })
            .collect::<Vec<_>>();

        let matrices = ir::MATRIX_TYPES
            .iter()
            .map(|matrix| builder.type_matrix(vectors[matrix.column.0 as usize], matrix.columns))
            .collect();

        FixedTypes {
            void,
            bool,
            int,
            float,
            vectors,
            matrices,
        }
    }
}

impl Generator<'_> {
    pub(super) fn vector_type(&self, id: ir::VectorId) -> Word {
        self.types.vectors[id.0 as usize]
    }

    /// Boolean vector matching the component count of a vector
    pub(super) fn bool_type_like(&mut self, id: ir::VectorId) -> Word {
        match id.get().components {
            1 => self.types.bool,
            n => self.builder.type_vector(self.types.bool, n),
        }
    }

    pub(super) fn base_type(&mut self, base: BaseType) -> Word {
        match base {
            BaseType::Vector(id) => self.vector_type(id),
            BaseType::Matrix(id) => self.types.matrices[id.0 as usize],
            BaseType::Struct(id) => self.struct_type(id),
        }
    }

    /// Get the type for a struct, declaring it with its member layout on first use
    pub(super) fn struct_type(&mut self, id: ir::StructId) -> Word {
        if let Some(ty) = self.structs[id.0 as usize] {
            return ty;
        }

        let instance = self.instance;
        let sd = instance.get_struct(id);
        let members = sd
            .fields
            .iter()
            .map(|field| self.type_ref_type(&field.type_ref))
            .collect::<Vec<_>>();

        let ty = self.builder.id();
        self.builder.type_struct_id(Some(ty), members);
        self.decorate_members(ty, &sd.fields);
        self.debug_name(ty, &sd.name);

        log::trace!("declared struct {} as %{}", sd.name, ty);
        self.structs[id.0 as usize] = Some(ty);
        ty
    }

    /// Add offset, matrix layout, and name decorations to the members of a struct type
    pub(super) fn decorate_members(&mut self, ty: Word, fields: &[ir::Declaration]) {
        for (index, field) in fields.iter().enumerate() {
            let member = index as u32;
            self.builder.member_decorate(
                ty,
                member,
                Decoration::Offset,
                [Operand::LiteralBit32(field.offset)],
            );
            if let BaseType::Matrix(_) = field.type_ref.base {
                self.builder
                    .member_decorate(ty, member, Decoration::ColMajor, []);
                self.builder.member_decorate(
                    ty,
                    member,
                    Decoration::MatrixStride,
                    [Operand::LiteralBit32(ir::MATRIX_COLUMN_STRIDE)],
                );
            }
            if self.options.debug_names {
                self.builder.member_name(ty, member, field.name.as_str());
            }
        }
    }

    /// Get the type for a value type including its array dimensions
    pub(super) fn type_ref_type(&mut self, type_ref: &TypeRef) -> Word {
        let (size, inner) = match type_ref.array_sizes.split_first() {
            Some(split) => split,
            None => return self.base_type(type_ref.base),
        };

        if let Some(ty) = self.arrays.get(type_ref) {
            return *ty;
        }

        let element = TypeRef {
            base: type_ref.base,
            array_sizes: inner.to_vec(),
        };
        let element_type = self.type_ref_type(&element);
        let length = self.constant_int(*size as i32);
        let ty = self.builder.type_array(element_type, length);

        let stride = element.layout(&self.instance.structs).stride();
        self.builder
            .decorate(ty, Decoration::ArrayStride, [Operand::LiteralBit32(stride)]);

        self.arrays.insert(type_ref.clone(), ty);
        ty
    }

    /// Get the type of the value an expression produces
    pub(super) fn expression_type(
        &mut self,
        ty: &ExpressionType,
        location: rpl_text::SourceLocation,
    ) -> GenerateResult<Word> {
        match ty.kind {
            OutputKind::Void => Ok(self.types.void),
            OutputKind::Boolean => Ok(self.types.bool),
            OutputKind::Base(base) => Ok(self.type_ref_type(&TypeRef {
                base,
                array_sizes: ty.array_sizes.clone(),
            })),
            OutputKind::Buffer(id) => Err(GeneratorError::InvalidInstance(
                format!("buffer '{}' used as a value", self.instance.get_buffer(id).name),
                location,
            )),
        }
    }

    pub(super) fn pointer_type(&mut self, class: StorageClass, pointee: Word) -> Word {
        let key = PointerKey { class, pointee };
        *self
            .pointers
            .entry(key)
            .or_insert_with(|| self.builder.type_pointer(None, class, pointee))
    }

    pub(super) fn function_type(&mut self, return_type: Word, arguments: Vec<Word>) -> Word {
        let key = (return_type, arguments);
        if let Some(ty) = self.function_types.get(&key) {
            return *ty;
        }
        let ty = self.builder.type_function(return_type, key.1.clone());
        self.function_types.insert(key, ty);
        ty
    }

    pub(super) fn constant_int(&mut self, value: i32) -> Word {
        if let Some(id) = self.int_constants.get(&value) {
            return *id;
        }
        let id = self.builder.constant_bit32(self.types.int, value as u32);
        self.int_constants.insert(value, id);
        id
    }

    pub(super) fn constant_float(&mut self, value: f32) -> Word {
        let bits = value.to_bits();
        if let Some(id) = self.float_constants.get(&bits) {
            return *id;
        }
        let id = self.builder.constant_bit32(self.types.float, bits);
        self.float_constants.insert(bits, id);
        id
    }
}
