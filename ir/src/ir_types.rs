use crate::*;

/// Id to a built-in vector type
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct VectorId(pub u32);

/// Id to a built-in matrix type
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct MatrixId(pub u32);

/// Id to a resolved struct
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct StructId(pub u32);

/// Component type of a vector or matrix
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum ItemType {
    Float,
    Int,
}

/// A built-in vector type
///
/// A one component vector is the scalar type of the language.
#[derive(PartialEq, Eq, Debug)]
pub struct VectorType {
    pub name: &'static str,
    pub item: ItemType,
    pub components: u32,
}

/// A built-in matrix type made of column vectors
#[derive(PartialEq, Eq, Debug)]
pub struct MatrixType {
    pub name: &'static str,
    pub column: VectorId,
    pub columns: u32,
}

pub const F1: VectorId = VectorId(0);
pub const F2: VectorId = VectorId(1);
pub const F3: VectorId = VectorId(2);
pub const F4: VectorId = VectorId(3);
pub const I1: VectorId = VectorId(4);
pub const I2: VectorId = VectorId(5);
pub const I3: VectorId = VectorId(6);
pub const I4: VectorId = VectorId(7);

pub const F3X3: MatrixId = MatrixId(0);
pub const F4X4: MatrixId = MatrixId(1);

/// Table of all built-in vector types, indexed by [VectorId]
pub static VECTOR_TYPES: [VectorType; 8] = [
    VectorType {
        name: "f1",
        item: ItemType::Float,
        components: 1,
    },
    VectorType {
        name: "f2",
        item: ItemType::Float,
        components: 2,
    },
    VectorType {
        name: "f3",
        item: ItemType::Float,
        components: 3,
    },
    VectorType {
        name: "f4",
        item: ItemType::Float,
        components: 4,
    },
    VectorType {
        name: "i1",
        item: ItemType::Int,
        components: 1,
    },
    VectorType {
        name: "i2",
        item: ItemType::Int,
        components: 2,
    },
    VectorType {
        name: "i3",
        item: ItemType::Int,
        components: 3,
    },
    VectorType {
        name: "i4",
        item: ItemType::Int,
        components: 4,
    },
];

/// Table of all built-in matrix types, indexed by [MatrixId]
pub static MATRIX_TYPES: [MatrixType; 2] = [
    MatrixType {
        name: "f3x3",
        column: F3,
        columns: 3,
    },
    MatrixType {
        name: "f4x4",
        column: F4,
        columns: 4,
    },
];

/// Alignment of all matrix columns inside buffers
pub const MATRIX_COLUMN_STRIDE: u32 = 16;

impl VectorId {
    /// Get the type information for the vector
    pub fn get(self) -> &'static VectorType {
        &VECTOR_TYPES[self.0 as usize]
    }

    /// Find a vector by component type and count
    pub fn from_parts(item: ItemType, components: u32) -> Option<VectorId> {
        VECTOR_TYPES
            .iter()
            .position(|v| v.item == item && v.components == components)
            .map(|i| VectorId(i as u32))
    }

    /// Get the single component vector with the same item type
    pub fn scalar(self) -> VectorId {
        match self.get().item {
            ItemType::Float => F1,
            ItemType::Int => I1,
        }
    }

    pub fn size(self) -> u32 {
        4 * self.get().components
    }

    pub fn alignment(self) -> u32 {
        match self.get().components {
            1 => 4,
            2 => 8,
            _ => 16,
        }
    }
}

impl MatrixId {
    /// Get the type information for the matrix
    pub fn get(self) -> &'static MatrixType {
        &MATRIX_TYPES[self.0 as usize]
    }

    pub fn size(self) -> u32 {
        MATRIX_COLUMN_STRIDE * self.get().columns
    }

    pub fn alignment(self) -> u32 {
        MATRIX_COLUMN_STRIDE
    }
}

/// Find a built-in vector type by name
pub fn find_vector_type(name: &str) -> Option<VectorId> {
    VECTOR_TYPES
        .iter()
        .position(|v| v.name == name)
        .map(|i| VectorId(i as u32))
}

/// Find a built-in matrix type by name
pub fn find_matrix_type(name: &str) -> Option<MatrixId> {
    MATRIX_TYPES
        .iter()
        .position(|m| m.name == name)
        .map(|i| MatrixId(i as u32))
}

/// Base of a value type
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum BaseType {
    Vector(VectorId),
    Matrix(MatrixId),
    Struct(StructId),
}

/// A full value type: base type plus array dimensions
///
/// The first array dimension is the outermost.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct TypeRef {
    pub base: BaseType,
    pub array_sizes: Vec<u32>,
}

impl TypeRef {
    pub fn new(base: BaseType) -> Self {
        TypeRef {
            base,
            array_sizes: Vec::new(),
        }
    }

    pub fn vector(id: VectorId) -> Self {
        TypeRef::new(BaseType::Vector(id))
    }

    pub fn matrix(id: MatrixId) -> Self {
        TypeRef::new(BaseType::Matrix(id))
    }

    pub fn is_array(&self) -> bool {
        !self.array_sizes.is_empty()
    }

    /// Number of base elements across every array dimension
    ///
    /// Saturates for dimensions too large to lay out, which resolution rejects.
    pub fn element_count(&self) -> u32 {
        self.checked_element_count().unwrap_or(u32::MAX)
    }

    pub fn checked_element_count(&self) -> Option<u32> {
        self.array_sizes
            .iter()
            .try_fold(1u32, |count, size| count.checked_mul(*size))
    }
}

/// What kind of value an expression produces
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum OutputKind {
    /// Statement with no value
    Void,

    /// Result of comparisons and logical operators
    Boolean,

    /// A value type
    Base(BaseType),

    /// Reference to a whole buffer, only valid as the root of a field access
    Buffer(BufferId),
}

/// Type of a resolved expression
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct ExpressionType {
    pub kind: OutputKind,
    pub array_sizes: Vec<u32>,
    pub writable: bool,
}

impl ExpressionType {
    pub const VOID: ExpressionType = ExpressionType {
        kind: OutputKind::Void,
        array_sizes: Vec::new(),
        writable: false,
    };

    pub const BOOLEAN: ExpressionType = ExpressionType {
        kind: OutputKind::Boolean,
        array_sizes: Vec::new(),
        writable: false,
    };

    /// Read only value of a given type
    pub fn value(type_ref: &TypeRef) -> Self {
        ExpressionType {
            kind: OutputKind::Base(type_ref.base),
            array_sizes: type_ref.array_sizes.clone(),
            writable: false,
        }
    }

    /// Read only value of a non-array base type
    pub fn base(base: BaseType) -> Self {
        ExpressionType {
            kind: OutputKind::Base(base),
            array_sizes: Vec::new(),
            writable: false,
        }
    }

    pub fn vector(id: VectorId) -> Self {
        ExpressionType::base(BaseType::Vector(id))
    }

    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// Get the base type if the expression produces a value
    pub fn as_base(&self) -> Option<BaseType> {
        match self.kind {
            OutputKind::Base(base) => Some(base),
            _ => None,
        }
    }

    /// Get the vector type if the expression is a non-array vector
    pub fn as_vector(&self) -> Option<VectorId> {
        match self.kind {
            OutputKind::Base(BaseType::Vector(id)) if self.array_sizes.is_empty() => Some(id),
            _ => None,
        }
    }

    /// Get the matrix type if the expression is a non-array matrix
    pub fn as_matrix(&self) -> Option<MatrixId> {
        match self.kind {
            OutputKind::Base(BaseType::Matrix(id)) if self.array_sizes.is_empty() => Some(id),
            _ => None,
        }
    }

    /// Get the value type of the expression
    pub fn as_type_ref(&self) -> Option<TypeRef> {
        self.as_base().map(|base| TypeRef {
            base,
            array_sizes: self.array_sizes.clone(),
        })
    }

    pub fn is_void(&self) -> bool {
        self.kind == OutputKind::Void
    }

    pub fn is_boolean(&self) -> bool {
        self.kind == OutputKind::Boolean
    }

    /// Returns `true` if two types have the same value type, ignoring writability
    pub fn same_value_type(&self, other: &ExpressionType) -> bool {
        self.kind == other.kind && self.array_sizes == other.array_sizes
    }
}

/// Size and alignment of a type inside a buffer or struct
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct Layout {
    pub size: u32,
    pub alignment: u32,
}

impl Layout {
    /// Distance between consecutive elements in an array of this layout
    pub fn stride(&self) -> u32 {
        align_up(self.size, self.alignment)
    }
}

/// Largest size in bytes of a struct, buffer, or declaration
pub const MAX_TYPE_SIZE: u32 = i32::MAX as u32;

/// Round `value` up to a multiple of `alignment`
///
/// `value` must not exceed [MAX_TYPE_SIZE].
pub fn align_up(value: u32, alignment: u32) -> u32 {
    if alignment == 0 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

/// Accumulate a packed layout over a list of member layouts
///
/// Returns the offsets of each member and the layout of the whole, or `None` if the whole would
/// exceed [MAX_TYPE_SIZE].
pub fn pack_members(members: impl IntoIterator<Item = Layout>) -> Option<(Vec<u32>, Layout)> {
    let mut offsets = Vec::new();
    let mut offset = 0u32;
    let mut alignment = 4;
    for member in members {
        offset = align_up(offset, member.alignment);
        offsets.push(offset);
        offset = offset
            .checked_add(member.size)
            .filter(|end| *end <= MAX_TYPE_SIZE)?;
        alignment = alignment.max(member.alignment);
    }
    let size = align_up(offset, alignment);
    (size <= MAX_TYPE_SIZE).then_some((offsets, Layout { size, alignment }))
}

impl BaseType {
    /// Layout of a single element of the base type
    pub fn layout(&self, structs: &[Struct]) -> Layout {
        match self {
            BaseType::Vector(id) => Layout {
                size: id.size(),
                alignment: id.alignment(),
            },
            BaseType::Matrix(id) => Layout {
                size: id.size(),
                alignment: id.alignment(),
            },
            BaseType::Struct(id) => {
                let sd = &structs[id.0 as usize];
                Layout {
                    size: sd.size,
                    alignment: sd.alignment,
                }
            }
        }
    }
}

impl TypeRef {
    /// Layout of the full type including array dimensions
    ///
    /// Returns `None` if the size would exceed [MAX_TYPE_SIZE].
    pub fn layout(&self, structs: &[Struct]) -> Option<Layout> {
        let element = self.base.layout(structs);
        if self.array_sizes.is_empty() {
            return Some(element);
        }
        let size = element
            .stride()
            .checked_mul(self.checked_element_count()?)
            .filter(|size| *size <= MAX_TYPE_SIZE)?;
        Some(Layout {
            size,
            alignment: element.alignment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_vector_layouts() {
        assert_eq!((F1.size(), F1.alignment()), (4, 4));
        assert_eq!((F2.size(), F2.alignment()), (8, 8));
        assert_eq!((F3.size(), F3.alignment()), (12, 16));
        assert_eq!((I4.size(), I4.alignment()), (16, 16));
        assert_eq!((F3X3.size(), F3X3.alignment()), (48, 16));
        assert_eq!((F4X4.size(), F4X4.alignment()), (64, 16));
    }

    #[test]
    fn check_find_types() {
        assert_eq!(find_vector_type("f3"), Some(F3));
        assert_eq!(find_vector_type("i2"), Some(I2));
        assert_eq!(find_vector_type("f5"), None);
        assert_eq!(find_matrix_type("f4x4"), Some(F4X4));
        assert_eq!(find_matrix_type("f2x2"), None);
        assert_eq!(VectorId::from_parts(ItemType::Int, 3), Some(I3));
        assert_eq!(F4.scalar(), F1);
        assert_eq!(F4X4.get().column, F4);
    }

    #[test]
    fn check_pack_members() {
        let f1 = BaseType::Vector(F1).layout(&[]);
        let f3 = BaseType::Vector(F3).layout(&[]);
        let (offsets, layout) = pack_members([f1, f3, f1]).unwrap();
        assert_eq!(offsets, [0, 16, 28]);
        assert_eq!(layout, Layout { size: 32, alignment: 16 });

        let array = TypeRef {
            base: BaseType::Vector(F3),
            array_sizes: vec![2, 3],
        };
        assert_eq!(array.layout(&[]), Some(Layout { size: 96, alignment: 16 }));
    }

    #[test]
    fn check_oversized_layouts() {
        let f4 = BaseType::Vector(F4).layout(&[]);

        let huge = TypeRef {
            base: BaseType::Vector(F4),
            array_sizes: vec![1 << 28],
        };
        assert_eq!(huge.layout(&[]), None);

        let overflowing = TypeRef {
            base: BaseType::Vector(F4),
            array_sizes: vec![u32::MAX, u32::MAX],
        };
        assert_eq!(overflowing.checked_element_count(), None);
        assert_eq!(overflowing.element_count(), u32::MAX);
        assert_eq!(overflowing.layout(&[]), None);

        let largest = Layout {
            size: MAX_TYPE_SIZE - 15,
            alignment: 16,
        };
        assert!(pack_members([largest]).is_some());
        assert_eq!(pack_members([largest, f4]), None);
    }
}
