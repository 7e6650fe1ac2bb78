use crate::*;
use std::sync::LazyLock;

/// Id to a built-in function in [BUILTIN_FUNCTIONS]
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct BuiltinId(pub u32);

/// Extended math operations
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum MathFunction {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sqrt,
    InverseSqrt,
    Pow,
    Exp,
    Log,
    Exp2,
    Log2,
    Abs,
    Sign,
    Floor,
    Ceil,
    Fract,
    Round,
    Trunc,
    Min,
    Max,
    Clamp,
    Mix,
    Step,
    SmoothStep,
    Length,
    Distance,
    Normalize,
    Reflect,
    Cross,
    Determinant,
    Inverse,
}

/// What a built-in function does
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum BuiltinOperation {
    Math(MathFunction),
    Dot,
    Transpose,
    IntToFloat,
    FloatToInt,

    /// Write the clip space position of the vertex
    WriteVertexPosition,
}

/// Signature and behavior of a built-in function
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct BuiltinFunction {
    pub name: String,
    pub return_type: Option<BaseType>,
    pub arguments: Vec<BaseType>,
    pub operation: BuiltinOperation,

    /// Stage the function is restricted to
    pub stage: Option<Stage>,
}

const FLOAT_VECTORS: [VectorId; 4] = [F1, F2, F3, F4];
const INT_VECTORS: [VectorId; 4] = [I1, I2, I3, I4];
const MATRICES: [MatrixId; 2] = [F3X3, F4X4];

/// Element-wise float functions: name, operation, argument count
const FLOAT_ELEMENTWISE: &[(&str, MathFunction, usize)] = &[
    ("sin", MathFunction::Sin, 1),
    ("cos", MathFunction::Cos, 1),
    ("tan", MathFunction::Tan, 1),
    ("asin", MathFunction::Asin, 1),
    ("acos", MathFunction::Acos, 1),
    ("atan", MathFunction::Atan, 1),
    ("atan2", MathFunction::Atan2, 2),
    ("sqrt", MathFunction::Sqrt, 1),
    ("inverse_sqrt", MathFunction::InverseSqrt, 1),
    ("pow", MathFunction::Pow, 2),
    ("exp", MathFunction::Exp, 1),
    ("log", MathFunction::Log, 1),
    ("exp2", MathFunction::Exp2, 1),
    ("log2", MathFunction::Log2, 1),
    ("abs", MathFunction::Abs, 1),
    ("sign", MathFunction::Sign, 1),
    ("floor", MathFunction::Floor, 1),
    ("ceil", MathFunction::Ceil, 1),
    ("fract", MathFunction::Fract, 1),
    ("round", MathFunction::Round, 1),
    ("trunc", MathFunction::Trunc, 1),
    ("min", MathFunction::Min, 2),
    ("max", MathFunction::Max, 2),
    ("clamp", MathFunction::Clamp, 3),
    ("mix", MathFunction::Mix, 3),
    ("step", MathFunction::Step, 2),
    ("smoothstep", MathFunction::SmoothStep, 3),
];

const INT_ELEMENTWISE: &[(&str, MathFunction, usize)] = &[
    ("abs", MathFunction::Abs, 1),
    ("min", MathFunction::Min, 2),
    ("max", MathFunction::Max, 2),
    ("clamp", MathFunction::Clamp, 3),
];

fn vector(id: VectorId) -> BaseType {
    BaseType::Vector(id)
}

fn matrix(id: MatrixId) -> BaseType {
    BaseType::Matrix(id)
}

fn add(
    list: &mut Vec<BuiltinFunction>,
    name: String,
    return_type: Option<BaseType>,
    arguments: Vec<BaseType>,
    operation: BuiltinOperation,
) {
    list.push(BuiltinFunction {
        name,
        return_type,
        arguments,
        operation,
        stage: None,
    });
}

fn build_library() -> Vec<BuiltinFunction> {
    let mut list = Vec::new();

    for (name, op, count) in FLOAT_ELEMENTWISE {
        for id in FLOAT_VECTORS {
            let ty = vector(id);
            add(
                &mut list,
                format!("{}_{}", name, id.get().name),
                Some(ty),
                vec![ty; *count],
                BuiltinOperation::Math(*op),
            );
        }
    }

    for (name, op, count) in INT_ELEMENTWISE {
        for id in INT_VECTORS {
            let ty = vector(id);
            add(
                &mut list,
                format!("{}_{}", name, id.get().name),
                Some(ty),
                vec![ty; *count],
                BuiltinOperation::Math(*op),
            );
        }
    }

    for id in FLOAT_VECTORS {
        let ty = vector(id);
        let suffix = id.get().name;
        add(
            &mut list,
            format!("dot_{}", suffix),
            Some(vector(F1)),
            vec![ty, ty],
            BuiltinOperation::Dot,
        );
        add(
            &mut list,
            format!("length_{}", suffix),
            Some(vector(F1)),
            vec![ty],
            BuiltinOperation::Math(MathFunction::Length),
        );
        add(
            &mut list,
            format!("distance_{}", suffix),
            Some(vector(F1)),
            vec![ty, ty],
            BuiltinOperation::Math(MathFunction::Distance),
        );
        add(
            &mut list,
            format!("normalize_{}", suffix),
            Some(ty),
            vec![ty],
            BuiltinOperation::Math(MathFunction::Normalize),
        );
        add(
            &mut list,
            format!("reflect_{}", suffix),
            Some(ty),
            vec![ty, ty],
            BuiltinOperation::Math(MathFunction::Reflect),
        );
    }

    add(
        &mut list,
        "cross_f3".to_string(),
        Some(vector(F3)),
        vec![vector(F3), vector(F3)],
        BuiltinOperation::Math(MathFunction::Cross),
    );

    for id in MATRICES {
        let ty = matrix(id);
        let suffix = id.get().name;
        add(
            &mut list,
            format!("transpose_{}", suffix),
            Some(ty),
            vec![ty],
            BuiltinOperation::Transpose,
        );
        add(
            &mut list,
            format!("determinant_{}", suffix),
            Some(vector(F1)),
            vec![ty],
            BuiltinOperation::Math(MathFunction::Determinant),
        );
        add(
            &mut list,
            format!("inverse_{}", suffix),
            Some(ty),
            vec![ty],
            BuiltinOperation::Math(MathFunction::Inverse),
        );
    }

    for (int, float) in INT_VECTORS.iter().zip(FLOAT_VECTORS) {
        add(
            &mut list,
            format!("{}_to_{}", int.get().name, float.get().name),
            Some(vector(float)),
            vec![vector(*int)],
            BuiltinOperation::IntToFloat,
        );
        add(
            &mut list,
            format!("{}_to_{}", float.get().name, int.get().name),
            Some(vector(*int)),
            vec![vector(float)],
            BuiltinOperation::FloatToInt,
        );
    }

    list.push(BuiltinFunction {
        name: "vertex_stage_output_position".to_string(),
        return_type: None,
        arguments: vec![vector(F4)],
        operation: BuiltinOperation::WriteVertexPosition,
        stage: Some(Stage::Vertex),
    });

    list
}

/// Table of every built-in function, indexed by [BuiltinId]
pub static BUILTIN_FUNCTIONS: LazyLock<Vec<BuiltinFunction>> = LazyLock::new(build_library);

/// Find a built-in function by name
pub fn find_builtin_function(name: &str) -> Option<BuiltinId> {
    BUILTIN_FUNCTIONS
        .iter()
        .position(|f| f.name == name)
        .map(|i| BuiltinId(i as u32))
}

impl BuiltinId {
    /// Get the definition of the built-in function
    pub fn get(self) -> &'static BuiltinFunction {
        &BUILTIN_FUNCTIONS[self.0 as usize]
    }
}

/// Returns `true` if the name is reserved by a built-in type
pub fn is_builtin_type_name(name: &str) -> bool {
    find_vector_type(name).is_some() || find_matrix_type(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_builtin_names_unique() {
        for (i, f) in BUILTIN_FUNCTIONS.iter().enumerate() {
            assert_eq!(
                find_builtin_function(&f.name),
                Some(BuiltinId(i as u32)),
                "{}",
                f.name
            );
        }
    }

    #[test]
    fn check_builtin_signatures() {
        let sin = find_builtin_function("sin_f3").unwrap().get();
        assert_eq!(sin.return_type, Some(BaseType::Vector(F3)));
        assert_eq!(sin.arguments, [BaseType::Vector(F3)]);

        let clamp = find_builtin_function("clamp_i2").unwrap().get();
        assert_eq!(clamp.arguments.len(), 3);

        let dot = find_builtin_function("dot_f4").unwrap().get();
        assert_eq!(dot.return_type, Some(BaseType::Vector(F1)));

        let convert = find_builtin_function("i3_to_f3").unwrap().get();
        assert_eq!(convert.operation, BuiltinOperation::IntToFloat);

        let position = find_builtin_function("vertex_stage_output_position")
            .unwrap()
            .get();
        assert_eq!(position.return_type, None);
        assert_eq!(position.stage, Some(Stage::Vertex));

        assert_eq!(find_builtin_function("cross_f4"), None);
        assert_eq!(find_builtin_function("sin_i1"), None);
    }
}
