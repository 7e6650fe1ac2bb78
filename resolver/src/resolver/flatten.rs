use super::errors::*;
use super::globals::take;
use super::Resolver;
use rpl_ir as ir;
use rpl_ir::{BaseType, BufferKind, FlattenedDeclaration, FlatteningNode, FlatteningNodeKind};

/// Shared state while flattening one buffer
struct Flattener<'b> {
    buffer: &'b str,
    kind: BufferKind,
    leaves: Vec<FlattenedDeclaration>,
    failed: bool,
}

impl Resolver<'_> {
    /// Split an attribute or stage output buffer into individually bound leaves
    pub(super) fn flatten_buffer(
        &mut self,
        buffer: &str,
        kind: BufferKind,
        fields: &[ir::Declaration],
    ) -> ResolveResult<ir::FlatteningGraph> {
        let mut flattener = Flattener {
            buffer,
            kind,
            leaves: Vec::new(),
            failed: false,
        };
        let nodes = self.flatten_fields(&mut flattener, fields, "", 0);

        if flattener.failed {
            return Err(Failed);
        }

        log::trace!(
            "flattened buffer {} into {} leaves",
            buffer,
            flattener.leaves.len()
        );

        Ok(ir::FlatteningGraph {
            nodes,
            leaves: flattener.leaves,
        })
    }

    fn flatten_fields(
        &mut self,
        flattener: &mut Flattener,
        fields: &[ir::Declaration],
        prefix: &str,
        base_offset: u32,
    ) -> Vec<FlatteningNode> {
        let mut nodes = Vec::with_capacity(fields.len());
        for field in fields {
            let path = if prefix.is_empty() {
                field.name.clone()
            } else {
                format!("{}.{}", prefix, field.name)
            };
            let offset = base_offset + field.offset;

            let kind = match field.type_ref.base {
                BaseType::Struct(id) => {
                    if field.type_ref.is_array() {
                        self.flatten_error(
                            flattener,
                            ResolverError::FlattenedStructArray {
                                buffer: flattener.buffer.to_string(),
                                field: path,
                            },
                            field,
                        );
                        continue;
                    }
                    let members = self.instance.get_struct(id).fields.clone();
                    let children = self.flatten_fields(flattener, &members, &path, offset);
                    FlatteningNodeKind::Struct(children)
                }
                BaseType::Vector(_) | BaseType::Matrix(_) => {
                    match self.flatten_leaf(flattener, field, &path, offset) {
                        Some(kind) => kind,
                        None => continue,
                    }
                }
            };

            nodes.push(FlatteningNode {
                name: field.name.clone(),
                kind,
            });
        }
        nodes
    }

    fn flatten_leaf(
        &mut self,
        flattener: &mut Flattener,
        field: &ir::Declaration,
        path: &str,
        offset: u32,
    ) -> Option<FlatteningNodeKind> {
        let type_ref = &field.type_ref;
        let kind = flattener.kind;

        if kind.is_attribute() && type_ref.is_array() {
            self.flatten_error(
                flattener,
                ResolverError::AttributeArray {
                    buffer: flattener.buffer.to_string(),
                    field: path.to_string(),
                },
                field,
            );
            return None;
        }

        if kind == BufferKind::FragmentStageOutput
            && (type_ref.is_array() || !matches!(type_ref.base, BaseType::Vector(_)))
        {
            self.flatten_error(
                flattener,
                ResolverError::FragmentOutputNotVector {
                    buffer: flattener.buffer.to_string(),
                    field: path.to_string(),
                },
                field,
            );
            return None;
        }

        let first = flattener.leaves.len() as u32;
        match type_ref.base {
            // Attribute matrices are fed one column per location
            BaseType::Matrix(id) if kind.is_attribute() => {
                let matrix = id.get();
                for column in 0..matrix.columns {
                    let leaf = FlattenedDeclaration {
                        readable_name: readable_name(&format!("{}._{}", path, column)),
                        type_ref: ir::TypeRef::vector(matrix.column),
                        location: 0,
                        offset: offset + column * ir::MATRIX_COLUMN_STRIDE,
                        meta: field.meta.clone(),
                    };
                    self.push_leaf(flattener, leaf);
                }
            }
            _ => {
                let leaf = FlattenedDeclaration {
                    readable_name: readable_name(path),
                    type_ref: type_ref.clone(),
                    location: 0,
                    offset,
                    meta: field.meta.clone(),
                };
                self.push_leaf(flattener, leaf);
            }
        }

        Some(FlatteningNodeKind::Leaf {
            type_ref: type_ref.clone(),
            first,
            count: flattener.leaves.len() as u32 - first,
        })
    }

    /// Assign the next location slots to a leaf and store it
    fn push_leaf(&mut self, flattener: &mut Flattener, mut leaf: FlattenedDeclaration) {
        let counter = match flattener.kind {
            BufferKind::VertexStageOutput => &mut self.locations.vertex_output,
            BufferKind::FragmentStageOutput => &mut self.locations.fragment_output,
            _ => &mut self.locations.attribute,
        };
        leaf.location = take(counter);
        *counter += leaf.location_count() - 1;
        flattener.leaves.push(leaf);
    }

    fn flatten_error(
        &mut self,
        flattener: &mut Flattener,
        error: ResolverError,
        field: &ir::Declaration,
    ) {
        self.error(error, field.location);
        flattener.failed = true;
    }
}

/// Limit a generated leaf name to [FLATTENED_NAME_MAX][ir::FLATTENED_NAME_MAX] bytes
fn readable_name(path: &str) -> String {
    if path.len() <= ir::FLATTENED_NAME_MAX {
        return path.to_string();
    }
    let mut end = ir::FLATTENED_NAME_MAX;
    while !path.is_char_boundary(end) {
        end -= 1;
    }
    path[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_readable_name() {
        assert_eq!(readable_name("material.color"), "material.color");

        let long = "a".repeat(70);
        assert_eq!(readable_name(&long).len(), ir::FLATTENED_NAME_MAX);

        let wide = format!("{}é", "a".repeat(63));
        assert_eq!(readable_name(&wide), "a".repeat(63));
    }
}
