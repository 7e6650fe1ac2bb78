use super::errors::*;
use super::Resolver;
use bumpalo::collections::Vec as BumpVec;
use rpl_ast as ast;
use rpl_ir as ir;
use rpl_text::SourceLocation;

/// Memoized resolution state of a struct name
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum StructState {
    Resolving,
    Resolved(ir::StructId),
    Failed,
}

/// Global definitions that are looked up by name across every module
pub trait GlobalDefinition: Sized + 'static {
    /// Readable name of the kind of definition
    const KIND: &'static str;

    /// Allow instance options in the conditional
    const INSTANCE_OPTIONS_ALLOWED: bool = false;

    fn list(module: &ast::Module) -> &[Self];
    fn name(&self) -> &str;
    fn conditional(&self) -> Option<ast::ExpressionIndex>;
    fn line(&self) -> u32;
}

impl GlobalDefinition for ast::StructDefinition {
    const KIND: &'static str = "struct";

    fn list(module: &ast::Module) -> &[Self] {
        &module.structs
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn conditional(&self) -> Option<ast::ExpressionIndex> {
        self.conditional
    }

    fn line(&self) -> u32 {
        self.line
    }
}

impl GlobalDefinition for ast::BufferDefinition {
    const KIND: &'static str = "buffer";

    fn list(module: &ast::Module) -> &[Self] {
        &module.buffers
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn conditional(&self) -> Option<ast::ExpressionIndex> {
        self.conditional
    }

    fn line(&self) -> u32 {
        self.line
    }
}

impl GlobalDefinition for ast::SamplerDefinition {
    const KIND: &'static str = "sampler";
    const INSTANCE_OPTIONS_ALLOWED: bool = true;

    fn list(module: &ast::Module) -> &[Self] {
        &module.samplers
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn conditional(&self) -> Option<ast::ExpressionIndex> {
        self.conditional
    }

    fn line(&self) -> u32 {
        self.line
    }
}

impl GlobalDefinition for ast::FunctionDefinition {
    const KIND: &'static str = "function";

    fn list(module: &ast::Module) -> &[Self] {
        &module.functions
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn conditional(&self) -> Option<ast::ExpressionIndex> {
        self.conditional
    }

    fn line(&self) -> u32 {
        self.line
    }
}

impl<'a> Resolver<'a> {
    /// Find the single active definition of a name
    ///
    /// Returns `None` if no definition is active.
    pub(super) fn find_active<T: GlobalDefinition>(
        &mut self,
        name: &str,
        location: SourceLocation,
    ) -> ResolveResult<Option<(usize, &'a T)>> {
        let modules = self.modules;
        let mut found = Vec::new();
        let mut failed = false;
        for (module_index, module) in modules.iter().enumerate() {
            for definition in T::list(module).iter().filter(|d| d.name() == name) {
                match self.is_active(
                    module_index,
                    definition.conditional(),
                    T::INSTANCE_OPTIONS_ALLOWED,
                    definition.line(),
                ) {
                    Ok(true) => found.push((module_index, definition)),
                    Ok(false) => {}
                    Err(Failed) => failed = true,
                }
            }
        }

        if failed {
            return Err(Failed);
        }

        if found.len() > 1 {
            let notes = found
                .iter()
                .map(|(module_index, definition)| ResolverNote {
                    message: "active definition is here".to_string(),
                    location: self.location(*module_index, definition.line()),
                })
                .collect();
            return Err(self.error_with_notes(
                ResolverError::DuplicateActiveDefinition {
                    kind: T::KIND,
                    name: name.to_string(),
                },
                location,
                notes,
            ));
        }

        Ok(found.pop())
    }

    /// Returns `true` if any definition of the name is active, conditional errors count as inactive
    pub(super) fn has_active<T: GlobalDefinition>(&self, name: &str) -> bool {
        self.modules.iter().enumerate().any(|(module_index, module)| {
            T::list(module).iter().any(|definition| {
                definition.name() == name
                    && self
                        .evaluator(module_index, T::INSTANCE_OPTIONS_ALLOWED)
                        .evaluate_conditional(definition.conditional())
                        .unwrap_or(false)
            })
        })
    }

    /// Check that a global name does not collide with a global of a different kind
    pub(super) fn check_global_name(
        &mut self,
        name: &str,
        kind: &'static str,
        location: SourceLocation,
    ) -> ResolveResult<()> {
        let existing = if ir::is_builtin_type_name(name) {
            Some("built-in type")
        } else if ir::find_builtin_function(name).is_some() {
            Some("built-in function")
        } else if self.options.iter().any(|o| o.name == name) {
            Some("option")
        } else if kind != "struct" && self.has_active::<ast::StructDefinition>(name) {
            Some("struct")
        } else if kind != "buffer" && self.has_active::<ast::BufferDefinition>(name) {
            Some("buffer")
        } else if kind != "sampler" && self.has_active::<ast::SamplerDefinition>(name) {
            Some("sampler")
        } else if kind != "function" && self.has_active::<ast::FunctionDefinition>(name) {
            Some("function")
        } else {
            None
        };

        match existing {
            Some(existing) => Err(self.error(
                ResolverError::NameConflict {
                    name: name.to_string(),
                    existing,
                },
                location,
            )),
            None => Ok(()),
        }
    }

    /// Copy every active pipeline setting into the instance
    pub(super) fn resolve_settings(&mut self) -> ResolveResult<()> {
        let modules = self.modules;
        let mut failed = false;
        for (module_index, module) in modules.iter().enumerate() {
            for setting in &module.settings {
                match self.is_active(module_index, setting.conditional, false, setting.line) {
                    Ok(true) => self.instance.settings.push(ir::Setting {
                        name: setting.name.clone(),
                        value: setting.value.clone(),
                        location: self.location(module_index, setting.line),
                    }),
                    Ok(false) => {}
                    Err(Failed) => failed = true,
                }
            }
        }
        if failed {
            Err(Failed)
        } else {
            Ok(())
        }
    }

    /// Resolve every active struct, including those not referenced by anything
    pub(super) fn resolve_all_structs(&mut self) -> ResolveResult<()> {
        let modules = self.modules;
        let mut failed = false;
        for (module_index, module) in modules.iter().enumerate() {
            for sd in &module.structs {
                let location = self.location(module_index, sd.line);
                match self.is_active(module_index, sd.conditional, false, sd.line) {
                    Ok(true) => failed |= self.resolve_use_struct(&sd.name, location).is_err(),
                    Ok(false) => {}
                    Err(Failed) => failed = true,
                }
            }
        }
        if failed {
            Err(Failed)
        } else {
            Ok(())
        }
    }

    /// Get a struct by name, resolving it on first use
    pub(super) fn resolve_use_struct(
        &mut self,
        name: &str,
        location: SourceLocation,
    ) -> ResolveResult<ir::StructId> {
        if let Some((_, state)) = self.structs.iter().find(|(n, _)| n == name) {
            return match *state {
                StructState::Resolved(id) => Ok(id),
                StructState::Failed => Err(Failed),
                StructState::Resolving => {
                    Err(self.error(ResolverError::RecursiveStruct(name.to_string()), location))
                }
            };
        }

        let (module_index, sd) = match self.find_active::<ast::StructDefinition>(name, location) {
            Ok(Some(found)) => found,
            Ok(None) => {
                return Err(self.error(ResolverError::UnknownType(name.to_string()), location))
            }
            Err(Failed) => {
                self.structs.push((name.to_string(), StructState::Failed));
                return Err(Failed);
            }
        };

        log::trace!("resolving struct {}", name);

        let definition_location = self.location(module_index, sd.line);
        if self.check_global_name(name, "struct", definition_location).is_err() {
            self.structs.push((name.to_string(), StructState::Failed));
            return Err(Failed);
        }

        // Register the struct before its fields so that self references are detected
        let id = ir::StructId(self.instance.structs.len() as u32);
        self.instance.structs.push(ir::Struct {
            name: name.to_string(),
            fields: Vec::new(),
            size: 0,
            alignment: 0,
            location: definition_location,
        });
        self.structs.push((name.to_string(), StructState::Resolving));

        let result = self.resolve_declarations(module_index, name, &sd.fields);

        let state = match result {
            Ok((fields, layout)) => {
                let output = &mut self.instance.structs[id.0 as usize];
                output.fields = fields;
                output.size = layout.size;
                output.alignment = layout.alignment;
                StructState::Resolved(id)
            }
            Err(Failed) => StructState::Failed,
        };
        if let Some(entry) = self.structs.iter_mut().find(|(n, _)| n == name) {
            entry.1 = state;
        }

        match state {
            StructState::Resolved(id) => Ok(id),
            _ => Err(Failed),
        }
    }

    /// Resolve the type of a declaration
    pub(super) fn resolve_type(
        &mut self,
        module: usize,
        type_name: &str,
        array_sizes: ast::ExpressionList,
        line: u32,
    ) -> ResolveResult<ir::TypeRef> {
        let location = self.location(module, line);
        let base = if let Some(id) = ir::find_vector_type(type_name) {
            Ok(ir::BaseType::Vector(id))
        } else if let Some(id) = ir::find_matrix_type(type_name) {
            Ok(ir::BaseType::Matrix(id))
        } else {
            self.resolve_use_struct(type_name, location)
                .map(ir::BaseType::Struct)
        };
        let array_sizes = self.evaluate_array_sizes(module, array_sizes, line);
        Ok(ir::TypeRef {
            base: base?,
            array_sizes: array_sizes?,
        })
    }

    /// Resolve the active declarations of a struct or buffer and lay them out
    pub(super) fn resolve_declarations(
        &mut self,
        module: usize,
        owner: &str,
        declarations: &[ast::Declaration],
    ) -> ResolveResult<(Vec<ir::Declaration>, ir::Layout)> {
        let mut resolved = Vec::<ir::Declaration>::new();
        let mut failed = false;
        for declaration in declarations {
            match self.is_active(module, declaration.conditional, false, declaration.line) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(Failed) => {
                    failed = true;
                    continue;
                }
            }

            let location = self.location(module, declaration.line);
            if resolved.iter().any(|d| d.name == declaration.name) {
                self.error(
                    ResolverError::VariableAlreadyDeclared(declaration.name.clone()),
                    location,
                );
                failed = true;
                continue;
            }

            let type_ref = match self.resolve_type(
                module,
                &declaration.type_name,
                declaration.array_sizes,
                declaration.line,
            ) {
                Ok(type_ref) => type_ref,
                Err(Failed) => {
                    failed = true;
                    continue;
                }
            };

            let layout = match type_ref.layout(&self.instance.structs) {
                Some(layout) => layout,
                None => {
                    self.error(ResolverError::TypeTooLarge(declaration.name.clone()), location);
                    failed = true;
                    continue;
                }
            };

            let meta = self.modules[module]
                .get_meta_list(declaration.meta)
                .map(|list| list.to_vec())
                .unwrap_or_default();

            resolved.push(ir::Declaration {
                name: declaration.name.clone(),
                layout,
                type_ref,
                offset: 0,
                meta,
                location,
            });
        }

        if failed {
            return Err(Failed);
        }

        let (offsets, layout) = match ir::pack_members(resolved.iter().map(|d| d.layout)) {
            Some(packed) => packed,
            None => {
                let line = declarations.first().map_or(0, |d| d.line);
                let location = self.location(module, line);
                return Err(self.error(ResolverError::TypeTooLarge(owner.to_string()), location));
            }
        };
        for (declaration, offset) in resolved.iter_mut().zip(offsets) {
            declaration.offset = offset;
        }
        Ok((resolved, layout))
    }

    /// Resolve every active buffer in declaration order
    pub(super) fn resolve_buffers(&mut self) -> ResolveResult<()> {
        let modules = self.modules;
        let mut seen = BumpVec::<&str>::new_in(self.arena);
        let mut failed = false;
        for (module_index, module) in modules.iter().enumerate() {
            for bd in &module.buffers {
                match self.is_active(module_index, bd.conditional, false, bd.line) {
                    Ok(true) if seen.contains(&bd.name.as_str()) => {
                        let location = self.location(module_index, bd.line);
                        self.error(
                            ResolverError::DuplicateActiveDefinition {
                                kind: "buffer",
                                name: bd.name.clone(),
                            },
                            location,
                        );
                        failed = true;
                    }
                    Ok(true) => {
                        seen.push(&bd.name);
                        failed |= self.resolve_buffer(module_index, bd).is_err();
                    }
                    Ok(false) => {}
                    Err(Failed) => failed = true,
                }
            }
        }
        if failed {
            Err(Failed)
        } else {
            Ok(())
        }
    }

    fn resolve_buffer(&mut self, module: usize, bd: &ast::BufferDefinition) -> ResolveResult<()> {
        let location = self.location(module, bd.line);

        // Slots are taken before anything can fail to keep the layout stable
        let binding = match bd.kind {
            ast::BufferKind::VertexAttribute | ast::BufferKind::InstancedAttribute => {
                Some(take(&mut self.bindings.attribute))
            }
            ast::BufferKind::Uniform | ast::BufferKind::ReadOnlyStorage => {
                Some(take(&mut self.bindings.stable))
            }
            ast::BufferKind::InstancedUniform | ast::BufferKind::InstancedReadOnlyStorage => {
                Some(take(&mut self.bindings.unstable))
            }
            ast::BufferKind::VertexStageOutput | ast::BufferKind::FragmentStageOutput => None,
        };

        self.check_global_name(&bd.name, "buffer", location)?;

        let (fields, layout) = self.resolve_declarations(module, &bd.name, &bd.fields)?;

        let flattening = if bd.kind.is_flattened() {
            Some(self.flatten_buffer(&bd.name, bd.kind, &fields)?)
        } else {
            self.check_member_sizes(&bd.name, &fields)?;
            None
        };

        log::trace!("resolved {} buffer {} with binding {:?}", bd.kind, bd.name, binding);

        self.instance.buffers.push(ir::Buffer {
            name: bd.name.clone(),
            kind: bd.kind,
            fields,
            size: layout.size,
            alignment: layout.alignment,
            binding,
            flattening,
            used: false,
            location,
        });
        Ok(())
    }

    /// Check that every member of a uniform or storage buffer has a size that is a multiple of 16
    fn check_member_sizes(
        &mut self,
        buffer: &str,
        fields: &[ir::Declaration],
    ) -> ResolveResult<()> {
        let mut failed = false;
        for field in fields {
            let element = field.type_ref.base.layout(&self.instance.structs);
            if element.size % 16 != 0 {
                self.error(
                    ResolverError::MemberSizeNotMultipleOf16 {
                        buffer: buffer.to_string(),
                        member: field.name.clone(),
                        size: element.size,
                    },
                    field.location,
                );
                failed = true;
            }
            if let ir::BaseType::Struct(id) = field.type_ref.base {
                let members = self.instance.get_struct(id).fields.clone();
                failed |= self.check_member_sizes(buffer, &members).is_err();
            }
        }
        if failed {
            Err(Failed)
        } else {
            Ok(())
        }
    }

    /// Resolve every active sampler in declaration order
    pub(super) fn resolve_samplers(&mut self) -> ResolveResult<()> {
        let modules = self.modules;
        let mut failed = false;
        for (module_index, module) in modules.iter().enumerate() {
            for sd in &module.samplers {
                match self.is_active(module_index, sd.conditional, true, sd.line) {
                    Ok(true) => failed |= self.resolve_sampler(module_index, sd).is_err(),
                    Ok(false) => {}
                    Err(Failed) => failed = true,
                }
            }
        }
        if failed {
            Err(Failed)
        } else {
            Ok(())
        }
    }

    fn resolve_sampler(&mut self, module: usize, sd: &ast::SamplerDefinition) -> ResolveResult<()> {
        let location = self.location(module, sd.line);

        // Samplers continue numbering after the stable buffers
        let binding = take(&mut self.bindings.stable);

        if self.instance.find_sampler(&sd.name).is_some() {
            return Err(self.error(
                ResolverError::DuplicateActiveDefinition {
                    kind: "sampler",
                    name: sd.name.clone(),
                },
                location,
            ));
        }
        self.check_global_name(&sd.name, "sampler", location)?;

        let mut settings = ir::SamplerSettings::default();
        let mut failed = false;
        for setting in &sd.settings {
            let setting_location = self.location(module, setting.line);
            match self.is_active(module, setting.conditional, true, setting.line) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(Failed) => {
                    failed = true;
                    continue;
                }
            }
            let key = match ir::SamplerSettingKey::from_name(&setting.name) {
                Some(key) => key,
                None => {
                    self.error(
                        ResolverError::UnknownSamplerSetting(setting.name.clone()),
                        setting_location,
                    );
                    failed = true;
                    continue;
                }
            };
            let applied = match &setting.value {
                ast::SettingValue::String(value) => settings.apply(key, value),
                _ => false,
            };
            if !applied {
                self.error(
                    ResolverError::InvalidSamplerSettingValue(setting.name.clone()),
                    setting_location,
                );
                failed = true;
            }
        }
        if failed {
            return Err(Failed);
        }

        self.instance.samplers.push(ir::Sampler {
            name: sd.name.clone(),
            kind: sd.kind,
            settings,
            binding,
            used: false,
            location,
        });
        Ok(())
    }
}

/// Take the next value of a counter
pub(super) fn take(counter: &mut u32) -> u32 {
    let value = *counter;
    *counter += 1;
    value
}
