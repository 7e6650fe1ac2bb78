use crate::resolver::{self, ResolveFailure};
use crate::ContextOption;
use bumpalo::Bump;
use rpl_ast::{Module, OptionValue};
use rpl_ir::{CompilerInstance, EntryPoint, PipelineType};

/// Failures when configuring a [CompilerContext]
#[derive(PartialEq, Eq, Debug, Clone, thiserror::Error)]
pub enum ContextError {
    #[error("option '{0}' is already declared")]
    OptionAlreadyDeclared(String),

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("option '{0}' is not a flag")]
    NotAFlag(String),

    #[error("option '{0}' is not a count")]
    NotACount(String),
}

/// Holds everything needed to resolve a shader family
///
/// Modules are borrowed for the lifetime of the context.
pub struct CompilerContext<'m> {
    pipeline: PipelineType,
    options: Vec<ContextOption>,
    modules: Vec<&'m Module>,

    /// Working memory for a single resolve pass
    resolve_arena: Bump,
}

impl<'m> CompilerContext<'m> {
    pub fn new(pipeline: PipelineType) -> Self {
        CompilerContext {
            pipeline,
            options: Vec::new(),
            modules: Vec::new(),
            resolve_arena: Bump::new(),
        }
    }

    /// Attach a module and register its options
    ///
    /// Fails without attaching anything if an option name is already registered.
    pub fn use_module(&mut self, module: &'m Module) -> Result<(), ContextError> {
        for (i, option) in module.options.iter().enumerate() {
            let declared_before = module.options[..i].iter().any(|o| o.name == option.name);
            if declared_before || self.options.iter().any(|o| o.name == option.name) {
                return Err(ContextError::OptionAlreadyDeclared(option.name.clone()));
            }
        }

        self.options
            .extend(module.options.iter().map(|option| ContextOption {
                name: option.name.clone(),
                scope: option.scope,
                value: option.value,
            }));
        self.modules.push(module);
        Ok(())
    }

    /// Set the value of a flag option
    pub fn set_option_flag(&mut self, name: &str, value: bool) -> Result<(), ContextError> {
        let option = self.find_option_mut(name)?;
        match option.value {
            OptionValue::Flag(_) => {
                option.value = OptionValue::Flag(value);
                Ok(())
            }
            OptionValue::Count(_) => Err(ContextError::NotAFlag(name.to_string())),
        }
    }

    /// Set the value of a count option
    pub fn set_option_count(&mut self, name: &str, value: u64) -> Result<(), ContextError> {
        let option = self.find_option_mut(name)?;
        match option.value {
            OptionValue::Count(_) => {
                option.value = OptionValue::Count(value);
                Ok(())
            }
            OptionValue::Flag(_) => Err(ContextError::NotACount(name.to_string())),
        }
    }

    fn find_option_mut(&mut self, name: &str) -> Result<&mut ContextOption, ContextError> {
        self.options
            .iter_mut()
            .find(|o| o.name == name)
            .ok_or_else(|| ContextError::UnknownOption(name.to_string()))
    }

    /// Get the registered options with their current values
    pub fn options(&self) -> &[ContextOption] {
        &self.options
    }

    /// Get the attached modules
    pub fn modules(&self) -> &[&'m Module] {
        &self.modules
    }

    pub fn pipeline(&self) -> PipelineType {
        self.pipeline
    }

    /// Resolve every active definition and the functions reachable from the entry points
    ///
    /// The working memory of the context is released afterwards whether or not resolution succeeded.
    pub fn resolve(
        &mut self,
        entry_points: &[EntryPoint],
    ) -> Result<CompilerInstance, ResolveFailure> {
        let mut arena = std::mem::take(&mut self.resolve_arena);
        let result = resolver::resolve(
            self.pipeline,
            &self.modules,
            &self.options,
            entry_points,
            &arena,
        );
        log::trace!("resolve used {} bytes of working memory", arena.allocated_bytes());
        arena.reset();
        self.resolve_arena = arena;
        result
    }
}

impl Default for CompilerContext<'_> {
    fn default() -> Self {
        CompilerContext::new(PipelineType::default())
    }
}
