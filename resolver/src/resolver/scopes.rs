use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use rpl_ast::ExpressionIndex;
use rpl_ir::{BaseType, ExpressionId, FunctionId, GlobalAccess, VariableId};
use std::cell::{Cell, RefCell};

/// Resolution state of an alias
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AliasState {
    Pending,
    Resolving,
    Resolved(ExpressionId),
    Failed,
}

/// Name for an unresolved expression, resolved on first use
pub struct Alias<'a> {
    pub name: &'a str,
    pub expression: ExpressionIndex,
    pub state: Cell<AliasState>,
}

/// One level of the lexical scope chain while resolving a function body
///
/// Scopes live in the working arena of the context and are dropped together after resolution.
pub struct ResolveScope<'a> {
    pub parent: Option<&'a ResolveScope<'a>>,

    /// Variables declared directly in the scope
    pub variables: RefCell<BumpVec<'a, (&'a str, VariableId)>>,

    pub aliases: RefCell<BumpVec<'a, &'a Alias<'a>>>,

    /// Set for the body scope of a loop
    pub is_loop: bool,
}

/// Result of looking up a name in the scope chain
pub enum ScopeEntry<'a> {
    Variable(VariableId),
    Alias(&'a ResolveScope<'a>, &'a Alias<'a>),
}

impl<'a> ResolveScope<'a> {
    /// Create a scope in the arena
    pub fn new_in(
        arena: &'a Bump,
        parent: Option<&'a ResolveScope<'a>>,
        is_loop: bool,
    ) -> &'a ResolveScope<'a> {
        arena.alloc(ResolveScope {
            parent,
            variables: RefCell::new(BumpVec::new_in(arena)),
            aliases: RefCell::new(BumpVec::new_in(arena)),
            is_loop,
        })
    }

    /// Find a variable or alias, searching the innermost scope first
    pub fn find(&'a self, name: &str) -> Option<ScopeEntry<'a>> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some((_, id)) = scope.variables.borrow().iter().find(|(n, _)| *n == name) {
                return Some(ScopeEntry::Variable(*id));
            }
            if let Some(alias) = scope.aliases.borrow().iter().copied().find(|a| a.name == name) {
                return Some(ScopeEntry::Alias(scope, alias));
            }
            current = scope.parent;
        }
        None
    }

    /// Returns `true` if the name is declared directly in this scope
    pub fn declares(&self, name: &str) -> bool {
        self.variables.borrow().iter().any(|(n, _)| *n == name)
            || self.aliases.borrow().iter().any(|a| a.name == name)
    }

    /// Returns `true` if the scope is inside a loop body
    pub fn in_loop(&self) -> bool {
        let mut current = Some(self);
        while let Some(scope) = current {
            if scope.is_loop {
                return true;
            }
            current = scope.parent;
        }
        false
    }
}

/// State of the function currently being resolved
pub struct FunctionContext {
    pub name: String,

    /// Index of the module the function is declared in
    pub module: usize,

    pub return_type: Option<BaseType>,
    pub accesses: Vec<GlobalAccess>,
    pub callees: Vec<FunctionId>,
}
