use crate::*;
use rpl_text::FileName;

/// Helper for constructing a [Module] in code
///
/// Every expression is pushed with the line set by [ModuleBuilder::at_line].
pub struct ModuleBuilder {
    module: Module,
    line: u32,
}

impl ModuleBuilder {
    pub fn new(file_name: &str) -> Self {
        ModuleBuilder {
            module: Module::new(FileName::from(file_name)),
            line: 1,
        }
    }

    /// Set the line for the following nodes
    pub fn at_line(&mut self, line: u32) -> &mut Self {
        self.line = line;
        self
    }

    /// Get the line used for new nodes
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Add an expression to the module storage
    pub fn expression(&mut self, kind: ExpressionKind) -> ExpressionIndex {
        let index = ExpressionIndex(self.module.expressions.len() as u32);
        self.module.expressions.push(Expression {
            kind,
            line: self.line,
        });
        index
    }

    /// Add a list of expressions to the module storage
    pub fn list(&mut self, items: &[ExpressionIndex]) -> ExpressionList {
        let first = self.module.expression_lists.len() as u32;
        self.module.expression_lists.extend_from_slice(items);
        ExpressionList {
            first,
            count: items.len() as u32,
        }
    }

    /// Add a list of metadata strings to the module storage
    pub fn meta(&mut self, items: &[&str]) -> MetaList {
        let first = self.module.meta_lists.len() as u32;
        self.module
            .meta_lists
            .extend(items.iter().map(|s| s.to_string()));
        MetaList {
            first,
            count: items.len() as u32,
        }
    }

    pub fn nope(&mut self) -> ExpressionIndex {
        self.expression(ExpressionKind::Nope)
    }

    pub fn identifier(&mut self, name: &str) -> ExpressionIndex {
        self.expression(ExpressionKind::Identifier(name.to_string()))
    }

    pub fn integer(&mut self, value: i64) -> ExpressionIndex {
        self.expression(ExpressionKind::IntegerLiteral(value))
    }

    pub fn floating(&mut self, value: f64) -> ExpressionIndex {
        self.expression(ExpressionKind::FloatingLiteral(value))
    }

    pub fn binary(
        &mut self,
        op: BinaryOperator,
        left: ExpressionIndex,
        right: ExpressionIndex,
    ) -> ExpressionIndex {
        self.expression(ExpressionKind::BinaryOperation(op, left, right))
    }

    pub fn unary(&mut self, op: UnaryOperator, operand: ExpressionIndex) -> ExpressionIndex {
        self.expression(ExpressionKind::UnaryOperation(op, operand))
    }

    /// `object.name`
    pub fn field(&mut self, object: ExpressionIndex, name: &str) -> ExpressionIndex {
        let member = self.identifier(name);
        self.binary(BinaryOperator::FieldAccess, object, member)
    }

    /// `array[index]`
    pub fn index(&mut self, array: ExpressionIndex, index: ExpressionIndex) -> ExpressionIndex {
        self.binary(BinaryOperator::ArrayAccess, array, index)
    }

    /// `target = value`
    pub fn assign(&mut self, target: ExpressionIndex, value: ExpressionIndex) -> ExpressionIndex {
        self.binary(BinaryOperator::Assign, target, value)
    }

    pub fn call(&mut self, name: &str, args: &[ExpressionIndex]) -> ExpressionIndex {
        let args = self.list(args);
        self.expression(ExpressionKind::FunctionCall(name.to_string(), args))
    }

    pub fn construct(&mut self, type_name: &str, args: &[ExpressionIndex]) -> ExpressionIndex {
        let args = self.list(args);
        self.expression(ExpressionKind::Constructor(type_name.to_string(), args))
    }

    pub fn scope(&mut self, statements: &[ExpressionIndex]) -> ExpressionIndex {
        let statements = self.list(statements);
        self.expression(ExpressionKind::Scope(statements))
    }

    pub fn if_else(
        &mut self,
        condition: ExpressionIndex,
        true_branch: ExpressionIndex,
        false_branch: Option<ExpressionIndex>,
    ) -> ExpressionIndex {
        self.expression(ExpressionKind::If {
            condition,
            true_branch,
            false_branch,
        })
    }

    pub fn for_loop(
        &mut self,
        init: ExpressionIndex,
        condition: ExpressionIndex,
        step: ExpressionIndex,
        body: ExpressionIndex,
    ) -> ExpressionIndex {
        self.expression(ExpressionKind::For {
            init,
            condition,
            step,
            body,
        })
    }

    pub fn while_loop(
        &mut self,
        condition: ExpressionIndex,
        body: ExpressionIndex,
    ) -> ExpressionIndex {
        self.expression(ExpressionKind::While { condition, body })
    }

    pub fn conditional_scope(
        &mut self,
        condition: ExpressionIndex,
        body: ExpressionIndex,
    ) -> ExpressionIndex {
        self.expression(ExpressionKind::ConditionalScope { condition, body })
    }

    pub fn alias(
        &mut self,
        name: &str,
        condition: Option<ExpressionIndex>,
        expression: ExpressionIndex,
    ) -> ExpressionIndex {
        self.expression(ExpressionKind::ConditionalAlias {
            name: name.to_string(),
            condition,
            expression,
        })
    }

    pub fn break_loop(&mut self) -> ExpressionIndex {
        self.expression(ExpressionKind::Break)
    }

    pub fn continue_loop(&mut self) -> ExpressionIndex {
        self.expression(ExpressionKind::Continue)
    }

    pub fn return_value(&mut self, value: Option<ExpressionIndex>) -> ExpressionIndex {
        self.expression(ExpressionKind::Return(value))
    }

    /// Declare a local variable
    pub fn declare(&mut self, declaration: Declaration) -> ExpressionIndex {
        let line = self.line;
        self.expression(ExpressionKind::VariableDeclaration(declaration.at_line(line)))
    }

    /// Declaration at the current line with the given array sizes
    pub fn declaration(&mut self, type_name: &str, name: &str, array_sizes: &[i64]) -> Declaration {
        let sizes = array_sizes
            .iter()
            .map(|size| self.integer(*size))
            .collect::<Vec<_>>();
        let sizes = self.list(&sizes);
        Declaration::new(type_name, name)
            .with_array_sizes(sizes)
            .at_line(self.line)
    }

    pub fn add_option(&mut self, name: &str, scope: OptionScope, value: OptionValue) -> &mut Self {
        let line = self.line;
        self.module.options.push(OptionDeclaration {
            name: name.to_string(),
            scope,
            value,
            line,
        });
        self
    }

    pub fn add_setting(&mut self, setting: Setting) -> &mut Self {
        let line = self.line;
        self.module.settings.push(Setting { line, ..setting });
        self
    }

    pub fn add_struct(
        &mut self,
        name: &str,
        fields: Vec<Declaration>,
        conditional: Option<ExpressionIndex>,
    ) -> &mut Self {
        let line = self.line;
        self.module.structs.push(StructDefinition {
            name: name.to_string(),
            fields,
            conditional,
            line,
        });
        self
    }

    pub fn add_buffer(
        &mut self,
        name: &str,
        kind: BufferKind,
        fields: Vec<Declaration>,
        conditional: Option<ExpressionIndex>,
    ) -> &mut Self {
        let line = self.line;
        self.module.buffers.push(BufferDefinition {
            name: name.to_string(),
            kind,
            fields,
            conditional,
            line,
        });
        self
    }

    pub fn add_sampler(
        &mut self,
        name: &str,
        settings: Vec<Setting>,
        conditional: Option<ExpressionIndex>,
    ) -> &mut Self {
        let line = self.line;
        self.module.samplers.push(SamplerDefinition {
            name: name.to_string(),
            kind: SamplerKind::Sampler2d,
            settings,
            conditional,
            line,
        });
        self
    }

    pub fn add_function(
        &mut self,
        name: &str,
        return_type_name: &str,
        arguments: Vec<Declaration>,
        body: ExpressionIndex,
        conditional: Option<ExpressionIndex>,
    ) -> &mut Self {
        let line = self.line;
        self.module.functions.push(FunctionDefinition {
            name: name.to_string(),
            return_type_name: return_type_name.to_string(),
            arguments,
            body,
            conditional,
            line,
        });
        self
    }

    /// Take the constructed module
    pub fn finish(self) -> Module {
        self.module
    }
}
