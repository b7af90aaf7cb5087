//! Tree-walking evaluation of programs, statements and expressions.
//!
//! Every sub-evaluation runs in a sibling context positioned at the child
//! node, so the frame is shared and only the node changes. Function calls
//! are the one place a child context is created.

use crate::context::{signature, ExecutionContext, Node};
use crate::control::{value_of, values_of, ControlSignal, Outcome, SignalKind};
use crate::error::{EvalError, Result};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::value::Value;
use macroni_parser::{
    Assignment, BinaryOperation, BinaryOperator, Expression, ExpressionKind, FunctionCall,
    IfExpression, Statement, StatementKind, UnaryOperator, WhileLoop,
};
use std::cmp::Ordering;
use std::rc::Rc;

/// Nested user function calls allowed before evaluation fails
pub const MAX_CALL_DEPTH: usize = 128;

impl<H: Host> Interpreter<H> {
    /// Evaluate the node `ctx` is positioned at
    pub fn eval(&mut self, ctx: &ExecutionContext<'_>) -> Result<Outcome> {
        let Some(node) = ctx.node() else {
            return Err(EvalError::internal("context is not positioned at a node"));
        };

        let result = match node {
            Node::Program(program) => self.eval_statements(ctx, &program.statements),
            Node::Block(block) => self.eval_statements(ctx, &block.statements),
            Node::Statement(statement) => self.eval_statement(ctx, statement),
            Node::Expression(expression) => self.eval_expression(ctx, expression),
        };
        result.map_err(|error| error.with_span(node.span()))
    }

    pub fn eval_sibling(&mut self, ctx: &ExecutionContext<'_>, node: Node<'_>) -> Result<Outcome> {
        self.eval(&ctx.sibling(node))
    }

    /// Run statements in order, stopping at the first control signal. The
    /// result is the last statement's value; an empty block is 0.
    fn eval_statements(
        &mut self,
        ctx: &ExecutionContext<'_>,
        statements: &[Statement],
    ) -> Result<Outcome> {
        let mut last = Value::Integer(0);
        for statement in statements {
            let statement_ctx = ctx.sibling(Node::Statement(statement));
            self.maybe_pause(&statement_ctx);

            match self.eval(&statement_ctx)? {
                Outcome::Value(value) => last = value,
                signal @ Outcome::Signal(_) => return Ok(signal),
            }
        }
        Ok(Outcome::Value(last))
    }

    fn eval_statement(&mut self, ctx: &ExecutionContext<'_>, statement: &Statement) -> Result<Outcome> {
        match &statement.kind {
            StatementKind::Import(import) => {
                tracing::debug!(path = %import.path, "import already resolved by the loader");
                Ok(Outcome::null())
            }

            StatementKind::Outer(name) => {
                if !ctx.declare_outer(&name.name) {
                    tracing::warn!(
                        name = %name.name,
                        line = statement.span.line,
                        "outer variable has no owner in any calling frame"
                    );
                }
                Ok(Outcome::null())
            }

            StatementKind::FunctionDefinition(definition) => {
                let description = format!("Defined {}", signature(definition));
                tracing::trace!(function = %definition.name.name, "defining function");
                ctx.define_function(Rc::new(definition.clone()));
                Ok(Outcome::Value(Value::String(description)))
            }

            StatementKind::While(while_loop) => self.eval_while(ctx, while_loop),

            StatementKind::Assignment(assignment) => self.eval_assignment(ctx, assignment),

            StatementKind::Expression(expression) => {
                self.eval_sibling(ctx, Node::Expression(expression))
            }

            StatementKind::Break => Ok(Outcome::Signal(ControlSignal::new(
                SignalKind::Break,
                Vec::new(),
            ))),

            StatementKind::Continue => Ok(Outcome::Signal(ControlSignal::new(
                SignalKind::Continue,
                Vec::new(),
            ))),

            StatementKind::Return(ret) => {
                let values = values_of!(self, ctx, &ret.values);
                Ok(Outcome::Signal(ControlSignal::new(SignalKind::Return, values)))
            }
        }
    }

    fn eval_while(&mut self, ctx: &ExecutionContext<'_>, while_loop: &WhileLoop) -> Result<Outcome> {
        let zero = Value::Integer(0);
        loop {
            let condition =
                value_of!(self.eval_sibling(ctx, Node::Expression(&while_loop.condition))?);
            if condition.equals(&zero)? {
                break;
            }

            if let Outcome::Signal(signal) = self.eval_sibling(ctx, Node::Block(&while_loop.body))? {
                match signal.kind {
                    SignalKind::Break => break,
                    SignalKind::Continue => continue,
                    SignalKind::Return => return Ok(Outcome::Signal(signal)),
                }
            }
        }
        Ok(Outcome::Value(zero))
    }

    /// `a = x;` binds one value as-is. `a, b = ...;` flattens list and tuple
    /// values and needs exactly one value per target.
    fn eval_assignment(
        &mut self,
        ctx: &ExecutionContext<'_>,
        assignment: &Assignment,
    ) -> Result<Outcome> {
        let values = values_of!(self, ctx, &assignment.values);
        let targets = &assignment.targets;

        let values = if targets.len() == 1 {
            if values.len() != 1 {
                return Err(EvalError::arity_mismatch(
                    format!("assignment to {}", targets[0].name),
                    1,
                    values.len(),
                ));
            }
            values
        } else {
            let flattened: Vec<Value> = values
                .into_iter()
                .flat_map(|value| match value.sequence_items() {
                    Some(items) => items,
                    None => vec![value],
                })
                .collect();
            if flattened.len() != targets.len() {
                let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
                return Err(EvalError::arity_mismatch(
                    format!("assignment to {}", names.join(", ")),
                    targets.len(),
                    flattened.len(),
                ));
            }
            flattened
        };

        for (target, value) in targets.iter().zip(values) {
            ctx.assign(&target.name, value);
        }
        Ok(Outcome::null())
    }

    fn eval_expression(
        &mut self,
        ctx: &ExecutionContext<'_>,
        expression: &Expression,
    ) -> Result<Outcome> {
        let value = match &expression.kind {
            ExpressionKind::Integer(n) => Value::Integer(*n),
            ExpressionKind::Float(f) => Value::Float(*f),
            ExpressionKind::String(s) => Value::String(s.clone()),
            ExpressionKind::Boolean(flag) => Value::from_bool(*flag),
            ExpressionKind::Null => Value::Null,

            ExpressionKind::Identifier(name) => ctx.lookup(&name.name)?,

            ExpressionKind::Parenthesized(inner) => {
                return self.eval_sibling(ctx, Node::Expression(inner));
            }

            ExpressionKind::Tuple(items) => Value::tuple(values_of!(self, ctx, items)),
            ExpressionKind::List(items) => Value::list(values_of!(self, ctx, items)),

            ExpressionKind::Index(index) => {
                let target = value_of!(self.eval_sibling(ctx, Node::Expression(&index.target))?);
                let position = value_of!(self.eval_sibling(ctx, Node::Expression(&index.index))?);
                target.index(&position)?
            }

            ExpressionKind::BinaryOp(operation) => return self.eval_binary(ctx, operation),

            ExpressionKind::UnaryOp(operation) => {
                let operand =
                    value_of!(self.eval_sibling(ctx, Node::Expression(&operation.operand))?);
                match operation.operator {
                    UnaryOperator::Minus => operand.negate()?,
                }
            }

            ExpressionKind::If(conditional) => return self.eval_if(ctx, conditional),

            ExpressionKind::FunctionCall(call) => return self.call_function(ctx, call),

            ExpressionKind::BuiltinCall(call) => return self.call_builtin(ctx, call),
        };
        Ok(Outcome::Value(value))
    }

    fn eval_binary(
        &mut self,
        ctx: &ExecutionContext<'_>,
        operation: &BinaryOperation,
    ) -> Result<Outcome> {
        let left = value_of!(self.eval_sibling(ctx, Node::Expression(&operation.left))?);

        // && and || decide on the left operand alone when they can
        match operation.operator {
            BinaryOperator::LogicalAnd if !left.is_truthy() => {
                return Ok(Outcome::Value(Value::Integer(0)));
            }
            BinaryOperator::LogicalOr if left.is_truthy() => {
                return Ok(Outcome::Value(Value::Integer(1)));
            }
            _ => {}
        }

        let right = value_of!(self.eval_sibling(ctx, Node::Expression(&operation.right))?);
        Ok(Outcome::Value(apply_binary(operation.operator, &left, &right)?))
    }

    fn eval_if(&mut self, ctx: &ExecutionContext<'_>, conditional: &IfExpression) -> Result<Outcome> {
        let condition = value_of!(self.eval_sibling(ctx, Node::Expression(&conditional.condition))?);

        if condition.is_truthy() {
            self.eval_sibling(ctx, Node::Block(&conditional.then_block))
        } else if let Some(else_block) = &conditional.else_block {
            self.eval_sibling(ctx, Node::Block(else_block))
        } else {
            Ok(Outcome::null())
        }
    }

    /// Call a user function: arguments are evaluated in the caller's frame,
    /// the body runs in a child frame, and `return` is consumed here
    fn call_function(&mut self, ctx: &ExecutionContext<'_>, call: &FunctionCall) -> Result<Outcome> {
        let arguments = values_of!(self, ctx, &call.arguments);

        let name = &call.name.name;
        let function = ctx
            .function(name)
            .ok_or_else(|| EvalError::undefined_function(name))?;

        if function.parameters.len() != arguments.len() {
            return Err(EvalError::arity_mismatch(
                format!("{name}()"),
                function.parameters.len(),
                arguments.len(),
            ));
        }
        if ctx.depth() >= MAX_CALL_DEPTH {
            return Err(EvalError::call_depth(MAX_CALL_DEPTH));
        }

        tracing::trace!(function = %name, depth = ctx.depth() + 1, "calling function");

        let locals = function
            .parameters
            .iter()
            .map(|parameter| parameter.name.clone())
            .zip(arguments)
            .collect();
        let callee = ctx.child(locals, Node::Block(&function.body));

        let result = match self.eval(&callee)? {
            Outcome::Signal(signal) if signal.kind == SignalKind::Return => signal.into_payload(),
            Outcome::Signal(_) | Outcome::Value(Value::Null) => Value::Integer(0),
            Outcome::Value(value) => value,
        };
        Ok(Outcome::Value(result))
    }
}

fn apply_binary(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    let ordered = |accept: fn(Ordering) -> bool| -> Result<Value> {
        let ordering = left.compare(right, operator.symbol())?;
        Ok(Value::from_bool(ordering.is_some_and(accept)))
    };

    match operator {
        BinaryOperator::Add => left.add(right),
        BinaryOperator::Subtract => left.subtract(right),
        BinaryOperator::Multiply => left.multiply(right),
        BinaryOperator::Divide => left.divide(right),
        BinaryOperator::Modulo => left.modulo(right),
        BinaryOperator::Equal => Ok(Value::from_bool(left.equals(right)?)),
        BinaryOperator::NotEqual => Ok(Value::from_bool(!left.equals(right)?)),
        BinaryOperator::Less => ordered(Ordering::is_lt),
        BinaryOperator::LessEqual => ordered(Ordering::is_le),
        BinaryOperator::Greater => ordered(Ordering::is_gt),
        BinaryOperator::GreaterEqual => ordered(Ordering::is_ge),
        BinaryOperator::LogicalAnd => Ok(Value::from_bool(left.is_truthy() && right.is_truthy())),
        BinaryOperator::LogicalOr => Ok(Value::from_bool(left.is_truthy() || right.is_truthy())),
    }
}
