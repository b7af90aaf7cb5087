//! Execution contexts: the scoping model threaded through evaluation.
//!
//! A [`Frame`] holds the variables and functions of one call. Sibling
//! contexts share a frame and differ only in the node they evaluate; child
//! contexts get a fresh frame holding a snapshot of the caller's maps, one
//! level deeper, with a weak link back to the caller for `outer` lookups.

use crate::error::{EvalError, Result};
use crate::value::Value;
use macroni_parser::{Block, Expression, FunctionDefinition, Program, Span, Statement};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// The AST node a context is positioned at
#[derive(Debug, Clone, Copy)]
pub enum Node<'n> {
    Program(&'n Program),
    Block(&'n Block),
    Statement(&'n Statement),
    Expression(&'n Expression),
}

impl Node<'_> {
    pub fn span(&self) -> Span {
        match self {
            Node::Program(program) => program.span,
            Node::Block(block) => block.span,
            Node::Statement(statement) => statement.span,
            Node::Expression(expression) => expression.span,
        }
    }

    pub fn line(&self) -> Option<usize> {
        self.span().line()
    }
}

/// Variable and function tables of one call frame
#[derive(Debug, Default)]
pub struct Frame {
    vars: RefCell<HashMap<String, Value>>,
    funcs: RefCell<HashMap<String, Rc<FunctionDefinition>>>,
    /// name -> frame that owns the variable, for names declared `outer`
    outer_vars: RefCell<HashMap<String, Rc<Frame>>>,
    depth: usize,
    parent: Option<Weak<Frame>>,
}

impl Frame {
    fn parent(&self) -> Option<Rc<Frame>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    fn has_var(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionContext<'n> {
    frame: Rc<Frame>,
    node: Option<Node<'n>>,
    debug: bool,
}

impl ExecutionContext<'static> {
    /// Fresh top-level context with empty tables
    pub fn root(debug: bool) -> Self {
        Self {
            frame: Rc::new(Frame::default()),
            node: None,
            debug,
        }
    }
}

impl<'n> ExecutionContext<'n> {
    /// Same frame, new node; writes are visible to every sibling
    pub fn sibling<'m>(&self, node: Node<'m>) -> ExecutionContext<'m> {
        ExecutionContext {
            frame: Rc::clone(&self.frame),
            node: Some(node),
            debug: self.debug,
        }
    }

    /// New frame for a function call: snapshot of this frame's tables with
    /// `locals` layered on top, one level deeper, no `outer` bindings yet
    pub fn child<'m>(&self, locals: Vec<(String, Value)>, node: Node<'m>) -> ExecutionContext<'m> {
        let mut vars = self.frame.vars.borrow().clone();
        vars.extend(locals);

        let frame = Frame {
            vars: RefCell::new(vars),
            funcs: RefCell::new(self.frame.funcs.borrow().clone()),
            outer_vars: RefCell::new(HashMap::new()),
            depth: self.frame.depth + 1,
            parent: Some(Rc::downgrade(&self.frame)),
        };

        ExecutionContext {
            frame: Rc::new(frame),
            node: Some(node),
            debug: self.debug,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn node(&self) -> Option<Node<'n>> {
        self.node
    }

    pub fn depth(&self) -> usize {
        self.frame.depth
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn line(&self) -> Option<usize> {
        self.node.and_then(|node| node.line())
    }

    /// Read a variable, following an `outer` binding to its owner
    pub fn lookup(&self, name: &str) -> Result<Value> {
        let owner = self.frame.outer_vars.borrow().get(name).cloned();
        let value = match owner {
            Some(owner) => owner.vars.borrow().get(name).cloned(),
            None => self.frame.vars.borrow().get(name).cloned(),
        };
        value.ok_or_else(|| EvalError::undefined_variable(name))
    }

    /// Write a variable, into the owning frame when it was declared `outer`
    pub fn assign(&self, name: &str, value: Value) {
        let owner = self.frame.outer_vars.borrow().get(name).cloned();
        match owner {
            Some(owner) => owner.vars.borrow_mut().insert(name.to_string(), value),
            None => self.frame.vars.borrow_mut().insert(name.to_string(), value),
        };
    }

    /// Bind `name` to the nearest calling frame that owns it.
    ///
    /// A mapping the caller already holds is inherited first, so capture is
    /// transitive through nested calls; otherwise callers are searched
    /// innermost first. Returns false when no caller has the variable.
    pub fn declare_outer(&self, name: &str) -> bool {
        let Some(parent) = self.frame.parent() else {
            return false;
        };

        let inherited = parent.outer_vars.borrow().get(name).cloned();
        if let Some(owner) = inherited {
            self.bind_outer(name, owner);
            return true;
        }

        let mut cursor = Some(parent);
        while let Some(frame) = cursor {
            if frame.has_var(name) {
                self.bind_outer(name, frame);
                return true;
            }
            cursor = frame.parent();
        }
        false
    }

    fn bind_outer(&self, name: &str, owner: Rc<Frame>) {
        self.frame
            .outer_vars
            .borrow_mut()
            .insert(name.to_string(), owner);
    }

    pub fn is_outer(&self, name: &str) -> bool {
        self.frame.outer_vars.borrow().contains_key(name)
    }

    pub fn define_function(&self, definition: Rc<FunctionDefinition>) {
        self.frame
            .funcs
            .borrow_mut()
            .insert(definition.name.name.clone(), definition);
    }

    pub fn function(&self, name: &str) -> Option<Rc<FunctionDefinition>> {
        self.frame.funcs.borrow().get(name).cloned()
    }

    /// Variables visible in this frame, sorted by name; `outer` names show
    /// their owner's value
    pub fn variables(&self) -> Vec<(String, Value)> {
        let mut names: Vec<String> = self.frame.vars.borrow().keys().cloned().collect();
        for name in self.frame.outer_vars.borrow().keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort();

        names
            .into_iter()
            .filter_map(|name| self.lookup(&name).ok().map(|value| (name, value)))
            .collect()
    }

    /// Function signatures like `add(a, b)`, sorted by name
    pub fn function_signatures(&self) -> Vec<String> {
        let mut signatures: Vec<String> = self
            .frame
            .funcs
            .borrow()
            .values()
            .map(|func| signature(func))
            .collect();
        signatures.sort();
        signatures
    }
}

pub fn signature(func: &FunctionDefinition) -> String {
    let params: Vec<&str> = func.parameters.iter().map(|p| p.name.as_str()).collect();
    format!("{}({})", func.name.name, params.join(", "))
}
