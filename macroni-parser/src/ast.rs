// Macroni AST Definitions
// Abstract Syntax Tree nodes with source positions

use std::fmt;

/// Source position information for AST nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// 1-based line of `start`
    pub line: usize,
    /// 1-based column of `start`
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            line: 0,
            column: 0,
        }
    }

    pub fn with_line_col(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Line number if this span was produced by the parser
    pub fn line(&self) -> Option<usize> {
        (self.line > 0).then_some(self.line)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Top-level program: the statements of one source text
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub source_file: Option<String>,
    pub span: Span,
}

impl Program {
    /// View the program as the block it is evaluated as
    pub fn as_block(&self) -> Block {
        Block {
            statements: self.statements.clone(),
            span: self.span,
        }
    }

    /// Paths named by `import "...";` statements, in source order
    pub fn imports(&self) -> impl Iterator<Item = &ImportStatement> {
        self.statements.iter().filter_map(|stmt| match &stmt.kind {
            StatementKind::Import(import) => Some(import),
            _ => None,
        })
    }
}

/// Brace-delimited statement sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Import(ImportStatement),
    Outer(Identifier),
    FunctionDefinition(FunctionDefinition),
    While(WhileLoop),
    Assignment(Assignment),
    Expression(Expression),
    Break,
    Continue,
    Return(ReturnStatement),
}

impl StatementKind {
    /// Short tag used in debugger and log output
    pub fn name(&self) -> &'static str {
        match self {
            StatementKind::Import(_) => "import_stmt",
            StatementKind::Outer(_) => "outer_stmt",
            StatementKind::FunctionDefinition(_) => "func_def",
            StatementKind::While(_) => "loop_stmt",
            StatementKind::Assignment(_) => "store_val",
            StatementKind::Expression(_) => "expr_stmt",
            StatementKind::Break => "break_stmt",
            StatementKind::Continue => "continue_stmt",
            StatementKind::Return(_) => "return_stmt",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportStatement {
    pub path: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: Identifier,
    pub parameters: Vec<Identifier>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub condition: Expression,
    pub body: Block,
    pub span: Span,
}

/// `a, b = x, y;`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub targets: Vec<Identifier>,
    pub values: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub values: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Identifier(Identifier),
    Parenthesized(Box<Expression>),
    Tuple(Vec<Expression>),
    List(Vec<Expression>),
    Index(IndexExpression),
    BinaryOp(BinaryOperation),
    UnaryOp(UnaryOperation),
    If(IfExpression),
    FunctionCall(FunctionCall),
    BuiltinCall(BuiltinCall),
}

impl ExpressionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExpressionKind::Integer(_) | ExpressionKind::Float(_) => "number",
            ExpressionKind::String(_) => "string",
            ExpressionKind::Boolean(true) => "true",
            ExpressionKind::Boolean(false) => "false",
            ExpressionKind::Null => "null",
            ExpressionKind::Identifier(_) => "var",
            ExpressionKind::Parenthesized(_) => "paren",
            ExpressionKind::Tuple(_) => "tuple",
            ExpressionKind::List(_) => "list",
            ExpressionKind::Index(_) => "index",
            ExpressionKind::BinaryOp(op) => op.operator.name(),
            ExpressionKind::UnaryOp(_) => "neg",
            ExpressionKind::If(_) => "conditional_expr",
            ExpressionKind::FunctionCall(_) => "call",
            ExpressionKind::BuiltinCall(_) => "built_in_call",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    pub target: Box<Expression>,
    pub index: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOperation {
    pub left: Box<Expression>,
    pub operator: BinaryOperator,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOperator {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOperator::Add => "add",
            BinaryOperator::Subtract => "sub",
            BinaryOperator::Multiply => "mul",
            BinaryOperator::Divide => "div",
            BinaryOperator::Modulo => "mod",
            BinaryOperator::Equal => "eq",
            BinaryOperator::NotEqual => "ne",
            BinaryOperator::Less => "lt",
            BinaryOperator::LessEqual => "le",
            BinaryOperator::Greater => "gt",
            BinaryOperator::GreaterEqual => "ge",
            BinaryOperator::LogicalAnd => "and_op",
            BinaryOperator::LogicalOr => "or_op",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::LogicalOr => "||",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOperation {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Minus,
}

/// `if cond { ... } else { ... }` used as an expression
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpression {
    pub condition: Box<Expression>,
    pub then_block: Block,
    pub else_block: Option<Block>,
    pub span: Span,
}

/// Call of a user-defined function
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: Identifier,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

/// Call of an `@`-prefixed built-in
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinCall {
    pub builtin: Builtin,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

/// Argument shape a built-in accepts at the syntax level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinShape {
    /// One or more comma-separated expressions
    Arguments,
    /// Zero or more comma-separated expressions
    OptionalArguments,
    /// Exactly one expression
    Single,
    /// Empty parentheses
    Empty,
    /// Two bare function names
    FunctionNames,
}

/// The fixed table of built-in operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Wait,
    Rand,
    RandInt,
    Time,
    ForeachTick,
    MouseMove,
    SetTemplateDir,
    FindTemplate,
    FindTemplates,
    GetCoordinates,
    CheckPixelColor,
    GetPixelColor,
    LeftClick,
    SendInput,
    PressAndRelease,
    Record,
    Playback,
    RecordingExists,
    Len,
    Shuffle,
    GetPixelAt,
    Append,
    Pop,
    CaptureRegion,
    OcrFindText,
    Swap,
    Copy,
    MousePosition,
}

impl Builtin {
    pub const ALL: [Builtin; 29] = [
        Builtin::Print,
        Builtin::Wait,
        Builtin::Rand,
        Builtin::RandInt,
        Builtin::Time,
        Builtin::ForeachTick,
        Builtin::MouseMove,
        Builtin::SetTemplateDir,
        Builtin::FindTemplate,
        Builtin::FindTemplates,
        Builtin::GetCoordinates,
        Builtin::CheckPixelColor,
        Builtin::GetPixelColor,
        Builtin::LeftClick,
        Builtin::SendInput,
        Builtin::PressAndRelease,
        Builtin::Record,
        Builtin::Playback,
        Builtin::RecordingExists,
        Builtin::Len,
        Builtin::Shuffle,
        Builtin::GetPixelAt,
        Builtin::Append,
        Builtin::Pop,
        Builtin::CaptureRegion,
        Builtin::OcrFindText,
        Builtin::Swap,
        Builtin::Copy,
        Builtin::MousePosition,
    ];

    /// Name as written after the `@`
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Wait => "wait",
            Builtin::Rand => "rand",
            Builtin::RandInt => "rand_i",
            Builtin::Time => "time",
            Builtin::ForeachTick => "foreach_tick",
            Builtin::MouseMove => "mouse_move",
            Builtin::SetTemplateDir => "set_template_dir",
            Builtin::FindTemplate => "find_template",
            Builtin::FindTemplates => "find_templates",
            Builtin::GetCoordinates => "get_coordinates",
            Builtin::CheckPixelColor => "check_pixel_color",
            Builtin::GetPixelColor => "get_pixel_color",
            Builtin::LeftClick => "left_click",
            Builtin::SendInput => "send_input",
            Builtin::PressAndRelease => "press_and_release",
            Builtin::Record => "record",
            Builtin::Playback => "playback",
            Builtin::RecordingExists => "recording_exists",
            Builtin::Len => "len",
            Builtin::Shuffle => "shuffle",
            Builtin::GetPixelAt => "get_pixel_at",
            Builtin::Append => "append",
            Builtin::Pop => "pop",
            Builtin::CaptureRegion => "capture_region",
            Builtin::OcrFindText => "ocr_find_text",
            Builtin::Swap => "swap",
            Builtin::Copy => "copy",
            Builtin::MousePosition => "mouse_position",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn shape(self) -> BuiltinShape {
        match self {
            Builtin::ForeachTick => BuiltinShape::FunctionNames,
            Builtin::SetTemplateDir
            | Builtin::RecordingExists
            | Builtin::Len
            | Builtin::Shuffle
            | Builtin::Copy => BuiltinShape::Single,
            Builtin::LeftClick | Builtin::Time | Builtin::MousePosition => BuiltinShape::Empty,
            Builtin::OcrFindText => BuiltinShape::OptionalArguments,
            _ => BuiltinShape::Arguments,
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}
