/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! AST definitions for the C subset with precise source spans.
//!
//! The parser creates this AST first. The constraint builder walks it to
//! allocate constraint variables and emit lattice constraints; the rewrite
//! planner reads the spans back to patch the original text.

use nom_locate::LocatedSpan;
use std::fmt;

/// Parser input span type carrying byte offsets and line/column info.
pub type Span<'a> = LocatedSpan<&'a str>;

/// Source range and anchor position for diagnostics and rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based UTF-8 column.
    pub column: usize,
}

impl SourceSpan {
    /// Creates a source span from parser start/end positions.
    pub fn from_bounds(start: Span<'_>, end: Span<'_>) -> Self {
        Self {
            start: start.location_offset(),
            end: end.location_offset(),
            line: start.location_line() as usize,
            column: start.get_utf8_column(),
        }
    }

    /// Returns span length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true when the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Base (unlayered) C types understood by the converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    Void,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    /// `va_list`; declarations of this type are forced wild at creation.
    VaList,
    /// `struct <name>` reference.
    Struct(String),
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BaseType::Void => "void",
            BaseType::Char => "char",
            BaseType::SignedChar => "signed char",
            BaseType::UnsignedChar => "unsigned char",
            BaseType::Short => "short",
            BaseType::UnsignedShort => "unsigned short",
            BaseType::Int => "int",
            BaseType::UnsignedInt => "unsigned int",
            BaseType::Long => "long",
            BaseType::UnsignedLong => "unsigned long",
            BaseType::LongLong => "long long",
            BaseType::UnsignedLongLong => "unsigned long long",
            BaseType::Float => "float",
            BaseType::Double => "double",
            BaseType::VaList => "va_list",
            BaseType::Struct(name) => return write!(f, "struct {name}"),
        };
        write!(f, "{name}")
    }
}

/// Declared size of one array layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySize {
    /// `[]` with no bound.
    Unsized,
    /// `[n]` with a constant bound.
    Sized(u64),
}

/// One indirection layer of a declared type, outer-most first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeLayer {
    /// A `*` declarator, optionally `const`-qualified.
    Pointer { is_const: bool },
    /// An array declarator.
    Array(ArraySize),
}

/// Signature part of a function or function-pointer type.
#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    /// Return type.
    pub ret: CType,
    /// Parameter declarations.
    pub params: Vec<ParamDecl>,
    /// Trailing `...` in the prototype.
    pub variadic: bool,
}

/// A declared C type: base type plus indirection layers.
///
/// `layers` is ordered outer-most first, so `int *a[4]` has
/// `[Array(Sized(4)), Pointer]` and `int **p` has `[Pointer, Pointer]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CType {
    pub base: BaseType,
    /// `const` on the base type.
    pub is_const: bool,
    pub layers: Vec<TypeLayer>,
    /// Present when this is a function-pointer type; `layers` then holds the
    /// pointer layer(s) written inside the declarator parentheses.
    pub fn_sig: Option<Box<FnSig>>,
}

impl CType {
    /// Creates a scalar type with no indirection.
    pub fn scalar(base: BaseType) -> Self {
        Self {
            base,
            is_const: false,
            layers: Vec::new(),
            fn_sig: None,
        }
    }

    /// Returns true when the type has at least one pointer or array layer.
    pub fn is_pointer_like(&self) -> bool {
        !self.layers.is_empty()
    }

    /// Returns a copy with one more outer pointer layer, as `&expr` produces.
    pub fn pointer_to(&self) -> Self {
        let mut ty = self.clone();
        ty.layers.insert(0, TypeLayer::Pointer { is_const: false });
        ty
    }

    /// Renders the type in C syntax without a declarator name.
    pub fn render(&self) -> String {
        self.render_with_name("")
    }

    /// Renders the type in C syntax around a declarator name.
    pub fn render_with_name(&self, name: &str) -> String {
        let mut out = String::new();
        if self.is_const {
            out.push_str("const ");
        }
        out.push_str(&self.base.to_string());

        let stars: usize = self
            .layers
            .iter()
            .filter(|layer| matches!(layer, TypeLayer::Pointer { .. }))
            .count();
        let arrays: Vec<&ArraySize> = self
            .layers
            .iter()
            .filter_map(|layer| match layer {
                TypeLayer::Array(size) => Some(size),
                TypeLayer::Pointer { .. } => None,
            })
            .collect();

        if let Some(sig) = &self.fn_sig {
            // Function pointers print as `ret (*name)(params)`.
            out.push_str(" (");
            for _ in 0..stars.max(1) {
                out.push('*');
            }
            out.push_str(name);
            out.push(')');
            out.push('(');
            for (idx, param) in sig.params.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                out.push_str(&param.render());
            }
            if sig.variadic {
                if !sig.params.is_empty() {
                    out.push_str(", ");
                }
                out.push_str("...");
            }
            out.push(')');
            return out;
        }

        out.push(' ');
        for _ in 0..stars {
            out.push('*');
        }
        out.push_str(name);
        for size in arrays {
            match size {
                ArraySize::Unsized => out.push_str("[]"),
                ArraySize::Sized(n) => out.push_str(&format!("[{n}]")),
            }
        }
        if name.is_empty() {
            // Drop the trailing space left by a nameless scalar rendering.
            while out.ends_with(' ') {
                out.pop();
            }
        }
        out
    }
}

/// Checked bounds annotation attached to a declarator (`: itype(...)`,
/// `: count(...)`, `: byte_count(...)`).
#[derive(Debug, Clone, PartialEq)]
pub enum BoundsAnnotation {
    Itype(CType),
    Count(Box<Expr>),
    ByteCount(Box<Expr>),
}

/// Storage class written on a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    None,
    Extern,
    Static,
}

/// One declarator inside a (possibly multi-declarator) declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    /// Declared name.
    pub name: String,
    /// Full type of this declarator (shared base plus its own layers).
    pub ty: CType,
    /// Optional initializer expression.
    pub init: Option<Expr>,
    /// Optional checked bounds annotation.
    pub bounds: Option<BoundsAnnotation>,
    /// Span of this declarator (stars through initializer end).
    pub span: SourceSpan,
    /// Span of just the declared name, the persistent location anchor.
    pub name_span: SourceSpan,
    /// End offset of the declarator head, before any bounds annotation or
    /// initializer. Type rewrites replace up to here so initializers are
    /// preserved verbatim.
    pub head_end: usize,
}

/// A variable declaration statement, possibly with several declarators.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub storage: Storage,
    pub declarators: Vec<Declarator>,
    /// Span of the whole statement including the trailing `;`.
    pub span: SourceSpan,
}

/// One field of a struct definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: CType,
    /// Span of the whole field declaration excluding the trailing `;`.
    pub span: SourceSpan,
    /// Span of just the field name.
    pub name_span: SourceSpan,
}

/// A struct definition with named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub span: SourceSpan,
}

/// One function parameter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    /// Parameter name; prototypes may omit it.
    pub name: Option<String>,
    pub ty: CType,
    /// Optional checked bounds annotation.
    pub bounds: Option<BoundsAnnotation>,
    /// Span of the whole parameter declaration.
    pub span: SourceSpan,
}

impl ParamDecl {
    /// Renders the parameter in C syntax, bounds annotation included.
    pub fn render(&self) -> String {
        let name = self.name.as_deref().unwrap_or("");
        let mut out = self.ty.render_with_name(name);
        if let Some(bounds) = &self.bounds {
            match bounds {
                BoundsAnnotation::Itype(ty) => {
                    out.push_str(&format!(" : itype({})", ty.render()));
                }
                BoundsAnnotation::Count(expr) => {
                    out.push_str(&format!(" : count({})", expr.render()));
                }
                BoundsAnnotation::ByteCount(expr) => {
                    out.push_str(&format!(" : byte_count({})", expr.render()));
                }
            }
        }
        out
    }
}

/// A function declaration or definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub storage: Storage,
    pub name: String,
    pub ret: CType,
    /// Span of the return type tokens, used for return-type rewrites.
    pub ret_span: SourceSpan,
    pub params: Vec<ParamDecl>,
    pub variadic: bool,
    /// `Some` when this declaration carries a body (a definition).
    pub body: Option<Vec<Stmt>>,
    pub span: SourceSpan,
    /// Span of just the function name.
    pub name_span: SourceSpan,
}

impl FunctionDecl {
    /// Returns true when the declaration is a definition.
    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }
}

/// Top-level item of one translation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum TopItem {
    Struct(StructDef),
    Var(VarDecl),
    Function(FunctionDecl),
}

/// Full parsed translation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    pub items: Vec<TopItem>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Deref,
    AddrOf,
    Neg,
    LogicalNot,
    BitNot,
    PreInc,
    PreDec,
}

/// Postfix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    PostInc,
    PostDec,
}

/// Binary (non-assignment) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogicalAnd,
    LogicalOr,
}

impl BinOp {
    /// Returns the operator's source token.
    pub fn token(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::EqEq => "==",
            BinOp::Ne => "!=",
            BinOp::BitAnd => "&",
            BinOp::BitXor => "^",
            BinOp::BitOr => "|",
            BinOp::LogicalAnd => "&&",
            BinOp::LogicalOr => "||",
        }
    }
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
}

impl AssignOp {
    /// Returns the operator's source token.
    pub fn token(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::RemAssign => "%=",
        }
    }

    /// Returns true for `+=` and `-=`, the pointer-arithmetic forms.
    pub fn is_additive(&self) -> bool {
        matches!(self, AssignOp::AddAssign | AssignOp::SubAssign)
    }
}

/// Expression node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal (decimal, hex, or character constant).
    IntLit(i64),
    /// String literal, raw text without quotes.
    StrLit(String),
    /// Identifier reference.
    Ident(String),
    /// Unary operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Postfix increment/decrement.
    Postfix { op: PostfixOp, operand: Box<Expr> },
    /// Binary operation.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Assignment or compound assignment.
    Assign {
        op: AssignOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Conditional `cond ? a : b`.
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// Function call.
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// Array subscript.
    Index { base: Box<Expr>, index: Box<Expr> },
    /// Member access (`.` or `->`).
    Member {
        base: Box<Expr>,
        field: String,
        arrow: bool,
    },
    /// C-style cast `(T)expr`.
    Cast {
        ty: CType,
        /// Span of the parenthesized type tokens, for cast comment-out.
        ty_span: SourceSpan,
        operand: Box<Expr>,
    },
    /// `sizeof(type)`.
    SizeofType(CType),
    /// `sizeof expr`.
    SizeofExpr(Box<Expr>),
    /// Parenthesized expression, kept for faithful re-rendering.
    Paren(Box<Expr>),
}

/// Spanned expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

impl Expr {
    /// Strips parentheses from the expression.
    pub fn ignore_parens(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Paren(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }

    /// Strips parentheses and C-style casts from the expression.
    pub fn ignore_casts(&self) -> &Expr {
        let mut expr = self.ignore_parens();
        loop {
            match &expr.kind {
                ExprKind::Cast { operand, .. } => expr = operand.ignore_parens(),
                _ => return expr,
            }
        }
    }

    /// Folds the expression to an integer constant when possible.
    pub fn as_int_constant(&self) -> Option<i64> {
        match &self.kind {
            ExprKind::IntLit(value) => Some(*value),
            ExprKind::Paren(inner) => inner.as_int_constant(),
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => operand.as_int_constant().map(|value| -value),
            ExprKind::Cast { operand, .. } => operand.as_int_constant(),
            _ => None,
        }
    }

    /// Returns true for a null pointer constant (`0`, possibly cast).
    pub fn is_null_pointer_constant(&self) -> bool {
        self.as_int_constant() == Some(0)
    }

    /// Renders the expression back to C syntax.
    ///
    /// Used when multi-declarator lines are rebuilt; the rendering favors
    /// explicit parentheses over precedence reconstruction.
    pub fn render(&self) -> String {
        match &self.kind {
            ExprKind::IntLit(value) => value.to_string(),
            ExprKind::StrLit(text) => format!("\"{text}\""),
            ExprKind::Ident(name) => name.clone(),
            ExprKind::Unary { op, operand } => {
                let token = match op {
                    UnaryOp::Deref => "*",
                    UnaryOp::AddrOf => "&",
                    UnaryOp::Neg => "-",
                    UnaryOp::LogicalNot => "!",
                    UnaryOp::BitNot => "~",
                    UnaryOp::PreInc => "++",
                    UnaryOp::PreDec => "--",
                };
                format!("{token}{}", operand.render())
            }
            ExprKind::Postfix { op, operand } => {
                let token = match op {
                    PostfixOp::PostInc => "++",
                    PostfixOp::PostDec => "--",
                };
                format!("{}{token}", operand.render())
            }
            ExprKind::Binary { op, lhs, rhs } => {
                format!("{} {} {}", lhs.render(), op.token(), rhs.render())
            }
            ExprKind::Assign { op, lhs, rhs } => {
                format!("{} {} {}", lhs.render(), op.token(), rhs.render())
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => format!(
                "{} ? {} : {}",
                cond.render(),
                then_expr.render(),
                else_expr.render()
            ),
            ExprKind::Call { callee, args } => {
                let rendered: Vec<String> = args.iter().map(Expr::render).collect();
                format!("{}({})", callee.render(), rendered.join(", "))
            }
            ExprKind::Index { base, index } => {
                format!("{}[{}]", base.render(), index.render())
            }
            ExprKind::Member { base, field, arrow } => {
                let sep = if *arrow { "->" } else { "." };
                format!("{}{sep}{field}", base.render())
            }
            ExprKind::Cast { ty, operand, .. } => {
                format!("({}){}", ty.render(), operand.render())
            }
            ExprKind::SizeofType(ty) => format!("sizeof({})", ty.render()),
            ExprKind::SizeofExpr(operand) => format!("sizeof {}", operand.render()),
            ExprKind::Paren(inner) => format!("({})", inner.render()),
        }
    }
}

/// Statement node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Variable declaration statement.
    Decl(VarDecl),
    /// Expression statement.
    Expr(Expr),
    /// `{ ... }` block.
    Compound(Vec<Stmt>),
    /// `if` with optional `else`.
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// `while` loop.
    While { cond: Expr, body: Box<Stmt> },
    /// `for` loop; the init clause may be a declaration or expression.
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `return` with optional value.
    Return(Option<Expr>),
    Break,
    Continue,
    /// Lone `;`.
    Empty,
}

/// Spanned statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}
