//! AST for the bounded Oracle SQL / PL/SQL subset.
//!
//! Nodes borrow from the statement text being parsed. Every node keeps the
//! trimmed source fragment it was produced from; the fragment's byte range
//! within the statement ([`Span`]) is the stable key the type cache uses
//! across the two passes. The tree is never mutated after parsing.

use nom::Offset;

/// Byte range of a node within the statement being transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Span of `fragment` inside `source`. `fragment` must be a sub-slice
    /// of `source`; parsers only ever hand out sub-slices of their input.
    pub fn of(source: &str, fragment: &str) -> Span {
        let start = source.offset(fragment);
        Span {
            start,
            end: start + fragment.len(),
        }
    }
}

/// A possibly qualified identifier path: `col`, `t.col`, `hr.emp.col`.
#[derive(Debug, PartialEq, Clone)]
pub struct IdentPath<'a> {
    pub segments: Vec<&'a str>,
}

impl<'a> IdentPath<'a> {
    pub fn single(segment: &'a str) -> Self {
        IdentPath {
            segments: vec![segment],
        }
    }

    /// Trailing segment (the column for a column path).
    pub fn last(&self) -> &'a str {
        self.segments.last().expect("paths are non-empty")
    }

    /// Everything before the trailing segment, joined lower-case.
    pub fn qualifier(&self) -> Option<String> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(
            self.segments[..self.segments.len() - 1]
                .iter()
                .map(|s| s.to_lowercase())
                .collect::<Vec<_>>()
                .join("."),
        )
    }

    /// Full path joined lower-case.
    pub fn joined_lower(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal<'a> {
    /// Numeric literal, kept as written.
    Number(&'a str),
    /// String literal including its surrounding quotes.
    String(&'a str),
    /// `DATE '2024-01-31'`; carries the quoted part.
    Date(&'a str),
    /// `TIMESTAMP '2024-01-31 10:00:00'`; carries the quoted part.
    Timestamp(&'a str),
    Null,
    True,
    False,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    /// `PRIOR col` inside a CONNECT BY condition.
    Prior,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// String concatenation `||`.
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
                | BinaryOp::Like
                | BinaryOp::NotLike
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// The PostgreSQL spelling. Oracle-only spellings (`^=`) are folded
    /// into their standard forms during parsing.
    pub fn as_sql(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Concat => "||",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Like => "LIKE",
            BinaryOp::NotLike => "NOT LIKE",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionCall<'a> {
    pub name: IdentPath<'a>,
    pub args: Vec<Expr<'a>>,
    /// `COUNT(DISTINCT x)` and friends.
    pub distinct: bool,
}

/// CASE expression. `operand` is present for the simple form
/// (`CASE x WHEN ...`), absent for the searched form.
#[derive(Debug, PartialEq, Clone)]
pub struct CaseExpr<'a> {
    pub operand: Option<Box<Expr<'a>>>,
    pub when_then: Vec<(Expr<'a>, Expr<'a>)>,
    pub else_expr: Option<Box<Expr<'a>>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Expr<'a> {
    pub kind: ExprKind<'a>,
    /// Trimmed source fragment this node was parsed from.
    pub source: &'a str,
}

impl<'a> Expr<'a> {
    pub fn span(&self, statement_source: &str) -> Span {
        Span::of(statement_source, self.source)
    }

    /// The column path when this node is a bare (possibly parenthesized)
    /// column reference.
    pub fn as_column_path(&self) -> Option<&IdentPath<'a>> {
        match &self.kind {
            ExprKind::Column(path) => Some(path),
            ExprKind::Paren(inner) => inner.as_column_path(),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum ExprKind<'a> {
    Literal(Literal<'a>),
    /// Column or pseudo-column reference.
    Column(IdentPath<'a>),
    /// `*` in a select list or `COUNT(*)`.
    Star,
    /// `t.*`.
    QualifiedStar(IdentPath<'a>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr<'a>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr<'a>>,
        right: Box<Expr<'a>>,
    },
    /// `x IS [NOT] NULL`.
    NullTest {
        operand: Box<Expr<'a>>,
        negated: bool,
    },
    /// `x [NOT] IN (a, b, c)`.
    InList {
        operand: Box<Expr<'a>>,
        items: Vec<Expr<'a>>,
        negated: bool,
    },
    /// `x [NOT] IN (SELECT ...)`.
    InSubquery {
        operand: Box<Expr<'a>>,
        subquery: Box<SelectStatement<'a>>,
        negated: bool,
    },
    /// `x [NOT] BETWEEN low AND high`.
    Between {
        operand: Box<Expr<'a>>,
        low: Box<Expr<'a>>,
        high: Box<Expr<'a>>,
        negated: bool,
    },
    /// `[NOT] EXISTS (SELECT ...)`.
    Exists {
        subquery: Box<SelectStatement<'a>>,
        negated: bool,
    },
    FunctionCall(FunctionCall<'a>),
    /// `CAST(expr AS type)`.
    Cast {
        expr: Box<Expr<'a>>,
        data_type: &'a str,
    },
    /// `EXTRACT(field FROM expr)`.
    Extract {
        field: &'a str,
        expr: Box<Expr<'a>>,
    },
    Case(CaseExpr<'a>),
    /// Explicit parentheses; kept as a distinct node so both passes see it.
    Paren(Box<Expr<'a>>),
    /// `(SELECT ...)` used as a scalar value.
    ScalarSubquery(Box<SelectStatement<'a>>),
    /// `INTERVAL '...' qualifier`; recognized so emission can refuse it
    /// with a useful message instead of a parse error.
    IntervalLiteral {
        value: &'a str,
        qualifier: &'a str,
    },
    /// Oracle `col(+)` legacy outer-join marker; refused at emission.
    OuterJoinMarker(Box<Expr<'a>>),
}

// ----- queries -----

#[derive(Debug, PartialEq, Clone)]
pub struct SelectStatement<'a> {
    pub ctes: Vec<CteDefinition<'a>>,
    pub body: QueryBlock<'a>,
    pub unions: Vec<UnionBranch<'a>>,
    pub source: &'a str,
}

impl<'a> SelectStatement<'a> {
    pub fn span(&self, statement_source: &str) -> Span {
        Span::of(statement_source, self.source)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct UnionBranch<'a> {
    pub all: bool,
    pub block: QueryBlock<'a>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CteDefinition<'a> {
    pub name: &'a str,
    /// Explicit column list, when written.
    pub columns: Option<Vec<&'a str>>,
    pub query: SelectStatement<'a>,
    pub source: &'a str,
}

#[derive(Debug, PartialEq, Clone)]
pub struct QueryBlock<'a> {
    pub distinct: bool,
    pub select_list: Vec<SelectItem<'a>>,
    /// `INTO` targets when the query appears inside a PL/SQL body.
    pub into: Option<Vec<IdentPath<'a>>>,
    pub from: Vec<TableRef<'a>>,
    pub where_clause: Option<Expr<'a>>,
    pub start_with: Option<Expr<'a>>,
    pub connect_by: Option<ConnectBy<'a>>,
    pub group_by: Vec<Expr<'a>>,
    pub having: Option<Expr<'a>>,
    pub order_by: Vec<OrderItem<'a>>,
    pub source: &'a str,
}

impl<'a> QueryBlock<'a> {
    pub fn span(&self, statement_source: &str) -> Span {
        Span::of(statement_source, self.source)
    }

    /// Whether the only source is Oracle's `dual` pseudo-table.
    pub fn selects_from_dual(&self) -> bool {
        if self.from.len() != 1 {
            return false;
        }
        let table_ref = &self.from[0];
        if !table_ref.joins.is_empty() {
            return false;
        }
        match &table_ref.table {
            TableExpr::Named(path) => {
                let joined = path.joined_lower();
                joined == "dual" || joined == "sys.dual"
            }
            TableExpr::Subquery(_) => false,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct ConnectBy<'a> {
    pub nocycle: bool,
    pub condition: Expr<'a>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SelectItem<'a> {
    pub expr: Expr<'a>,
    pub alias: Option<&'a str>,
    pub source: &'a str,
}

#[derive(Debug, PartialEq, Clone)]
pub struct OrderItem<'a> {
    pub expr: Expr<'a>,
    pub descending: bool,
    pub nulls: Option<NullsOrder>,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, PartialEq, Clone)]
pub struct TableRef<'a> {
    pub table: TableExpr<'a>,
    pub alias: Option<&'a str>,
    pub joins: Vec<Join<'a>>,
    pub source: &'a str,
}

#[derive(Debug, PartialEq, Clone)]
pub enum TableExpr<'a> {
    Named(IdentPath<'a>),
    Subquery(Box<SelectStatement<'a>>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Join<'a> {
    pub kind: JoinKind,
    pub table: TableExpr<'a>,
    pub alias: Option<&'a str>,
    /// Absent for CROSS JOIN.
    pub on: Option<Expr<'a>>,
    pub source: &'a str,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

// ----- PL/SQL -----

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CallableKind {
    Function,
    Procedure,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionDecl<'a> {
    pub kind: CallableKind,
    pub or_replace: bool,
    pub name: IdentPath<'a>,
    pub params: Vec<ParamDecl<'a>>,
    /// Present for functions, absent for procedures.
    pub return_type: Option<TypeRef<'a>>,
    pub declarations: Vec<VarDecl<'a>>,
    pub body: Block<'a>,
    pub source: &'a str,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ParamMode {
    In,
    Out,
    InOut,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ParamDecl<'a> {
    pub name: &'a str,
    pub mode: ParamMode,
    pub data_type: TypeRef<'a>,
    pub default: Option<Expr<'a>>,
}

/// A type reference in a declaration position.
#[derive(Debug, PartialEq, Clone)]
pub struct TypeRef<'a> {
    pub source: &'a str,
    pub kind: TypeRefKind<'a>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum TypeRefKind<'a> {
    /// A plain type token, e.g. `VARCHAR2(100)`.
    Scalar(&'a str),
    /// `table.column%TYPE`; resolved against the metadata index.
    ColumnType(IdentPath<'a>),
    /// `table%ROWTYPE`.
    RowType(IdentPath<'a>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct VarDecl<'a> {
    pub name: &'a str,
    pub constant: bool,
    pub data_type: TypeRef<'a>,
    pub not_null: bool,
    pub default: Option<Expr<'a>>,
    pub source: &'a str,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Block<'a> {
    pub statements: Vec<Statement<'a>>,
    pub exception_handlers: Vec<ExceptionHandler<'a>>,
    pub source: &'a str,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ExceptionHandler<'a> {
    /// Exception names; `OTHERS` appears literally.
    pub exceptions: Vec<&'a str>,
    pub statements: Vec<Statement<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct IfStatement<'a> {
    /// `IF`/`ELSIF` branches in order.
    pub branches: Vec<(Expr<'a>, Vec<Statement<'a>>)>,
    pub else_branch: Option<Vec<Statement<'a>>>,
    pub source: &'a str,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ForRangeLoop<'a> {
    pub variable: &'a str,
    pub reverse: bool,
    pub lower: Expr<'a>,
    pub upper: Expr<'a>,
    pub body: Vec<Statement<'a>>,
    pub source: &'a str,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ForQueryLoop<'a> {
    pub variable: &'a str,
    pub query: SelectStatement<'a>,
    pub body: Vec<Statement<'a>>,
    pub source: &'a str,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement<'a> {
    Return {
        value: Option<Expr<'a>>,
        source: &'a str,
    },
    Assignment {
        target: IdentPath<'a>,
        value: Expr<'a>,
        source: &'a str,
    },
    If(IfStatement<'a>),
    ForRange(ForRangeLoop<'a>),
    ForQuery(ForQueryLoop<'a>),
    Block(Block<'a>),
    Null {
        source: &'a str,
    },
    /// Bare procedure/function invocation used as a statement.
    Call {
        call: FunctionCall<'a>,
        source: &'a str,
    },
    /// `SELECT ... INTO ...` inside a body.
    Select(SelectStatement<'a>),
}
