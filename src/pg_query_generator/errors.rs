use thiserror::Error;

/// Hard failures of the emission pass. Every message tells the caller
/// what the limitation is and, where one exists, the rewrite to apply by
/// hand. One error fails the enclosing object only; sibling objects are
/// unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PgGeneratorError {
    #[error(
        "CONNECT BY NOCYCLE is not supported. Apply one of the workarounds manually: \
         collect visited keys into a path array column and filter with \
         'NOT child.id = ANY(h.path_ids)', or bound the recursion with a depth guard \
         such as 'h.level < 100' in the recursive member."
    )]
    NocycleNotSupported,
    #[error(
        "CONNECT BY without START WITH is not supported: the recursive CTE needs an \
         anchor member. Add a START WITH condition that selects the root rows."
    )]
    ConnectByWithoutStartWith,
    #[error(
        "START WITH without CONNECT BY is not valid; either drop the clause or add \
         the CONNECT BY condition."
    )]
    StartWithWithoutConnectBy,
    #[error(
        "the CONNECT BY condition contains no PRIOR operator, so the parent/child \
         join cannot be derived. Write the condition as 'PRIOR <parent_col> = <child_col>'."
    )]
    NoPriorInConnectBy,
    #[error(
        "only a single 'PRIOR <col> = <col>' comparison is supported as the CONNECT BY \
         condition; move extra predicates into the WHERE clause."
    )]
    UnsupportedConnectByCondition,
    #[error(
        "hierarchical queries over multiple FROM tables are not supported; join the \
         extra tables against the generated hierarchy CTE in an outer query instead."
    )]
    MultipleTablesInConnectBy,
    #[error(
        "hierarchical queries over a FROM subquery are not supported; materialize the \
         subquery as a view or a named CTE first."
    )]
    SubqueryInConnectBy,
    #[error(
        "UNION combined with CONNECT BY is not supported; wrap the hierarchical query \
         in its own view and union over that."
    )]
    UnionWithConnectBy,
    #[error(
        "pseudo-column {0} is not supported; restructure the query to carry the root \
         (or leaf) information in an explicit column of the recursive CTE."
    )]
    UnsupportedPseudoColumn(String),
    #[error(
        "SYS_CONNECT_BY_PATH may only appear as its own select-list item or ORDER BY \
         entry of a CONNECT BY query."
    )]
    MisplacedConnectByPath,
    #[error("SYS_CONNECT_BY_PATH is only meaningful inside a CONNECT BY query.")]
    PathOutsideConnectBy,
    #[error(
        "INTERVAL literals are not supported; multiply a number by interval '1 day' \
         (or the unit you need) on the PostgreSQL side instead."
    )]
    IntervalLiteralNotSupported,
    #[error(
        "ROWNUM is not supported; use LIMIT / FETCH FIRST n ROWS ONLY to cap rows, or \
         row_number() OVER (ORDER BY ...) to number them."
    )]
    RownumNotSupported,
    #[error(
        "the legacy Oracle (+) outer-join syntax is not supported; rewrite the query \
         with ANSI LEFT/RIGHT JOIN."
    )]
    LegacyOuterJoinNotSupported,
    #[error("PRIOR is only meaningful inside a CONNECT BY condition.")]
    PriorOutsideConnectBy,
    #[error(
        "unsupported {function} format mask '{mask}'; supported masks are YYYY/YEAR, \
         Q, MM/MONTH/MON, WW/IW/W, DD/DDD/J, HH/HH24 and MI."
    )]
    UnsupportedDateMask { function: String, mask: String },
    #[error(
        "ROUND(date, format) has no direct PostgreSQL equivalent; truncate with \
         date_trunc and round by adding half of the unit manually."
    )]
    DateRoundMaskNotSupported,
}
