//! Pass 1: post-order type analysis.
//!
//! Walks the AST once, typing every expression node and recording the
//! result in the span-keyed cache. Query blocks push alias/CTE scope
//! frames; the FROM clause is pre-walked before the select list so
//! references resolve, and the WITH clause is analyzed before the body.
//! The pass never fails: whatever cannot be typed becomes UNKNOWN plus a
//! debug log, and conservative decisions surface as warnings.

use crate::diagnostics::Diagnostic;
use crate::oracle_sql_parser::ast::{
    Block, CteDefinition, Expr, ExprKind, FunctionDecl, QueryBlock, SelectItem, SelectStatement,
    Statement, TableExpr, TableRef,
};
use crate::schema_catalog::MetadataIndex;
use crate::utils::identifiers::normalize_oracle_name;

use super::column::resolve_column;
use super::functions::resolve_function;
use super::literal::resolve_literal;
use super::operator::{resolve_binary, resolve_unary};
use super::pseudo_column::resolve_pseudo_column;
use super::scopes::{CteDef, ScopeStack};
use super::type_cache::TypeCache;
use super::types::{highest_precedence, ValueType};

/// Output of the analysis pass.
#[derive(Debug)]
pub struct TypeAnalysis {
    pub cache: TypeCache,
    pub diagnostics: Vec<Diagnostic>,
}

/// Analyze a SELECT statement.
pub fn analyze_select(
    source: &str,
    statement: &SelectStatement<'_>,
    index: &MetadataIndex,
    current_schema: &str,
) -> TypeAnalysis {
    let mut analyzer = TypeAnalyzer::new(source, index, current_schema);
    analyzer.visit_select_statement(statement);
    analyzer.finish()
}

/// Analyze a function or procedure body.
pub fn analyze_callable(
    source: &str,
    declaration: &FunctionDecl<'_>,
    index: &MetadataIndex,
    current_schema: &str,
) -> TypeAnalysis {
    let mut analyzer = TypeAnalyzer::new(source, index, current_schema);
    for param in &declaration.params {
        if let Some(default) = &param.default {
            analyzer.visit_expr(default);
        }
    }
    for declaration in &declaration.declarations {
        if let Some(default) = &declaration.default {
            analyzer.visit_expr(default);
        }
    }
    analyzer.visit_block(&declaration.body);
    analyzer.finish()
}

/// Analyze a standalone scalar expression.
pub fn analyze_expression(
    source: &str,
    expression: &Expr<'_>,
    index: &MetadataIndex,
    current_schema: &str,
) -> TypeAnalysis {
    let mut analyzer = TypeAnalyzer::new(source, index, current_schema);
    analyzer.visit_expr(expression);
    analyzer.finish()
}

struct TypeAnalyzer<'s, 'i> {
    source: &'s str,
    index: &'i MetadataIndex,
    current_schema: String,
    aliases: ScopeStack<String>,
    ctes: ScopeStack<CteDef>,
    cache: TypeCache,
    diagnostics: Vec<Diagnostic>,
}

impl<'s, 'i> TypeAnalyzer<'s, 'i> {
    fn new(source: &'s str, index: &'i MetadataIndex, current_schema: &str) -> Self {
        TypeAnalyzer {
            source,
            index,
            current_schema: current_schema.to_lowercase(),
            aliases: ScopeStack::new(),
            ctes: ScopeStack::new(),
            cache: TypeCache::new(),
            diagnostics: Vec::new(),
        }
    }

    fn finish(self) -> TypeAnalysis {
        debug_assert!(self.aliases.is_empty(), "alias scope leaked");
        debug_assert!(self.ctes.is_empty(), "cte scope leaked");
        TypeAnalysis {
            cache: self.cache,
            diagnostics: self.diagnostics,
        }
    }

    /// Run `f` inside a fresh scope frame on both stacks; the frames are
    /// popped on every exit path.
    fn with_scopes<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.aliases.push_frame();
        self.ctes.push_frame();
        let result = f(self);
        self.aliases.pop_frame();
        self.ctes.pop_frame();
        result
    }

    fn visit_select_statement(&mut self, statement: &SelectStatement<'_>) -> ValueType {
        let value_type = self.with_scopes(|analyzer| {
            for cte in &statement.ctes {
                analyzer.visit_cte(cte);
            }
            let first = analyzer.visit_query_block(&statement.body);
            for branch in &statement.unions {
                analyzer.visit_query_block(&branch.block);
            }
            first
        });
        self.cache
            .record(statement.span(self.source), value_type.clone());
        value_type
    }

    fn visit_cte(&mut self, cte: &CteDefinition<'_>) {
        self.visit_select_statement(&cte.query);
        let columns = self.extract_output_columns(
            &cte.query.body.select_list,
            cte.columns.as_deref(),
            cte.name,
        );
        self.ctes
            .insert(&normalize_oracle_name(cte.name), CteDef { columns });
    }

    /// Column names of a CTE or inline view: the explicit column list
    /// entry if given, else the select alias, else the trailing
    /// identifier of a column expression, else a generated name.
    fn extract_output_columns(
        &mut self,
        select_list: &[SelectItem<'_>],
        explicit: Option<&[&str]>,
        owner_name: &str,
    ) -> Vec<(String, ValueType)> {
        let mut columns = Vec::with_capacity(select_list.len());
        for (i, item) in select_list.iter().enumerate() {
            let value_type = self.cache.lookup(item.expr.span(self.source));
            let name = explicit
                .and_then(|names| names.get(i).copied())
                .map(normalize_oracle_name)
                .or_else(|| item.alias.map(normalize_oracle_name))
                .or_else(|| {
                    item.expr
                        .as_column_path()
                        .map(|path| normalize_oracle_name(path.last()))
                })
                .unwrap_or_else(|| {
                    let generated = format!("column_{i}");
                    self.diagnostics.push(Diagnostic::warning(format!(
                        "no column name for element {} of '{}'; defaulted to '{}'",
                        i + 1,
                        owner_name,
                        generated
                    )));
                    generated
                });
            columns.push((name, value_type));
        }
        columns
    }

    fn visit_query_block(&mut self, block: &QueryBlock<'_>) -> ValueType {
        let value_type = self.with_scopes(|analyzer| {
            // pre-walk FROM so the select list and filters can resolve
            for table_ref in &block.from {
                analyzer.register_table_ref(table_ref);
            }
            for table_ref in &block.from {
                for join in &table_ref.joins {
                    if let Some(on) = &join.on {
                        analyzer.visit_expr(on);
                    }
                }
            }

            let mut first = ValueType::unknown();
            for (i, item) in block.select_list.iter().enumerate() {
                let item_type = analyzer.visit_expr(&item.expr);
                analyzer
                    .cache
                    .record(crate::oracle_sql_parser::ast::Span::of(analyzer.source, item.source), item_type.clone());
                if i == 0 {
                    first = item_type;
                }
            }

            if let Some(where_clause) = &block.where_clause {
                analyzer.visit_expr(where_clause);
            }
            if let Some(start_with) = &block.start_with {
                analyzer.visit_expr(start_with);
            }
            if let Some(connect_by) = &block.connect_by {
                analyzer.visit_expr(&connect_by.condition);
            }
            for expr in &block.group_by {
                analyzer.visit_expr(expr);
            }
            if let Some(having) = &block.having {
                analyzer.visit_expr(having);
            }
            for item in &block.order_by {
                analyzer.visit_expr(&item.expr);
            }

            // a block is scalar-typed only when it projects one column
            if block.select_list.len() == 1 {
                first
            } else {
                ValueType::unknown()
            }
        });
        self.cache.record(block.span(self.source), value_type.clone());
        value_type
    }

    fn register_table_ref(&mut self, table_ref: &TableRef<'_>) {
        self.register_table_primary(&table_ref.table, table_ref.alias);
        for join in &table_ref.joins {
            self.register_table_primary(&join.table, join.alias);
        }
    }

    fn register_table_primary(&mut self, table: &TableExpr<'_>, alias: Option<&str>) {
        match table {
            TableExpr::Named(path) => {
                // the qualified name keeps an explicit schema; stripping
                // it here would break cross-schema column typing
                let qualified = path.joined_lower();
                let alias_name = alias
                    .map(normalize_oracle_name)
                    .unwrap_or_else(|| normalize_oracle_name(path.last()));
                self.aliases.insert(&alias_name, qualified);
            }
            TableExpr::Subquery(statement) => {
                self.visit_select_statement(statement);
                if let Some(alias) = alias {
                    let columns = self.extract_output_columns(
                        &statement.body.select_list,
                        None,
                        alias,
                    );
                    let alias_name = normalize_oracle_name(alias);
                    self.ctes.insert(&alias_name, CteDef { columns });
                    self.aliases.insert(&alias_name, alias_name.clone());
                }
            }
        }
    }

    fn visit_expr(&mut self, expr: &Expr<'_>) -> ValueType {
        let value_type = match &expr.kind {
            ExprKind::Literal(literal) => resolve_literal(literal),
            ExprKind::Column(path) => {
                if path.segments.len() == 1 {
                    if let Some(pseudo) = resolve_pseudo_column(path.last()) {
                        pseudo
                    } else {
                        resolve_column(
                            path,
                            self.index,
                            &self.current_schema,
                            &self.aliases,
                            &self.ctes,
                        )
                    }
                } else if is_sequence_suffix(path.last()) {
                    ValueType::numeric()
                } else {
                    resolve_column(
                        path,
                        self.index,
                        &self.current_schema,
                        &self.aliases,
                        &self.ctes,
                    )
                }
            }
            ExprKind::Star | ExprKind::QualifiedStar(_) => ValueType::unknown(),
            ExprKind::Unary { op, operand } => {
                let operand_type = self.visit_expr(operand);
                resolve_unary(*op, &operand_type)
            }
            ExprKind::Binary { op, left, right } => {
                let left_type = self.visit_expr(left);
                let right_type = self.visit_expr(right);
                resolve_binary(*op, &left_type, &right_type)
            }
            ExprKind::NullTest { operand, .. } => {
                self.visit_expr(operand);
                ValueType::boolean()
            }
            ExprKind::InList { operand, items, .. } => {
                self.visit_expr(operand);
                for item in items {
                    self.visit_expr(item);
                }
                ValueType::boolean()
            }
            ExprKind::InSubquery {
                operand, subquery, ..
            } => {
                self.visit_expr(operand);
                self.visit_select_statement(subquery);
                ValueType::boolean()
            }
            ExprKind::Between {
                operand, low, high, ..
            } => {
                self.visit_expr(operand);
                self.visit_expr(low);
                self.visit_expr(high);
                ValueType::boolean()
            }
            ExprKind::Exists { subquery, .. } => {
                self.visit_select_statement(subquery);
                ValueType::boolean()
            }
            ExprKind::FunctionCall(call) => {
                let arg_types: Vec<ValueType> =
                    call.args.iter().map(|arg| self.visit_expr(arg)).collect();
                resolve_function(&call.name, &arg_types, self.index, &self.current_schema)
            }
            ExprKind::Cast { expr: inner, data_type } => {
                self.visit_expr(inner);
                ValueType::from_oracle(data_type)
            }
            ExprKind::Extract { expr: inner, .. } => {
                self.visit_expr(inner);
                ValueType::numeric()
            }
            ExprKind::Case(case) => {
                if let Some(operand) = &case.operand {
                    self.visit_expr(operand);
                }
                let mut candidates = Vec::new();
                for (condition, result) in &case.when_then {
                    self.visit_expr(condition);
                    candidates.push(self.visit_expr(result));
                }
                if let Some(else_expr) = &case.else_expr {
                    candidates.push(self.visit_expr(else_expr));
                }
                highest_precedence(candidates.iter())
            }
            ExprKind::Paren(inner) => self.visit_expr(inner),
            ExprKind::ScalarSubquery(statement) => self.visit_select_statement(statement),
            ExprKind::IntervalLiteral { .. } => ValueType::unknown(),
            ExprKind::OuterJoinMarker(inner) => self.visit_expr(inner),
        };
        self.cache.record(expr.span(self.source), value_type.clone());
        value_type
    }

    fn visit_block(&mut self, block: &Block<'_>) {
        for statement in &block.statements {
            self.visit_statement(statement);
        }
        for handler in &block.exception_handlers {
            for statement in &handler.statements {
                self.visit_statement(statement);
            }
        }
    }

    fn visit_statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
            }
            Statement::Assignment { value, .. } => {
                self.visit_expr(value);
            }
            Statement::If(if_statement) => {
                for (condition, statements) in &if_statement.branches {
                    self.visit_expr(condition);
                    for statement in statements {
                        self.visit_statement(statement);
                    }
                }
                if let Some(statements) = &if_statement.else_branch {
                    for statement in statements {
                        self.visit_statement(statement);
                    }
                }
            }
            Statement::ForRange(for_loop) => {
                self.visit_expr(&for_loop.lower);
                self.visit_expr(&for_loop.upper);
                for statement in &for_loop.body {
                    self.visit_statement(statement);
                }
            }
            Statement::ForQuery(for_loop) => {
                self.visit_select_statement(&for_loop.query);
                for statement in &for_loop.body {
                    self.visit_statement(statement);
                }
            }
            Statement::Block(block) => self.visit_block(block),
            Statement::Null { .. } => {}
            Statement::Call { call, .. } => {
                for arg in &call.args {
                    self.visit_expr(arg);
                }
            }
            Statement::Select(statement) => {
                self.visit_select_statement(statement);
            }
        }
    }
}

/// `seq.NEXTVAL` / `seq.CURRVAL` type as numbers.
fn is_sequence_suffix(segment: &str) -> bool {
    segment.eq_ignore_ascii_case("nextval") || segment.eq_ignore_ascii_case("currval")
}
