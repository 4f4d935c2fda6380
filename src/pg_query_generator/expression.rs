//! Expression emission.

use crate::oracle_sql_parser::ast::{
    BinaryOp, CaseExpr, Expr, ExprKind, FunctionCall, IdentPath, Literal, UnaryOp,
};
use crate::type_inference::TypeCategory;
use crate::utils::identifiers::{emit_ident, normalize_oracle_name};
use crate::utils::type_mapping::map_oracle_type;

use super::function_registry::get_function_mapping;
use super::{PgGeneratorError, SqlRenderer};

impl SqlRenderer<'_, '_, '_> {
    /// Public entry for standalone expression transformation.
    pub fn render_expression(&mut self, expr: &Expr<'_>) -> Result<String, PgGeneratorError> {
        self.render_expr(expr)
    }

    pub(crate) fn render_expr(&mut self, expr: &Expr<'_>) -> Result<String, PgGeneratorError> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(render_literal(literal)),
            ExprKind::Column(path) => self.render_column_path(path),
            ExprKind::Star => Ok("*".to_string()),
            ExprKind::QualifiedStar(path) => Ok(format!("{}.*", self.render_ident_path(path))),
            ExprKind::Unary { op, operand } => self.render_unary(*op, operand),
            ExprKind::Binary { op, left, right } => self.render_binary(*op, left, right),
            ExprKind::NullTest { operand, negated } => {
                let operand_sql = self.render_expr(operand)?;
                Ok(format!(
                    "{} IS {}NULL",
                    operand_sql,
                    if *negated { "NOT " } else { "" }
                ))
            }
            ExprKind::InList {
                operand,
                items,
                negated,
            } => {
                let operand_sql = self.render_expr(operand)?;
                let rendered: Result<Vec<_>, _> =
                    items.iter().map(|item| self.render_expr(item)).collect();
                Ok(format!(
                    "{} {}IN ({})",
                    operand_sql,
                    if *negated { "NOT " } else { "" },
                    rendered?.join(", ")
                ))
            }
            ExprKind::InSubquery {
                operand,
                subquery,
                negated,
            } => {
                let operand_sql = self.render_expr(operand)?;
                let subquery_sql = self.render_select_statement(subquery)?;
                Ok(format!(
                    "{} {}IN ({})",
                    operand_sql,
                    if *negated { "NOT " } else { "" },
                    subquery_sql
                ))
            }
            ExprKind::Between {
                operand,
                low,
                high,
                negated,
            } => {
                let operand_sql = self.render_expr(operand)?;
                let low_sql = self.render_expr(low)?;
                let high_sql = self.render_expr(high)?;
                Ok(format!(
                    "{} {}BETWEEN {} AND {}",
                    operand_sql,
                    if *negated { "NOT " } else { "" },
                    low_sql,
                    high_sql
                ))
            }
            ExprKind::Exists { subquery, negated } => {
                let subquery_sql = self.render_select_statement(subquery)?;
                Ok(format!(
                    "{}EXISTS ({})",
                    if *negated { "NOT " } else { "" },
                    subquery_sql
                ))
            }
            ExprKind::FunctionCall(call) => self.render_function_call(call),
            ExprKind::Cast { expr: inner, data_type } => {
                let inner_sql = self.render_expr(inner)?;
                Ok(format!("CAST({} AS {})", inner_sql, map_oracle_type(data_type)))
            }
            ExprKind::Extract { field, expr: inner } => {
                let inner_sql = self.render_expr(inner)?;
                Ok(format!("EXTRACT({} FROM {})", field.to_uppercase(), inner_sql))
            }
            ExprKind::Case(case) => self.render_case(case),
            ExprKind::Paren(inner) => Ok(format!("({})", self.render_expr(inner)?)),
            ExprKind::ScalarSubquery(statement) => {
                Ok(format!("({})", self.render_select_statement(statement)?))
            }
            ExprKind::IntervalLiteral { .. } => Err(PgGeneratorError::IntervalLiteralNotSupported),
            ExprKind::OuterJoinMarker(_) => Err(PgGeneratorError::LegacyOuterJoinNotSupported),
        }
    }

    pub(crate) fn render_ident_path(&self, path: &IdentPath<'_>) -> String {
        path.segments
            .iter()
            .map(|segment| emit_ident(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn render_column_path(&mut self, path: &IdentPath<'_>) -> Result<String, PgGeneratorError> {
        if path.segments.len() == 1 {
            // a quoted identifier is never a pseudo-column
            if path.last().starts_with('"') {
                return Ok(emit_ident(path.last()));
            }
            let lowered = normalize_oracle_name(path.last());
            return match lowered.as_str() {
                "sysdate" | "current_date" => Ok("current_date".to_string()),
                "systimestamp" | "current_timestamp" => Ok("current_timestamp".to_string()),
                "localtimestamp" => Ok("localtimestamp".to_string()),
                "dbtimezone" | "sessiontimezone" => Ok("current_setting('TIMEZONE')".to_string()),
                "user" => Ok("current_user".to_string()),
                "rowid" => {
                    self.ctx.warn(
                        "ROWID has no PostgreSQL equivalent; emitted the system column ctid, \
                         which is not stable across updates",
                    );
                    Ok("ctid".to_string())
                }
                "rownum" => Err(PgGeneratorError::RownumNotSupported),
                "connect_by_root" | "connect_by_isleaf" => Err(
                    PgGeneratorError::UnsupportedPseudoColumn(lowered.to_uppercase()),
                ),
                "level" => match &self.level_replacement {
                    Some(replacement) => Ok(replacement.clone()),
                    None => Ok(emit_ident(path.last())),
                },
                _ => Ok(emit_ident(path.last())),
            };
        }

        // seq.NEXTVAL / seq.CURRVAL
        let last = normalize_oracle_name(path.last());
        if last == "nextval" || last == "currval" {
            let sequence = &path.segments[..path.segments.len() - 1];
            let target = if sequence.len() == 1 {
                match self.ctx.resolve_object_synonym(sequence[0]) {
                    Some((schema, name)) => format!("{}.{}", schema, name),
                    None => normalize_oracle_name(sequence[0]),
                }
            } else {
                sequence
                    .iter()
                    .map(|segment| normalize_oracle_name(segment))
                    .collect::<Vec<_>>()
                    .join(".")
            };
            return Ok(format!("{}('{}')", last, target));
        }

        Ok(self.render_ident_path(path))
    }

    fn render_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr<'_>,
    ) -> Result<String, PgGeneratorError> {
        match op {
            UnaryOp::Prior => Err(PgGeneratorError::PriorOutsideConnectBy),
            UnaryOp::Not => Ok(format!("NOT {}", self.render_expr(operand)?)),
            UnaryOp::Minus => Ok(format!("-{}", self.render_expr(operand)?)),
            UnaryOp::Plus => Ok(format!("+{}", self.render_expr(operand)?)),
        }
    }

    fn render_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr<'_>,
        right: &Expr<'_>,
    ) -> Result<String, PgGeneratorError> {
        if !op.is_arithmetic() {
            let left_sql = self.render_expr(left)?;
            let right_sql = self.render_expr(right)?;
            return Ok(format!("{} {} {}", left_sql, op.as_sql(), right_sql));
        }

        let left_type = self.type_of(left);
        let right_type = self.type_of(right);
        let mut left_sql = self.render_expr(left)?;
        let mut right_sql = self.render_expr(right)?;

        // timestamp ± n: PostgreSQL has no timestamp/integer arithmetic,
        // Oracle counts days
        if left_type.category == TypeCategory::Timestamp
            && right_type.category == TypeCategory::Numeric
            && matches!(op, BinaryOp::Add | BinaryOp::Sub)
        {
            return Ok(format!(
                "{} {} ({}) * interval '1 day'",
                left_sql,
                op.as_sql(),
                right_sql
            ));
        }
        if left_type.category == TypeCategory::Numeric
            && right_type.category == TypeCategory::Timestamp
            && op == BinaryOp::Add
        {
            return Ok(format!("({}) * interval '1 day' + {}", left_sql, right_sql));
        }

        // Oracle converts text operands implicitly; PostgreSQL needs the cast
        if right_type.category == TypeCategory::Numeric
            && left_type.category == TypeCategory::Text
        {
            self.ctx.warn(format!(
                "text operand '{}' in arithmetic; inserted a ::numeric cast",
                left.source
            ));
            left_sql = format!("({})::numeric", left_sql);
        } else if left_type.category == TypeCategory::Numeric
            && right_type.category == TypeCategory::Text
        {
            self.ctx.warn(format!(
                "text operand '{}' in arithmetic; inserted a ::numeric cast",
                right.source
            ));
            right_sql = format!("({})::numeric", right_sql);
        }

        Ok(format!("{} {} {}", left_sql, op.as_sql(), right_sql))
    }

    fn render_case(&mut self, case: &CaseExpr<'_>) -> Result<String, PgGeneratorError> {
        let mut sql = String::from("CASE");
        if let Some(operand) = &case.operand {
            sql.push(' ');
            sql.push_str(&self.render_expr(operand)?);
        }
        for (condition, result) in &case.when_then {
            sql.push_str(" WHEN ");
            sql.push_str(&self.render_expr(condition)?);
            sql.push_str(" THEN ");
            sql.push_str(&self.render_expr(result)?);
        }
        if let Some(else_expr) = &case.else_expr {
            sql.push_str(" ELSE ");
            sql.push_str(&self.render_expr(else_expr)?);
        }
        sql.push_str(" END");
        Ok(sql)
    }

    fn render_args(&mut self, call: &FunctionCall<'_>) -> Result<Vec<String>, PgGeneratorError> {
        call.args.iter().map(|arg| self.render_expr(arg)).collect()
    }

    pub(crate) fn render_function_call(
        &mut self,
        call: &FunctionCall<'_>,
    ) -> Result<String, PgGeneratorError> {
        if call.name.segments.len() > 1 {
            // package function or type method; emitted qualified as-is
            let args = self.render_args(call)?;
            return Ok(format!(
                "{}({})",
                self.render_ident_path(&call.name),
                args.join(", ")
            ));
        }

        let upper = call.name.last().to_uppercase();
        match upper.as_str() {
            "ROUND" | "TRUNC" => return self.render_round_trunc(&upper, call),
            "DECODE" => return self.render_decode(call),
            "NVL2" => return self.render_nvl2(call),
            "ADD_MONTHS" => return self.render_add_months(call),
            "LAST_DAY" => return self.render_last_day(call),
            "SYS_CONNECT_BY_PATH" => return self.render_path_call(call),
            "TO_CHAR" | "TO_DATE" | "TO_NUMBER" if call.args.len() == 1 => {
                // the single-argument forms are plain casts
                let arg = self.render_expr(&call.args[0])?;
                let target = match upper.as_str() {
                    "TO_CHAR" => "text",
                    "TO_DATE" => "date",
                    _ => "numeric",
                };
                return Ok(format!("({})::{}", arg, target));
            }
            _ => {}
        }

        let lowered = normalize_oracle_name(call.name.last());
        let distinct_prefix = if call.distinct { "DISTINCT " } else { "" };
        let args = self.render_args(call)?;

        if let Some(mapping) = get_function_mapping(&lowered) {
            let args = if let Some(transform) = mapping.arg_transform {
                transform(&args)
            } else {
                args
            };
            return Ok(format!(
                "{}({}{})",
                mapping.pg_name,
                distinct_prefix,
                args.join(", ")
            ));
        }

        self.ctx.warn(format!(
            "function '{}' has no PostgreSQL mapping; passing it through unchanged",
            lowered
        ));
        Ok(format!(
            "{}({}{})",
            emit_ident(&lowered),
            distinct_prefix,
            args.join(", ")
        ))
    }

    fn render_round_trunc(
        &mut self,
        upper: &str,
        call: &FunctionCall<'_>,
    ) -> Result<String, PgGeneratorError> {
        let lowered = upper.to_lowercase();
        match call.args.len() {
            1 => {
                let arg = &call.args[0];
                let arg_type = self.type_of(arg);
                let arg_sql = self.render_expr(arg)?;
                if arg_type.is_date_like() {
                    return Ok(if upper == "TRUNC" {
                        format!("date_trunc('day', {})::date", arg_sql)
                    } else {
                        format!("date_trunc('day', {} + interval '12 hours')::date", arg_sql)
                    });
                }
                match arg_type.category {
                    TypeCategory::Numeric | TypeCategory::Null => {
                        Ok(format!("{}({})", lowered, arg_sql))
                    }
                    _ => {
                        self.ctx.warn(format!(
                            "argument of {} has no inferable type; inserted a ::numeric cast",
                            upper
                        ));
                        Ok(format!("{}(({})::numeric)", lowered, arg_sql))
                    }
                }
            }
            2 => {
                let arg = &call.args[0];
                let arg_type = self.type_of(arg);
                // date with a format mask
                if let ExprKind::Literal(Literal::String(mask)) = &call.args[1].kind {
                    if arg_type.is_date_like() {
                        if upper == "ROUND" {
                            return Err(PgGeneratorError::DateRoundMaskNotSupported);
                        }
                        let unit = date_trunc_unit(mask).ok_or_else(|| {
                            PgGeneratorError::UnsupportedDateMask {
                                function: upper.to_string(),
                                mask: (*mask).to_string(),
                            }
                        })?;
                        let arg_sql = self.render_expr(arg)?;
                        return Ok(format!("date_trunc('{}', {})::date", unit, arg_sql));
                    }
                }
                let mut arg_sql = self.render_expr(arg)?;
                if matches!(arg_type.category, TypeCategory::Unknown | TypeCategory::Text) {
                    self.ctx.warn(format!(
                        "argument of {} has no inferable type; inserted a ::numeric cast",
                        upper
                    ));
                    arg_sql = format!("({})::numeric", arg_sql);
                }
                let places = self.render_expr(&call.args[1])?;
                Ok(format!("{}({}, {})", lowered, arg_sql, places))
            }
            _ => {
                let args = self.render_args(call)?;
                Ok(format!("{}({})", lowered, args.join(", ")))
            }
        }
    }

    fn render_decode(&mut self, call: &FunctionCall<'_>) -> Result<String, PgGeneratorError> {
        let args = &call.args;
        if args.len() < 3 {
            let rendered = self.render_args(call)?;
            return Ok(format!("decode({})", rendered.join(", ")));
        }
        if args
            .iter()
            .skip(1)
            .step_by(2)
            .take((args.len() - 1) / 2)
            .any(|search| matches!(search.kind, ExprKind::Literal(Literal::Null)))
        {
            self.ctx.warn(
                "DECODE treats NULL search values as equal to NULL; the generated CASE \
                 uses plain equality and will not match NULLs",
            );
        }
        let base = self.render_expr(&args[0])?;
        let mut sql = format!("CASE {}", base);
        let mut i = 1;
        while i + 1 < args.len() {
            let search = self.render_expr(&args[i])?;
            let result = self.render_expr(&args[i + 1])?;
            sql.push_str(&format!(" WHEN {} THEN {}", search, result));
            i += 2;
        }
        if args.len() % 2 == 0 {
            let default = self.render_expr(&args[args.len() - 1])?;
            sql.push_str(&format!(" ELSE {}", default));
        }
        sql.push_str(" END");
        Ok(sql)
    }

    fn render_nvl2(&mut self, call: &FunctionCall<'_>) -> Result<String, PgGeneratorError> {
        if call.args.len() != 3 {
            let rendered = self.render_args(call)?;
            return Ok(format!("nvl2({})", rendered.join(", ")));
        }
        let test = self.render_expr(&call.args[0])?;
        let when_set = self.render_expr(&call.args[1])?;
        let when_null = self.render_expr(&call.args[2])?;
        Ok(format!(
            "CASE WHEN {} IS NOT NULL THEN {} ELSE {} END",
            test, when_set, when_null
        ))
    }

    fn render_add_months(&mut self, call: &FunctionCall<'_>) -> Result<String, PgGeneratorError> {
        if call.args.len() != 2 {
            let rendered = self.render_args(call)?;
            return Ok(format!("add_months({})", rendered.join(", ")));
        }
        let date_type = self.type_of(&call.args[0]);
        let date_sql = self.render_expr(&call.args[0])?;
        let months_sql = self.render_expr(&call.args[1])?;
        let shifted = format!("({} + ({}) * interval '1 month')", date_sql, months_sql);
        Ok(if date_type.category == TypeCategory::Date {
            format!("{}::date", shifted)
        } else {
            shifted
        })
    }

    fn render_last_day(&mut self, call: &FunctionCall<'_>) -> Result<String, PgGeneratorError> {
        if call.args.len() != 1 {
            let rendered = self.render_args(call)?;
            return Ok(format!("last_day({})", rendered.join(", ")));
        }
        let date_sql = self.render_expr(&call.args[0])?;
        Ok(format!(
            "(date_trunc('month', {}) + interval '1 month - 1 day')::date",
            date_sql
        ))
    }

    fn render_path_call(&mut self, call: &FunctionCall<'_>) -> Result<String, PgGeneratorError> {
        if call.args.len() != 2 {
            return Err(PgGeneratorError::PathOutsideConnectBy);
        }
        let expr_sql = self.render_expr(&call.args[0])?;
        let sep_sql = self.render_expr(&call.args[1])?;
        self.path_replacements
            .get(&(expr_sql, sep_sql))
            .cloned()
            .ok_or(PgGeneratorError::PathOutsideConnectBy)
    }
}

fn render_literal(literal: &Literal<'_>) -> String {
    match literal {
        Literal::Number(text) => (*text).to_string(),
        Literal::String(text) => (*text).to_string(),
        Literal::Date(quoted) => format!("DATE {}", quoted),
        Literal::Timestamp(quoted) => format!("TIMESTAMP {}", quoted),
        Literal::Null => "NULL".to_string(),
        Literal::True => "TRUE".to_string(),
        Literal::False => "FALSE".to_string(),
    }
}

/// Map an Oracle TRUNC format mask onto a `date_trunc` unit.
fn date_trunc_unit(mask_literal: &str) -> Option<&'static str> {
    let mask = mask_literal.trim_matches('\'').to_uppercase();
    match mask.as_str() {
        "YYYY" | "YEAR" | "YY" | "SYYYY" => Some("year"),
        "Q" => Some("quarter"),
        "MM" | "MONTH" | "MON" => Some("month"),
        "WW" | "IW" | "W" => Some("week"),
        "DD" | "DDD" | "J" => Some("day"),
        "HH" | "HH12" | "HH24" => Some("hour"),
        "MI" => Some("minute"),
        _ => None,
    }
}
