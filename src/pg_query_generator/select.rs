//! SELECT statement emission.

use crate::oracle_sql_parser::ast::{
    CteDefinition, Join, OrderItem, QueryBlock, SelectItem, SelectStatement, TableExpr, TableRef,
};
use crate::oracle_sql_parser::ast::NullsOrder;
use crate::utils::identifiers::{emit_ident, normalize_oracle_name};

use super::{connect_by, PgGeneratorError, SqlRenderer};

impl SqlRenderer<'_, '_, '_> {
    /// Render a full SELECT statement. Hierarchical queries take the
    /// CONNECT BY route, which produces the whole `WITH RECURSIVE` text.
    pub fn render_select_statement(
        &mut self,
        statement: &SelectStatement<'_>,
    ) -> Result<String, PgGeneratorError> {
        if statement.body.connect_by.is_some() {
            return connect_by::render_hierarchical_statement(self, statement);
        }
        if statement
            .unions
            .iter()
            .any(|branch| branch.block.connect_by.is_some())
        {
            return Err(PgGeneratorError::UnionWithConnectBy);
        }

        let cte_mark = self.known_ctes.len();
        let mut render = || -> Result<String, PgGeneratorError> {
            let mut sql = String::new();
            if !statement.ctes.is_empty() {
                let mut rendered = Vec::with_capacity(statement.ctes.len());
                for cte in &statement.ctes {
                    rendered.push(self.render_cte(cte)?);
                    self.known_ctes.push(normalize_oracle_name(cte.name));
                }
                sql.push_str("WITH ");
                sql.push_str(&rendered.join(", "));
                sql.push(' ');
            }
            sql.push_str(&self.render_query_block(&statement.body)?);
            for branch in &statement.unions {
                sql.push_str(if branch.all { " UNION ALL " } else { " UNION " });
                sql.push_str(&self.render_query_block(&branch.block)?);
            }
            Ok(sql)
        };
        let result = render();
        self.known_ctes.truncate(cte_mark);
        result
    }

    fn render_cte(&mut self, cte: &CteDefinition<'_>) -> Result<String, PgGeneratorError> {
        let mut sql = emit_ident(cte.name);
        if let Some(columns) = &cte.columns {
            let names: Vec<String> = columns.iter().map(|column| emit_ident(column)).collect();
            sql.push_str(&format!(" ({})", names.join(", ")));
        }
        sql.push_str(" AS (");
        sql.push_str(&self.render_select_statement(&cte.query)?);
        sql.push(')');
        Ok(sql)
    }

    pub(crate) fn render_query_block(
        &mut self,
        block: &QueryBlock<'_>,
    ) -> Result<String, PgGeneratorError> {
        if block.start_with.is_some() && block.connect_by.is_none() {
            return Err(PgGeneratorError::StartWithWithoutConnectBy);
        }

        let mut sql = String::from("SELECT ");
        if block.distinct {
            sql.push_str("DISTINCT ");
        }

        let items: Result<Vec<_>, _> = block
            .select_list
            .iter()
            .map(|item| self.render_select_item(item))
            .collect();
        sql.push_str(&items?.join(", "));

        if let Some(into) = &block.into {
            let targets: Vec<String> = into
                .iter()
                .map(|path| self.render_ident_path(path))
                .collect();
            sql.push_str(" INTO ");
            sql.push_str(&targets.join(", "));
        }

        // `FROM dual` disappears; PostgreSQL needs no source for scalars
        if !block.selects_from_dual() {
            let tables: Result<Vec<_>, _> = block
                .from
                .iter()
                .map(|table_ref| self.render_table_ref(table_ref))
                .collect();
            sql.push_str(" FROM ");
            sql.push_str(&tables?.join(", "));
        }

        if let Some(where_clause) = &block.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&self.render_expr(where_clause)?);
        }

        if !block.group_by.is_empty() {
            let exprs: Result<Vec<_>, _> = block
                .group_by
                .iter()
                .map(|expr| self.render_expr(expr))
                .collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&exprs?.join(", "));
        }

        if let Some(having) = &block.having {
            sql.push_str(" HAVING ");
            sql.push_str(&self.render_expr(having)?);
        }

        if !block.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.render_order_items(&block.order_by)?);
        }

        Ok(sql)
    }

    pub(crate) fn render_order_items(
        &mut self,
        items: &[OrderItem<'_>],
    ) -> Result<String, PgGeneratorError> {
        let rendered: Result<Vec<_>, _> = items
            .iter()
            .map(|item| {
                let mut sql = self.render_expr(&item.expr)?;
                if item.descending {
                    sql.push_str(" DESC");
                }
                match item.nulls {
                    Some(NullsOrder::First) => sql.push_str(" NULLS FIRST"),
                    Some(NullsOrder::Last) => sql.push_str(" NULLS LAST"),
                    None => {}
                }
                Ok(sql)
            })
            .collect();
        Ok(rendered?.join(", "))
    }

    fn render_select_item(&mut self, item: &SelectItem<'_>) -> Result<String, PgGeneratorError> {
        let mut sql = self.render_expr(&item.expr)?;
        if let Some(alias) = item.alias {
            sql.push_str(" AS ");
            sql.push_str(&emit_ident(alias));
        }
        Ok(sql)
    }

    fn render_table_ref(&mut self, table_ref: &TableRef<'_>) -> Result<String, PgGeneratorError> {
        let mut sql = self.render_table_primary(&table_ref.table)?;
        if let Some(alias) = table_ref.alias {
            sql.push(' ');
            sql.push_str(&emit_ident(alias));
        }
        for join in &table_ref.joins {
            sql.push_str(&self.render_join(join)?);
        }
        Ok(sql)
    }

    fn render_join(&mut self, join: &Join<'_>) -> Result<String, PgGeneratorError> {
        let mut sql = format!(" {} ", join.kind.as_sql());
        sql.push_str(&self.render_table_primary(&join.table)?);
        if let Some(alias) = join.alias {
            sql.push(' ');
            sql.push_str(&emit_ident(alias));
        }
        if let Some(on) = &join.on {
            sql.push_str(" ON ");
            sql.push_str(&self.render_expr(on)?);
        }
        Ok(sql)
    }

    pub(crate) fn render_table_primary(
        &mut self,
        table: &TableExpr<'_>,
    ) -> Result<String, PgGeneratorError> {
        match table {
            TableExpr::Named(path) => {
                if path.segments.len() == 1 {
                    let name = normalize_oracle_name(path.segments[0]);
                    // an unqualified name that is a synonym gets emitted
                    // fully qualified; CTE references and everything else
                    // resolve through the search path
                    if !self.known_ctes.contains(&name) {
                        if let Some((schema, target)) =
                            self.ctx.resolve_object_synonym(path.segments[0])
                        {
                            return Ok(format!("{}.{}", emit_ident(&schema), emit_ident(&target)));
                        }
                    }
                    return Ok(emit_ident(&name));
                }
                Ok(self.render_ident_path(path))
            }
            TableExpr::Subquery(statement) => {
                Ok(format!("({})", self.render_select_statement(statement)?))
            }
        }
    }
}
