//! PL/SQL to PL/pgSQL emission.
//!
//! Functions and procedures become `LANGUAGE plpgsql` objects with `$$`
//! bodies. Declarations and parameters run through the scalar type
//! mapping; `%TYPE` anchors resolve against the metadata index. The
//! statement subset (assignment, RETURN, IF/ELSIF, FOR, nested blocks,
//! SELECT INTO, exception handlers) translates almost one to one.

use crate::oracle_sql_parser::ast::{
    Block, CallableKind, FunctionDecl, ParamDecl, ParamMode, Statement, TypeRef, TypeRefKind,
    VarDecl,
};
use crate::utils::identifiers::{emit_ident, normalize_oracle_name};
use crate::utils::type_mapping::map_oracle_type;

use super::{PgGeneratorError, SqlRenderer};

impl SqlRenderer<'_, '_, '_> {
    pub fn render_callable(
        &mut self,
        declaration: &FunctionDecl<'_>,
    ) -> Result<String, PgGeneratorError> {
        let keyword = match declaration.kind {
            CallableKind::Function => "FUNCTION",
            CallableKind::Procedure => "PROCEDURE",
        };
        let create = if declaration.or_replace {
            "CREATE OR REPLACE"
        } else {
            "CREATE"
        };

        let params: Result<Vec<_>, _> = declaration
            .params
            .iter()
            .map(|param| self.render_param(param))
            .collect();
        let mut sql = format!(
            "{} {} {}({})\n",
            create,
            keyword,
            self.render_ident_path(&declaration.name),
            params?.join(", ")
        );

        if let Some(return_type) = &declaration.return_type {
            sql.push_str(&format!("RETURNS {}\n", self.render_type_ref(return_type)));
        }
        sql.push_str("LANGUAGE plpgsql\nAS $$\n");

        if !declaration.declarations.is_empty() {
            sql.push_str("DECLARE\n");
            for variable in &declaration.declarations {
                let rendered = self.render_var_decl(variable)?;
                sql.push_str(&format!("  {}\n", rendered));
            }
        }

        sql.push_str(&self.render_block(&declaration.body, 0)?);
        sql.push_str("\n$$;");
        Ok(sql)
    }

    fn render_param(&mut self, param: &ParamDecl<'_>) -> Result<String, PgGeneratorError> {
        let mode = match param.mode {
            ParamMode::In => "",
            ParamMode::Out => "OUT ",
            ParamMode::InOut => "INOUT ",
        };
        let mut sql = format!(
            "{}{} {}",
            mode,
            emit_ident(param.name),
            self.render_type_ref(&param.data_type)
        );
        if let Some(default) = &param.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.render_expr(default)?);
        }
        Ok(sql)
    }

    fn render_type_ref(&mut self, type_ref: &TypeRef<'_>) -> String {
        match &type_ref.kind {
            TypeRefKind::Scalar(token) => {
                let mapped = map_oracle_type(token);
                // an unmapped, unqualified token may be a synonym for a
                // user-defined type; resolve it before emitting
                if mapped == token.trim().to_lowercase() && !mapped.contains('.') {
                    if let Some((schema, name)) = self.ctx.resolve_object_synonym(&mapped) {
                        return format!("{}.{}", schema, name);
                    }
                }
                mapped
            }
            TypeRefKind::ColumnType(path) => {
                let table_key = path
                    .qualifier()
                    .unwrap_or_else(|| normalize_oracle_name(path.last()));
                let mapped = self
                    .ctx
                    .index
                    .column_type(&table_key, path.last(), &self.ctx.current_schema)
                    .map(|info| map_oracle_type(&info.oracle_type));
                match mapped {
                    Some(pg_type) => pg_type,
                    None => {
                        self.ctx.warn(format!(
                            "cannot resolve {}%TYPE against the catalog; defaulted to text",
                            path.joined_lower()
                        ));
                        "text".to_string()
                    }
                }
            }
            // PL/pgSQL keeps the %ROWTYPE anchor
            TypeRefKind::RowType(path) => format!("{}%ROWTYPE", path.joined_lower()),
        }
    }

    fn render_var_decl(&mut self, variable: &VarDecl<'_>) -> Result<String, PgGeneratorError> {
        let mut sql = emit_ident(variable.name);
        if variable.constant {
            sql.push_str(" CONSTANT");
        }
        sql.push(' ');
        sql.push_str(&self.render_type_ref(&variable.data_type));
        if variable.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &variable.default {
            sql.push_str(" := ");
            sql.push_str(&self.render_expr(default)?);
        }
        sql.push(';');
        Ok(sql)
    }

    fn render_block(&mut self, block: &Block<'_>, depth: usize) -> Result<String, PgGeneratorError> {
        let indent = "  ".repeat(depth);
        let mut sql = format!("{}BEGIN\n", indent);
        for statement in &block.statements {
            sql.push_str(&self.render_statement(statement, depth + 1)?);
        }
        if !block.exception_handlers.is_empty() {
            sql.push_str(&format!("{}EXCEPTION\n", indent));
            for handler in &block.exception_handlers {
                let conditions = handler
                    .exceptions
                    .iter()
                    .map(|name| normalize_oracle_name(name))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                sql.push_str(&format!("{}  WHEN {} THEN\n", indent, conditions));
                for statement in &handler.statements {
                    sql.push_str(&self.render_statement(statement, depth + 2)?);
                }
            }
        }
        sql.push_str(&format!("{}END;", indent));
        Ok(sql)
    }

    fn render_statement(
        &mut self,
        statement: &Statement<'_>,
        depth: usize,
    ) -> Result<String, PgGeneratorError> {
        let indent = "  ".repeat(depth);
        match statement {
            Statement::Return { value, .. } => match value {
                Some(value) => Ok(format!("{}RETURN {};\n", indent, self.render_expr(value)?)),
                None => Ok(format!("{}RETURN;\n", indent)),
            },
            Statement::Assignment { target, value, .. } => Ok(format!(
                "{}{} := {};\n",
                indent,
                self.render_ident_path(target),
                self.render_expr(value)?
            )),
            Statement::If(if_statement) => {
                let mut sql = String::new();
                for (i, (condition, statements)) in if_statement.branches.iter().enumerate() {
                    let keyword = if i == 0 { "IF" } else { "ELSIF" };
                    sql.push_str(&format!(
                        "{}{} {} THEN\n",
                        indent,
                        keyword,
                        self.render_expr(condition)?
                    ));
                    for statement in statements {
                        sql.push_str(&self.render_statement(statement, depth + 1)?);
                    }
                }
                if let Some(statements) = &if_statement.else_branch {
                    sql.push_str(&format!("{}ELSE\n", indent));
                    for statement in statements {
                        sql.push_str(&self.render_statement(statement, depth + 1)?);
                    }
                }
                sql.push_str(&format!("{}END IF;\n", indent));
                Ok(sql)
            }
            Statement::ForRange(for_loop) => {
                let mut sql = format!(
                    "{}FOR {} IN {}{}..{} LOOP\n",
                    indent,
                    emit_ident(for_loop.variable),
                    if for_loop.reverse { "REVERSE " } else { "" },
                    self.render_expr(&for_loop.lower)?,
                    self.render_expr(&for_loop.upper)?
                );
                for statement in &for_loop.body {
                    sql.push_str(&self.render_statement(statement, depth + 1)?);
                }
                sql.push_str(&format!("{}END LOOP;\n", indent));
                Ok(sql)
            }
            Statement::ForQuery(for_loop) => {
                let query = self.render_select_statement(&for_loop.query)?;
                let mut sql = format!(
                    "{}FOR {} IN ({}) LOOP\n",
                    indent,
                    emit_ident(for_loop.variable),
                    query
                );
                for statement in &for_loop.body {
                    sql.push_str(&self.render_statement(statement, depth + 1)?);
                }
                sql.push_str(&format!("{}END LOOP;\n", indent));
                Ok(sql)
            }
            Statement::Block(block) => {
                let mut sql = self.render_block(block, depth)?;
                sql.push('\n');
                Ok(sql)
            }
            Statement::Null { .. } => Ok(format!("{}NULL;\n", indent)),
            Statement::Call { call, .. } => {
                // DBMS_OUTPUT maps onto RAISE NOTICE
                if call.name.joined_lower() == "dbms_output.put_line" && call.args.len() == 1 {
                    let message = self.render_expr(&call.args[0])?;
                    return Ok(format!("{}RAISE NOTICE '%', {};\n", indent, message));
                }
                let args: Result<Vec<_>, _> =
                    call.args.iter().map(|arg| self.render_expr(arg)).collect();
                Ok(format!(
                    "{}CALL {}({});\n",
                    indent,
                    self.render_ident_path(&call.name),
                    args?.join(", ")
                ))
            }
            Statement::Select(select) => {
                let sql = self.render_select_statement(select)?;
                Ok(format!("{}{};\n", indent, sql))
            }
        }
    }
}
