//! End-to-end SELECT transformation tests.

use orapg::{transform_expression, transform_select, MetadataIndex, Severity};

fn empty_index() -> MetadataIndex {
    MetadataIndex::new()
}

#[test]
fn literal_arithmetic_over_dual() {
    let result = transform_select("SELECT 100 + 50 FROM dual", "hr", &empty_index());
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("100 + 50"), "{sql}");
    // dual disappears
    assert!(!sql.to_lowercase().contains("dual"), "{sql}");
}

#[test]
fn date_arithmetic_with_scalar_subquery() {
    let result = transform_select(
        "SELECT TRUNC(CURRENT_DATE) + (SELECT 1 FROM dual) FROM dual",
        "hr",
        &empty_index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("current_date"), "{sql}");
    assert!(sql.contains("date_trunc('day', current_date)::date"), "{sql}");
}

#[test]
fn cross_schema_column_transformation() {
    let mut index = MetadataIndex::new();
    index.add_column("co_abs.abs_werk_sperren", "spa_abgelehnt_am", "DATE");
    let result = transform_select(
        "SELECT ws1.spa_abgelehnt_am + 34 FROM co_abs.abs_werk_sperren ws1",
        "co_xm_pub_core",
        &index,
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert_eq!(
        sql,
        "SELECT ws1.spa_abgelehnt_am + 34 FROM co_abs.abs_werk_sperren ws1"
    );
}

#[test]
fn cte_column_types_propagate_without_casts() {
    let mut index = MetadataIndex::new();
    index.add_column("cfg", "number_days", "NUMBER");
    let result = transform_select(
        "WITH c AS (SELECT number_days tg FROM cfg) SELECT tg + 1 FROM c",
        "hr",
        &index,
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    // tg resolved to NUMERIC through the CTE, so no defensive cast appears
    assert!(sql.contains("tg + 1"), "{sql}");
    assert!(!sql.contains("::numeric"), "{sql}");
}

#[test]
fn text_operand_gets_defensive_cast_and_warning() {
    let mut index = MetadataIndex::new();
    index.add_column("hr.widgets", "mystery", "VARCHAR2(30)");
    let result = transform_select("SELECT mystery + 1 FROM widgets", "hr", &index);
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("(mystery)::numeric + 1"), "{sql}");
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning));
}

#[test]
fn round_and_trunc_insert_defensive_casts_for_unknown_arguments() {
    let result = transform_select("SELECT ROUND(mystery) + 1 FROM widgets", "hr", &empty_index());
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("round((mystery)::numeric)"), "{sql}");
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning));
}

#[test]
fn synonyms_qualify_unqualified_tables() {
    let mut index = MetadataIndex::new();
    index.add_synonym("hr", "emp", "hr_core", "employees");
    let result = transform_select("SELECT 1 FROM emp", "hr", &index);
    assert!(result.success());
    assert!(result
        .postgres_sql
        .unwrap()
        .contains("FROM hr_core.employees"));
}

#[test]
fn synonym_chains_resolve_through_public() {
    let mut index = MetadataIndex::new();
    index
        .add_synonym("public", "everyone", "hr", "emp_all")
        .add_synonym("hr", "emp_all", "hr", "employees");
    let result = transform_select("SELECT 1 FROM everyone", "sales", &index);
    assert!(result.success());
    assert!(result.postgres_sql.unwrap().contains("FROM hr.employees"));
}

#[test]
fn cyclic_synonym_warns_and_keeps_reference() {
    let mut index = MetadataIndex::new();
    index
        .add_synonym("hr", "a", "hr", "b")
        .add_synonym("hr", "b", "hr", "a");
    let result = transform_select("SELECT 1 FROM a", "hr", &index);
    assert!(result.success());
    assert!(result.postgres_sql.unwrap().contains("FROM a"));
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.message.contains("cyclic")));
}

#[test]
fn reserved_identifiers_are_quoted() {
    let result = transform_select("SELECT \"USER\", emp_id FROM emp", "hr", &empty_index());
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("\"user\""), "{sql}");
    assert!(sql.contains("emp_id"), "{sql}");
}

#[test]
fn function_remappings() {
    let result = transform_select(
        "SELECT NVL(comm, 0), UPPER(ename), SYSDATE FROM emp",
        "hr",
        &empty_index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("coalesce(comm, 0)"), "{sql}");
    assert!(sql.contains("upper(ename)"), "{sql}");
    assert!(sql.contains("current_date"), "{sql}");
}

#[test]
fn decode_becomes_case() {
    let result = transform_select(
        "SELECT DECODE(status, 'A', 1, 'B', 2, 0) FROM emp",
        "hr",
        &empty_index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(
        sql.contains("CASE status WHEN 'A' THEN 1 WHEN 'B' THEN 2 ELSE 0 END"),
        "{sql}"
    );
}

#[test]
fn timezone_pseudo_columns() {
    let result = transform_select("SELECT DBTIMEZONE FROM dual", "hr", &empty_index());
    assert!(result.success());
    assert!(result
        .postgres_sql
        .unwrap()
        .contains("current_setting('TIMEZONE')"));
}

#[test]
fn date_literals_pass_through() {
    let result = transform_select("SELECT DATE '2024-01-31' FROM dual", "hr", &empty_index());
    assert!(result.success());
    assert!(result.postgres_sql.unwrap().contains("DATE '2024-01-31'"));
}

#[test]
fn sequence_references_become_nextval() {
    let mut index = MetadataIndex::new();
    index.add_synonym("hr", "emp_seq", "hr_core", "employees_seq");
    let result = transform_select("SELECT emp_seq.NEXTVAL FROM dual", "hr", &index);
    assert!(result.success(), "{:?}", result.error_message);
    assert_eq!(
        result.postgres_sql.as_deref(),
        Some("SELECT nextval('hr_core.employees_seq')")
    );
}

#[test]
fn interval_literals_are_refused_with_recipe() {
    let result = transform_select(
        "SELECT hire_date + INTERVAL '3' DAY FROM emp",
        "hr",
        &empty_index(),
    );
    assert!(!result.success());
    assert!(result.error_message.unwrap().contains("interval '1 day'"));
}

#[test]
fn rownum_is_refused_with_recipe() {
    let result = transform_select("SELECT * FROM emp WHERE ROWNUM <= 10", "hr", &empty_index());
    assert!(!result.success());
    let message = result.error_message.unwrap();
    assert!(message.contains("LIMIT"), "{message}");
    assert!(message.contains("row_number()"), "{message}");
}

#[test]
fn legacy_outer_join_is_refused() {
    let result = transform_select(
        "SELECT e.ename FROM emp e, dept d WHERE e.deptno = d.deptno (+)",
        "hr",
        &empty_index(),
    );
    assert!(!result.success());
    assert!(result.error_message.unwrap().contains("ANSI"));
}

#[test]
fn union_all_is_preserved() {
    let result = transform_select(
        "SELECT 1 FROM dual UNION ALL SELECT 2 FROM dual",
        "hr",
        &empty_index(),
    );
    assert!(result.success());
    assert_eq!(
        result.postgres_sql.as_deref(),
        Some("SELECT 1 UNION ALL SELECT 2")
    );
}

#[test]
fn group_by_and_joins_render() {
    let result = transform_select(
        "SELECT d.dname, COUNT(*) FROM emp e JOIN dept d ON e.deptno = d.deptno \
         GROUP BY d.dname HAVING COUNT(*) > 3 ORDER BY d.dname",
        "hr",
        &empty_index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("JOIN dept d ON e.deptno = d.deptno"), "{sql}");
    assert!(sql.contains("GROUP BY d.dname"), "{sql}");
    assert!(sql.contains("HAVING count(*) > 3"), "{sql}");
}

#[test]
fn output_is_character_for_character_deterministic() {
    let mut index = MetadataIndex::new();
    index.add_column("hr.emp", "hire_date", "DATE");
    let sql = "SELECT TRUNC(hire_date), NVL(comm, 0) FROM emp WHERE hire_date > DATE '2020-01-01'";
    let a = transform_select(sql, "hr", &index);
    let b = transform_select(sql, "hr", &index);
    assert!(a.success());
    assert_eq!(a.postgres_sql, b.postgres_sql);
}

#[test]
fn expression_surface_handles_nvl2() {
    let result = transform_expression("NVL2(comm, comm * 12, 0)", "hr", &empty_index());
    assert!(result.success());
    let sql = result.postgres_sql.unwrap();
    assert!(
        sql.contains("CASE WHEN comm IS NOT NULL THEN"),
        "{sql}"
    );
}
