//! Hierarchical-query (CONNECT BY) rewriting tests.

use orapg::{transform_select, MetadataIndex};

fn index() -> MetadataIndex {
    let mut index = MetadataIndex::new();
    index
        .add_column("hr.emp", "emp_id", "NUMBER(10)")
        .add_column("hr.emp", "manager_id", "NUMBER(10)")
        .add_column("hr.emp", "ename", "VARCHAR2(100)");
    index
}

#[test]
fn basic_hierarchy_rewrite() {
    let result = transform_select(
        "SELECT emp_id, LEVEL FROM emp START WITH manager_id IS NULL \
         CONNECT BY PRIOR emp_id = manager_id",
        "hr",
        &index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();

    assert!(sql.starts_with("WITH RECURSIVE emp_hierarchy AS ("), "{sql}");
    // base case: anchor filter and level seed
    assert!(sql.contains("WHERE manager_id IS NULL"), "{sql}");
    assert!(sql.contains("1 AS level"), "{sql}");
    // recursive case: child joined to the hierarchy through the PRIOR columns
    assert!(
        sql.contains("FROM emp t JOIN emp_hierarchy h ON t.manager_id = h.emp_id"),
        "{sql}"
    );
    assert!(sql.contains("h.level + 1 AS level"), "{sql}");
    assert!(sql.contains("UNION ALL"), "{sql}");
    // final select reads the generated level column
    assert!(sql.contains("SELECT emp_id, level FROM emp_hierarchy"), "{sql}");
}

#[test]
fn reversed_prior_condition() {
    let result = transform_select(
        "SELECT emp_id FROM emp START WITH manager_id IS NULL \
         CONNECT BY manager_id = PRIOR emp_id",
        "hr",
        &index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("ON t.manager_id = h.emp_id"), "{sql}");
}

#[test]
fn original_alias_is_kept_as_child_alias() {
    let result = transform_select(
        "SELECT e.emp_id, LEVEL FROM emp e START WITH e.manager_id IS NULL \
         CONNECT BY PRIOR e.emp_id = e.manager_id",
        "hr",
        &index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("FROM emp e JOIN emp_hierarchy h ON e.manager_id = h.emp_id"), "{sql}");
}

#[test]
fn where_clause_lands_in_both_members_qualified() {
    let result = transform_select(
        "SELECT emp_id FROM emp WHERE active = 'Y' START WITH manager_id IS NULL \
         CONNECT BY PRIOR emp_id = manager_id",
        "hr",
        &index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    // base keeps the filter next to the anchor condition
    assert!(sql.contains("WHERE manager_id IS NULL AND (active = 'Y')"), "{sql}");
    // the recursive member's copy is qualified by the child alias
    assert!(sql.contains("WHERE t.active = 'Y'"), "{sql}");
}

#[test]
fn level_inside_expressions_is_substituted() {
    let result = transform_select(
        "SELECT emp_id, LEVEL * 10 AS depth FROM emp START WITH manager_id IS NULL \
         CONNECT BY PRIOR emp_id = manager_id",
        "hr",
        &index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("1 * 10 AS depth"), "{sql}");
    assert!(sql.contains("(h.level + 1) * 10 AS depth"), "{sql}");
}

#[test]
fn sys_connect_by_path_is_materialized() {
    let result = transform_select(
        "SELECT emp_id, SYS_CONNECT_BY_PATH(ename, '/') AS path FROM emp \
         START WITH manager_id IS NULL CONNECT BY PRIOR emp_id = manager_id \
         ORDER BY SYS_CONNECT_BY_PATH(ename, '/')",
        "hr",
        &index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    // seeded in the base case
    assert!(sql.contains("'/' || ename AS path_1"), "{sql}");
    // extended in the recursive case, child side qualified
    assert!(sql.contains("h.path_1 || '/' || t.ename AS path_1"), "{sql}");
    // the final select and ORDER BY read the generated column
    assert!(sql.contains("path_1 AS path"), "{sql}");
    assert!(sql.contains("ORDER BY path_1"), "{sql}");
    // the two textually identical invocations share one column
    assert!(!sql.contains("path_2"), "{sql}");
}

#[test]
fn order_by_level_uses_generated_column() {
    let result = transform_select(
        "SELECT emp_id, LEVEL FROM emp START WITH manager_id IS NULL \
         CONNECT BY PRIOR emp_id = manager_id ORDER BY LEVEL DESC",
        "hr",
        &index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    assert!(sql.contains("ORDER BY level DESC"), "{sql}");
}

#[test]
fn unselected_join_column_is_exposed_in_the_cte() {
    let result = transform_select(
        "SELECT ename FROM emp START WITH manager_id IS NULL \
         CONNECT BY PRIOR emp_id = manager_id",
        "hr",
        &index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    // emp_id is not selected but the join needs it in the CTE
    assert!(sql.contains("SELECT ename, emp_id, 1 AS level"), "{sql}");
    assert!(sql.contains("ON t.manager_id = h.emp_id"), "{sql}");
}

#[test]
fn nocycle_fails_with_both_workarounds() {
    let result = transform_select(
        "SELECT emp_id FROM emp START WITH manager_id IS NULL \
         CONNECT BY NOCYCLE PRIOR emp_id = manager_id",
        "hr",
        &index(),
    );
    assert!(!result.success());
    let message = result.error_message.unwrap();
    assert!(message.contains("path array"), "{message}");
    assert!(message.contains("depth guard"), "{message}");
}

#[test]
fn missing_start_with_fails() {
    let result = transform_select(
        "SELECT emp_id FROM emp CONNECT BY PRIOR emp_id = manager_id",
        "hr",
        &index(),
    );
    assert!(!result.success());
    assert!(result.error_message.unwrap().contains("START WITH"));
}

#[test]
fn missing_prior_fails() {
    let result = transform_select(
        "SELECT emp_id FROM emp START WITH manager_id IS NULL \
         CONNECT BY emp_id = manager_id",
        "hr",
        &index(),
    );
    assert!(!result.success());
    assert!(result.error_message.unwrap().contains("PRIOR"));
}

#[test]
fn multiple_from_tables_fail() {
    let result = transform_select(
        "SELECT e.emp_id FROM emp e, dept d START WITH e.manager_id IS NULL \
         CONNECT BY PRIOR e.emp_id = e.manager_id",
        "hr",
        &index(),
    );
    assert!(!result.success());
    assert!(result.error_message.unwrap().contains("multiple FROM tables"));
}

#[test]
fn subquery_source_fails() {
    let result = transform_select(
        "SELECT emp_id FROM (SELECT emp_id, manager_id FROM emp) x \
         START WITH manager_id IS NULL CONNECT BY PRIOR emp_id = manager_id",
        "hr",
        &index(),
    );
    assert!(!result.success());
    assert!(result.error_message.unwrap().contains("subquery"));
}

#[test]
fn connect_by_root_fails() {
    let result = transform_select(
        "SELECT CONNECT_BY_ROOT ename FROM emp START WITH manager_id IS NULL \
         CONNECT BY PRIOR emp_id = manager_id",
        "hr",
        &index(),
    );
    assert!(!result.success());
    let message = result.error_message.unwrap();
    assert!(message.contains("CONNECT_BY_ROOT"), "{message}");
}

#[test]
fn no_unqualified_column_survives_in_recursive_where() {
    let result = transform_select(
        "SELECT emp_id FROM emp WHERE dept_no = 10 AND status LIKE 'A%' \
         START WITH manager_id IS NULL CONNECT BY PRIOR emp_id = manager_id",
        "hr",
        &index(),
    );
    assert!(result.success(), "{:?}", result.error_message);
    let sql = result.postgres_sql.unwrap();
    let recursive_where = sql
        .split("JOIN emp_hierarchy")
        .nth(1)
        .and_then(|tail| tail.split("WHERE").nth(1))
        .and_then(|tail| tail.split('\n').next())
        .expect("recursive WHERE present");
    assert!(recursive_where.contains("t.dept_no"), "{recursive_where}");
    assert!(recursive_where.contains("t.status"), "{recursive_where}");
    // the string literal is untouched
    assert!(recursive_where.contains("'A%'"), "{recursive_where}");
}

#[test]
fn independent_transformations_restart_path_counters() {
    let sql = "SELECT SYS_CONNECT_BY_PATH(ename, '/') FROM emp \
               START WITH manager_id IS NULL CONNECT BY PRIOR emp_id = manager_id";
    let a = transform_select(sql, "hr", &index());
    let b = transform_select(sql, "hr", &index());
    assert!(a.success() && b.success());
    assert_eq!(a.postgres_sql, b.postgres_sql);
    assert!(a.postgres_sql.unwrap().contains("path_1"));
}
