//! SQLite-backed storage for AST facts.
//!
//! One row per module, function, global, declaration, call, argument and
//! statement. Row ids preserve ingestion order, which is the order the
//! exporter saw things in the source; every list-returning query orders by
//! id so declaration order survives the round trip.

use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{
    Argument, AstFacts, Call, FactError, FactQuery, FactTuple, Function, Global, Location, Module,
    SourceSpan, Statement, VarDecl,
};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS modules (
        name TEXT PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS functions (
        id INTEGER PRIMARY KEY,
        module_name TEXT NOT NULL,
        name TEXT NOT NULL,
        start_line INTEGER NOT NULL,
        start_column INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        end_column INTEGER NOT NULL,
        FOREIGN KEY (module_name) REFERENCES modules(name) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS globals (
        id INTEGER PRIMARY KEY,
        module_name TEXT NOT NULL,
        name TEXT NOT NULL,
        type_name TEXT NOT NULL,
        start_line INTEGER NOT NULL,
        start_column INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        end_column INTEGER NOT NULL,
        is_array INTEGER NOT NULL,
        size INTEGER NOT NULL,
        FOREIGN KEY (module_name) REFERENCES modules(name) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS var_decls (
        id INTEGER PRIMARY KEY,
        function_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        type_name TEXT NOT NULL,
        start_line INTEGER NOT NULL,
        start_column INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        end_column INTEGER NOT NULL,
        is_array INTEGER NOT NULL,
        size INTEGER NOT NULL,
        FOREIGN KEY (function_id) REFERENCES functions(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS calls (
        id INTEGER PRIMARY KEY,
        module_name TEXT NOT NULL,
        function_id INTEGER NOT NULL,
        expr TEXT NOT NULL,
        callee TEXT NOT NULL,
        start_line INTEGER NOT NULL,
        start_column INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        end_column INTEGER NOT NULL,
        FOREIGN KEY (function_id) REFERENCES functions(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS call_arguments (
        id INTEGER PRIMARY KEY,
        call_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        type_name TEXT NOT NULL,
        FOREIGN KEY (call_id) REFERENCES calls(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS statements (
        id INTEGER PRIMARY KEY,
        module_name TEXT NOT NULL,
        function_id INTEGER NOT NULL,
        start_line INTEGER NOT NULL,
        start_column INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        end_column INTEGER NOT NULL,
        expr TEXT NOT NULL,
        FOREIGN KEY (function_id) REFERENCES functions(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_functions_module ON functions(module_name);
    CREATE INDEX IF NOT EXISTS idx_globals_module ON globals(module_name);
    CREATE INDEX IF NOT EXISTS idx_var_decls_function ON var_decls(function_id);
    CREATE INDEX IF NOT EXISTS idx_calls_function ON calls(function_id);
    CREATE INDEX IF NOT EXISTS idx_call_arguments_call ON call_arguments(call_id);
    CREATE INDEX IF NOT EXISTS idx_statements_start ON statements(module_name, start_line, start_column);
    CREATE INDEX IF NOT EXISTS idx_statements_function ON statements(function_id);
";

const SPAN_COLUMNS: &str = "start_line, start_column, end_line, end_column";

/// Counts of what a single `collect` stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CollectStats {
    pub functions: usize,
    /// Functions without a leading `func_decl` (declarations, externs).
    pub skipped_functions: usize,
    pub globals: usize,
    pub var_decls: usize,
    pub calls: usize,
    pub statements: usize,
}

/// The AST fact database.
pub struct FactStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl FactStore {
    /// Open or create a fact database on disk.
    pub fn open(path: &Path) -> Result<Self, FactError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Create a throwaway database that lives as long as the store.
    pub fn open_in_memory() -> Result<Self, FactError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, path: None })
    }

    /// Where the database lives, if it is on disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Ingest the facts of one module, replacing anything previously stored for it.
    pub fn collect(&mut self, facts: &AstFacts) -> Result<CollectStats, FactError> {
        let tx = self.conn.transaction()?;
        remove_module(&tx, &facts.module_name)?;
        tx.execute(
            "INSERT INTO modules (name) VALUES (?1)",
            params![facts.module_name],
        )?;

        let mut stats = CollectStats::default();
        for fact in &facts.globals {
            let FactTuple::VarType {
                span,
                name,
                type_name,
                is_array,
                size,
            } = fact
            else {
                return Err(FactError::MalformedFact(format!(
                    "{} record among globals of {}",
                    fact.tag(),
                    facts.module_name
                )));
            };
            tx.execute(
                "INSERT INTO globals (module_name, name, type_name, start_line, start_column,
                                      end_line, end_column, is_array, size)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    facts.module_name,
                    name,
                    type_name,
                    span.start_line,
                    span.start_column,
                    span.end_line,
                    span.end_column,
                    is_array,
                    size_to_sql(*size)
                ],
            )?;
            stats.globals += 1;
        }

        for (name, entries) in &facts.functions {
            let Some((FactTuple::FuncDecl { span }, rest)) = entries.split_first() else {
                debug!(module = %facts.module_name, function = %name, "skipping function without definition");
                stats.skipped_functions += 1;
                continue;
            };
            insert_function(&tx, &facts.module_name, name, span, rest, &mut stats)?;
            stats.functions += 1;
        }

        tx.commit()?;
        info!(
            module = %facts.module_name,
            functions = stats.functions,
            globals = stats.globals,
            statements = stats.statements,
            "collected facts"
        );
        Ok(stats)
    }

    /// Look up a module by name.
    pub fn module(&self, name: &str) -> Result<Option<Module>, FactError> {
        let module = self
            .conn
            .query_row(
                "SELECT name FROM modules WHERE name = ?1",
                params![name],
                |row| Ok(Module { name: row.get(0)? }),
            )
            .optional()?;
        Ok(module)
    }

    /// All stored modules, by name.
    pub fn modules(&self) -> Result<Vec<Module>, FactError> {
        let mut stmt = self.conn.prepare("SELECT name FROM modules ORDER BY name")?;
        let rows = stmt.query_map([], |row| Ok(Module { name: row.get(0)? }))?;
        let modules = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(modules)
    }

    /// All functions of a module, fully hydrated, in ingestion order.
    pub fn functions(&self, module_name: &str) -> Result<Vec<Function>, FactError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, module_name, name, {SPAN_COLUMNS} FROM functions
             WHERE module_name = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![module_name], function_header)?;
        let headers = rows.collect::<Result<Vec<_>, _>>()?;
        headers.into_iter().map(|f| self.hydrate(f)).collect()
    }

    /// The first function of a module with the given name.
    pub fn function_named(
        &self,
        module_name: &str,
        name: &str,
    ) -> Result<Option<Function>, FactError> {
        let header = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, module_name, name, {SPAN_COLUMNS} FROM functions
                     WHERE module_name = ?1 AND name = ?2 ORDER BY id LIMIT 1"
                ),
                params![module_name, name],
                function_header,
            )
            .optional()?;
        header.map(|f| self.hydrate(f)).transpose()
    }

    /// Global variables of a module, in declaration order.
    pub fn globals(&self, module_name: &str) -> Result<Vec<Global>, FactError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, type_name, {SPAN_COLUMNS}, is_array, size FROM globals
             WHERE module_name = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![module_name], |row| {
            Ok(Global {
                name: row.get(0)?,
                type_name: row.get(1)?,
                span: span_at(row, 2)?,
                is_array: row.get(6)?,
                size: size_from_sql(row.get(7)?),
            })
        })?;
        let globals = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(globals)
    }

    /// Every statement of a module, in source order.
    pub fn statements_in_module(&self, module_name: &str) -> Result<Vec<Statement>, FactError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT module_name, {SPAN_COLUMNS}, expr FROM statements
             WHERE module_name = ?1 ORDER BY start_line, start_column, id"
        ))?;
        let rows = stmt.query_map(params![module_name], statement_row)?;
        let statements = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(statements)
    }

    fn hydrate(&self, mut function: Function) -> Result<Function, FactError> {
        function.var_decls = self.var_decls(function.id)?;
        function.calls = self.calls(function.id)?;
        function.statements = self.function_statements(function.id)?;
        Ok(function)
    }

    fn var_decls(&self, function_id: i64) -> Result<Vec<VarDecl>, FactError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, type_name, {SPAN_COLUMNS}, is_array, size FROM var_decls
             WHERE function_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![function_id], |row| {
            Ok(VarDecl {
                name: row.get(0)?,
                type_name: row.get(1)?,
                span: span_at(row, 2)?,
                is_array: row.get(6)?,
                size: size_from_sql(row.get(7)?),
            })
        })?;
        let decls = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(decls)
    }

    fn calls(&self, function_id: i64) -> Result<Vec<Call>, FactError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, module_name, expr, callee, {SPAN_COLUMNS} FROM calls
             WHERE function_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![function_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Call {
                    module_name: row.get(1)?,
                    expr: row.get(2)?,
                    callee: row.get(3)?,
                    span: span_at(row, 4)?,
                    arguments: Vec::new(),
                },
            ))
        })?;
        let calls = rows.collect::<Result<Vec<_>, _>>()?;

        let mut args_stmt = self.conn.prepare(
            "SELECT name, type_name FROM call_arguments WHERE call_id = ?1 ORDER BY id",
        )?;
        let mut hydrated = Vec::with_capacity(calls.len());
        for (call_id, mut call) in calls {
            let args = args_stmt.query_map(params![call_id], |row| {
                Ok(Argument {
                    name: row.get(0)?,
                    type_name: row.get(1)?,
                })
            })?;
            call.arguments = args.collect::<Result<Vec<_>, _>>()?;
            hydrated.push(call);
        }
        Ok(hydrated)
    }

    fn function_statements(&self, function_id: i64) -> Result<Vec<Statement>, FactError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT module_name, {SPAN_COLUMNS}, expr FROM statements
             WHERE function_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![function_id], statement_row)?;
        let statements = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(statements)
    }
}

impl FactQuery for FactStore {
    fn function_containing(&self, location: &Location) -> Result<Option<Function>, FactError> {
        // Innermost (latest-starting) function wins when spans overlap.
        let header = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, module_name, name, {SPAN_COLUMNS} FROM functions
                     WHERE module_name = ?1
                       AND (?2 > start_line OR (?2 = start_line AND ?3 >= start_column))
                       AND (?2 < end_line OR (?2 = end_line AND ?3 <= end_column))
                     ORDER BY start_line DESC, start_column DESC, id
                     LIMIT 1"
                ),
                params![location.module_name(), location.line(), location.column()],
                function_header,
            )
            .optional()?;
        header.map(|f| self.hydrate(f)).transpose()
    }

    fn statement_at(&self, location: &Location) -> Result<Option<Statement>, FactError> {
        let statement = self
            .conn
            .query_row(
                &format!(
                    "SELECT module_name, {SPAN_COLUMNS}, expr FROM statements
                     WHERE module_name = ?1 AND start_line = ?2 AND start_column = ?3
                     ORDER BY id LIMIT 1"
                ),
                params![location.module_name(), location.line(), location.column()],
                statement_row,
            )
            .optional()?;
        Ok(statement)
    }
}

fn remove_module(tx: &Transaction<'_>, module_name: &str) -> rusqlite::Result<()> {
    tx.execute(
        "DELETE FROM call_arguments WHERE call_id IN
            (SELECT id FROM calls WHERE module_name = ?1)",
        params![module_name],
    )?;
    tx.execute("DELETE FROM calls WHERE module_name = ?1", params![module_name])?;
    tx.execute(
        "DELETE FROM statements WHERE module_name = ?1",
        params![module_name],
    )?;
    tx.execute(
        "DELETE FROM var_decls WHERE function_id IN
            (SELECT id FROM functions WHERE module_name = ?1)",
        params![module_name],
    )?;
    tx.execute("DELETE FROM globals WHERE module_name = ?1", params![module_name])?;
    tx.execute(
        "DELETE FROM functions WHERE module_name = ?1",
        params![module_name],
    )?;
    tx.execute("DELETE FROM modules WHERE name = ?1", params![module_name])?;
    Ok(())
}

fn insert_function(
    tx: &Transaction<'_>,
    module_name: &str,
    name: &str,
    span: &SourceSpan,
    entries: &[FactTuple],
    stats: &mut CollectStats,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO functions (module_name, name, start_line, start_column, end_line, end_column)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            module_name,
            name,
            span.start_line,
            span.start_column,
            span.end_line,
            span.end_column
        ],
    )?;
    let function_id = tx.last_insert_rowid();

    for entry in entries {
        match entry {
            // A prototype followed by the definition yields two decls; the later one is the body.
            FactTuple::FuncDecl { span } => {
                tx.execute(
                    "UPDATE functions
                     SET start_line = ?2, start_column = ?3, end_line = ?4, end_column = ?5
                     WHERE id = ?1",
                    params![
                        function_id,
                        span.start_line,
                        span.start_column,
                        span.end_line,
                        span.end_column
                    ],
                )?;
            }
            FactTuple::VarType {
                span,
                name,
                type_name,
                is_array,
                size,
            } => {
                tx.execute(
                    "INSERT INTO var_decls (function_id, name, type_name, start_line, start_column,
                                            end_line, end_column, is_array, size)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        function_id,
                        name,
                        type_name,
                        span.start_line,
                        span.start_column,
                        span.end_line,
                        span.end_column,
                        is_array,
                        size_to_sql(*size)
                    ],
                )?;
                stats.var_decls += 1;
            }
            FactTuple::CallType {
                span,
                expr,
                callee,
                arguments,
            } => {
                tx.execute(
                    "INSERT INTO calls (module_name, function_id, expr, callee, start_line,
                                        start_column, end_line, end_column)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        module_name,
                        function_id,
                        expr,
                        callee,
                        span.start_line,
                        span.start_column,
                        span.end_line,
                        span.end_column
                    ],
                )?;
                let call_id = tx.last_insert_rowid();
                for (arg_name, arg_type) in arguments {
                    tx.execute(
                        "INSERT INTO call_arguments (call_id, name, type_name) VALUES (?1, ?2, ?3)",
                        params![call_id, arg_name, arg_type],
                    )?;
                }
                stats.calls += 1;
            }
            FactTuple::StmtType { span, expr } => {
                tx.execute(
                    "INSERT INTO statements (module_name, function_id, start_line, start_column,
                                             end_line, end_column, expr)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        module_name,
                        function_id,
                        span.start_line,
                        span.start_column,
                        span.end_line,
                        span.end_column,
                        expr
                    ],
                )?;
                stats.statements += 1;
            }
        }
    }
    Ok(())
}

fn span_at(row: &Row<'_>, first: usize) -> rusqlite::Result<SourceSpan> {
    Ok(SourceSpan::new(
        row.get(first)?,
        row.get(first + 1)?,
        row.get(first + 2)?,
        row.get(first + 3)?,
    ))
}

fn function_header(row: &Row<'_>) -> rusqlite::Result<Function> {
    Ok(Function {
        id: row.get(0)?,
        module_name: row.get(1)?,
        name: row.get(2)?,
        span: span_at(row, 3)?,
        var_decls: Vec::new(),
        calls: Vec::new(),
        statements: Vec::new(),
    })
}

fn statement_row(row: &Row<'_>) -> rusqlite::Result<Statement> {
    Ok(Statement {
        module_name: row.get(0)?,
        span: span_at(row, 1)?,
        expr: row.get(5)?,
    })
}

fn size_to_sql(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

fn size_from_sql(size: i64) -> u64 {
    u64::try_from(size).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(json: &str) -> AstFacts {
        serde_json::from_str(json).unwrap()
    }

    fn two_function_module() -> AstFacts {
        facts(
            r#"{
                "module_name": "prog.c",
                "globals": [["var_type", 1, 1, 1, 10, "counter", "int", 0, 4]],
                "functions": {
                    "helper": [
                        ["func_decl", 3, 1, 6, 1],
                        ["var_type", 3, 12, 3, 16, "n", "int", 0, 4],
                        ["stmt_type", 4, 3, 4, 14, "return n + 1"]
                    ],
                    "main": [
                        ["func_decl", 8, 1, 12, 1],
                        ["var_type", 9, 3, 9, 14, "buf", "char", 1, 8],
                        ["call_type", 10, 3, 10, 11, "helper(2)", "helper", ["2", "int"]],
                        ["stmt_type", 10, 3, 10, 11, "helper(2)"]
                    ],
                    "puts": [["var_type", 0, 0, 0, 0, "s", "const char *", 0, 8]]
                }
            }"#,
        )
    }

    #[test]
    fn test_collect_counts() {
        let mut store = FactStore::open_in_memory().unwrap();
        let stats = store.collect(&two_function_module()).unwrap();
        assert_eq!(
            stats,
            CollectStats {
                functions: 2,
                skipped_functions: 1,
                globals: 1,
                var_decls: 2,
                calls: 1,
                statements: 2,
            }
        );
    }

    #[test]
    fn test_collect_twice_replaces_module() {
        let mut store = FactStore::open_in_memory().unwrap();
        store.collect(&two_function_module()).unwrap();
        store.collect(&two_function_module()).unwrap();
        assert_eq!(store.functions("prog.c").unwrap().len(), 2);
        assert_eq!(store.globals("prog.c").unwrap().len(), 1);
        assert_eq!(store.statements_in_module("prog.c").unwrap().len(), 2);
        assert_eq!(store.modules().unwrap().len(), 1);
    }

    #[test]
    fn test_function_containing_resolves_by_span() {
        let mut store = FactStore::open_in_memory().unwrap();
        store.collect(&two_function_module()).unwrap();

        let main = store
            .function_containing(&Location::new("prog.c", 10, 3))
            .unwrap()
            .unwrap();
        assert_eq!(main.name, "main");
        assert_eq!(main.var_decls.len(), 1);
        assert_eq!(main.calls[0].arguments[0].name, "2");

        let helper = store
            .function_containing(&Location::new("prog.c", 4, 3))
            .unwrap()
            .unwrap();
        assert_eq!(helper.name, "helper");
    }

    #[test]
    fn test_function_containing_requires_module_match() {
        let mut store = FactStore::open_in_memory().unwrap();
        store.collect(&two_function_module()).unwrap();
        assert!(
            store
                .function_containing(&Location::new("other.c", 10, 3))
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .function_containing(&Location::new("prog.c", 7, 1))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_statement_at_is_exact() {
        let mut store = FactStore::open_in_memory().unwrap();
        store.collect(&two_function_module()).unwrap();
        let stmt = store
            .statement_at(&Location::new("prog.c", 10, 3))
            .unwrap()
            .unwrap();
        assert_eq!(stmt.expr, "helper(2)");
        assert!(
            store
                .statement_at(&Location::new("prog.c", 10, 4))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_later_func_decl_updates_span() {
        let mut store = FactStore::open_in_memory().unwrap();
        store
            .collect(&facts(
                r#"{
                    "module_name": "proto.c",
                    "functions": {
                        "f": [["func_decl", 1, 1, 1, 8], ["func_decl", 3, 1, 5, 1]]
                    }
                }"#,
            ))
            .unwrap();
        let f = store.function_named("proto.c", "f").unwrap().unwrap();
        assert_eq!(f.span, SourceSpan::new(3, 1, 5, 1));
    }

    #[test]
    fn test_non_var_global_is_malformed() {
        let mut store = FactStore::open_in_memory().unwrap();
        let err = store
            .collect(&facts(
                r#"{"module_name": "bad.c", "globals": [["stmt_type", 1, 1, 1, 2, "x"]]}"#,
            ))
            .unwrap_err();
        assert!(matches!(err, FactError::MalformedFact(_)));
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("facts.sqlite");
        {
            let mut store = FactStore::open(&db_path).unwrap();
            store.collect(&two_function_module()).unwrap();
            assert_eq!(store.path(), Some(db_path.as_path()));
        }
        let store = FactStore::open(&db_path).unwrap();
        assert!(store.module("prog.c").unwrap().is_some());
    }
}
