//! In-memory database used by unit tests.
//!
//! Understands just the statements the copy pipeline issues: the existence
//! probe, `SELECT <columns> FROM <table> [WHERE <column> < <n>]`,
//! `CREATE TABLE`, and the parameterized `INSERT`. Inserted rows become
//! visible on commit. Anything else passed to `execute` is recorded and
//! succeeds.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use crate::connection::Endpoint;
use crate::core::{
    Connection, Connector, DatabaseInfo, FetchOptions, GeneratedColumn, InsertStatement,
    Nullability, RawRow, RowCursor, SqlValue,
};
use crate::error::{FlowError, Result};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::typemap::GenericType;

fn db_error(message: impl Into<String>) -> FlowError {
    FlowError::Io(std::io::Error::new(std::io::ErrorKind::Other, message.into()))
}

#[derive(Default)]
struct MemTable {
    columns: Vec<GeneratedColumn>,
    rows: Vec<Vec<SqlValue>>,
}

#[derive(Default)]
struct State {
    product: String,
    tables: BTreeMap<String, MemTable>,
    pending: Vec<(String, Vec<SqlValue>)>,
    executed: Vec<String>,
    commits: Vec<usize>,
    rollbacks: usize,
    auto_commit: bool,
    fail_probes: usize,
    fail_on: Vec<String>,
    insert_limit: Option<usize>,
    inserted: usize,
    executions: Vec<usize>,
    last_fetch: Option<FetchOptions>,
}

/// Row filter of a parsed `SELECT`.
enum Filter<'q> {
    All,
    /// `WHERE 1 = 2`, the existence probe.
    Nothing,
    /// `WHERE <column> < <n>` on an integer column.
    Below(&'q str, i64),
}

struct Select<'q> {
    table: &'q str,
    /// `None` is `*`.
    columns: Option<Vec<&'q str>>,
    filter: Filter<'q>,
}

fn parse_select(sql: &str) -> Option<Select<'_>> {
    let rest = sql.strip_prefix("SELECT ")?;
    let (projection, rest) = rest.split_once(" FROM ")?;
    let (table, filter) = match rest.split_once(" WHERE ") {
        None => (rest, Filter::All),
        Some((table, "1 = 2")) => (table, Filter::Nothing),
        Some((table, condition)) => {
            let (column, bound) = condition.split_once(" < ")?;
            (table, Filter::Below(column, bound.trim().parse().ok()?))
        }
    };
    let columns = match projection {
        "*" => None,
        list => Some(list.split(',').map(str::trim).collect()),
    };
    Some(Select {
        table,
        columns,
        filter,
    })
}

fn as_integer(value: &SqlValue) -> Option<i64> {
    match value {
        SqlValue::I16(v) => Some(i64::from(*v)),
        SqlValue::I32(v) => Some(i64::from(*v)),
        SqlValue::I64(v) => Some(*v),
        _ => None,
    }
}

/// Shared handle to an in-memory database. Clones see the same data.
#[derive(Clone)]
pub struct MemoryDatabase {
    state: Rc<RefCell<State>>,
}

impl MemoryDatabase {
    pub fn new(product: &str) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                product: product.to_string(),
                auto_commit: true,
                ..State::default()
            })),
        }
    }

    /// Create a committed table.
    pub fn create_table(
        &self,
        name: &str,
        columns: Vec<GeneratedColumn>,
        rows: Vec<Vec<SqlValue>>,
    ) {
        self.state
            .borrow_mut()
            .tables
            .insert(name.to_string(), MemTable { columns, rows });
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.state.borrow().tables.contains_key(name)
    }

    /// Committed rows of a table.
    pub fn rows(&self, name: &str) -> Vec<Vec<SqlValue>> {
        self.state
            .borrow()
            .tables
            .get(name)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Every statement passed to `execute`, including failed ones.
    pub fn executed(&self) -> Vec<String> {
        self.state.borrow().executed.clone()
    }

    /// Number of pending rows made visible by each commit.
    pub fn commits(&self) -> Vec<usize> {
        self.state.borrow().commits.clone()
    }

    pub fn rollbacks(&self) -> usize {
        self.state.borrow().rollbacks
    }

    pub fn auto_commit(&self) -> bool {
        self.state.borrow().auto_commit
    }

    /// Row count of every parameter array sent by an insert.
    pub fn executions(&self) -> Vec<usize> {
        self.state.borrow().executions.clone()
    }

    pub fn last_fetch(&self) -> Option<FetchOptions> {
        self.state.borrow().last_fetch
    }

    /// Make the next `n` existence probes fail.
    pub fn fail_next_probes(&self, n: usize) {
        self.state.borrow_mut().fail_probes = n;
    }

    /// Fail every statement containing `fragment`.
    pub fn fail_on(&self, fragment: &str) {
        self.state.borrow_mut().fail_on.push(fragment.to_string());
    }

    /// Fail the insert of row number `limit + 1`.
    pub fn fail_inserts_after(&self, limit: usize) {
        self.state.borrow_mut().insert_limit = Some(limit);
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        let state = self.state.borrow();
        match state.fail_on.iter().find(|f| sql.contains(f.as_str())) {
            Some(fragment) => Err(db_error(format!("injected failure on '{}'", fragment))),
            None => Ok(()),
        }
    }

    /// Make pending rows visible. Returns how many there were.
    fn flush(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();
        for (table, row) in pending {
            if let Some(t) = state.tables.get_mut(&table) {
                t.rows.push(row);
            }
        }
        count
    }

    fn create_from_ddl(&self, sql: &str) -> Result<()> {
        let rest = sql.strip_prefix("CREATE TABLE ").unwrap_or(sql);
        let (name, body) = rest
            .split_once(" ( ")
            .ok_or_else(|| db_error(format!("syntax error: {}", sql)))?;
        let body = body.strip_suffix(')').unwrap_or(body);

        let mut state = self.state.borrow_mut();
        if state.tables.contains_key(name) {
            return Err(db_error(format!("table {} already exists", name)));
        }
        let columns = body
            .split(", ")
            .filter_map(|def| def.split_whitespace().next())
            .map(|col| GeneratedColumn {
                name: col.to_string(),
                generic_type: GenericType::VarChar,
                precision: 0,
                scale: 0,
                nullability: Nullability::Unknown,
            })
            .collect();
        state.tables.insert(
            name.to_string(),
            MemTable {
                columns,
                rows: Vec::new(),
            },
        );
        Ok(())
    }
}

fn to_cell(value: &SqlValue) -> Option<Vec<u8>> {
    match value {
        SqlValue::Null(_) => None,
        SqlValue::Bytes(b) => Some(hex::encode_upper(b).into_bytes()),
        other => Some(other.to_string().into_bytes()),
    }
}

impl Connection for MemoryDatabase {
    fn info(&self) -> Result<DatabaseInfo> {
        Ok(DatabaseInfo {
            product: self.state.borrow().product.clone(),
            version: Some("1.0".to_string()),
        })
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.state.borrow_mut().executed.push(sql.to_string());
        self.check_failure(sql)?;
        if sql.starts_with("CREATE TABLE ") {
            self.create_from_ddl(sql)?;
        }
        Ok(())
    }

    fn describe(&self, sql: &str) -> Result<Vec<GeneratedColumn>> {
        self.check_failure(sql)?;
        let select =
            parse_select(sql).ok_or_else(|| db_error(format!("unsupported query: {}", sql)))?;
        let mut state = self.state.borrow_mut();
        if matches!(select.filter, Filter::Nothing) && state.fail_probes > 0 {
            state.fail_probes -= 1;
            return Err(db_error("connection reset during probe"));
        }
        state
            .tables
            .get(select.table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| db_error(format!("no such table: {}", select.table)))
    }

    fn set_auto_commit(&self, enabled: bool) -> Result<()> {
        if enabled {
            self.flush();
        }
        self.state.borrow_mut().auto_commit = enabled;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let count = self.flush();
        self.state.borrow_mut().commits.push(count);
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.pending.clear();
        state.rollbacks += 1;
        Ok(())
    }

    fn open_cursor<'c>(
        &'c self,
        sql: &str,
        options: FetchOptions,
    ) -> Result<Box<dyn RowCursor + 'c>> {
        self.check_failure(sql)?;
        let select = parse_select(sql)
            .filter(|select| !matches!(select.filter, Filter::Nothing))
            .ok_or_else(|| db_error(format!("unsupported query: {}", sql)))?;
        let mut state = self.state.borrow_mut();
        state.last_fetch = Some(options);
        let table = state
            .tables
            .get(select.table)
            .ok_or_else(|| db_error(format!("no such table: {}", select.table)))?;

        let position = |name: &str| {
            table
                .columns
                .iter()
                .position(|c| c.name == name)
                .ok_or_else(|| db_error(format!("no such column: {}", name)))
        };
        let projection: Vec<usize> = match &select.columns {
            None => (0..table.columns.len()).collect(),
            Some(names) => names.iter().map(|name| position(*name)).collect::<Result<_>>()?,
        };
        let bound = match select.filter {
            Filter::Below(column, n) => Some((position(column)?, n)),
            _ => None,
        };

        let rows = table
            .rows
            .iter()
            .filter(|row| match bound {
                Some((index, n)) => as_integer(&row[index]).is_some_and(|v| v < n),
                None => true,
            })
            .map(|row| projection.iter().map(|&index| to_cell(&row[index])).collect())
            .collect();
        let column_names = projection
            .iter()
            .map(|&index| table.columns[index].name.clone())
            .collect();
        Ok(Box::new(MemoryCursor {
            rows,
            column_names,
            max_text_length: options.max_text_length,
        }))
    }

    fn prepare<'c>(
        &'c self,
        sql: &str,
        batch_size: usize,
    ) -> Result<Box<dyn InsertStatement + 'c>> {
        self.check_failure(sql)?;
        let rest = sql
            .strip_prefix("INSERT INTO ")
            .ok_or_else(|| db_error(format!("unsupported statement: {}", sql)))?;
        let (table, _) = rest
            .split_once(" VALUES ")
            .ok_or_else(|| db_error(format!("syntax error: {}", sql)))?;
        if !self.has_table(table) {
            return Err(db_error(format!("no such table: {}", table)));
        }
        Ok(Box::new(MemoryInsert {
            db: self.clone(),
            table: table.to_string(),
            params: sql.matches('?').count(),
            capacity: batch_size.max(1),
        }))
    }
}

/// Fails on an over-long cell the way the ODBC cursor does.
struct MemoryCursor {
    rows: VecDeque<RawRow>,
    column_names: Vec<String>,
    max_text_length: usize,
}

impl RowCursor for MemoryCursor {
    fn next_row(&mut self) -> Result<Option<RawRow>> {
        let Some(row) = self.rows.pop_front() else {
            return Ok(None);
        };
        for (name, cell) in self.column_names.iter().zip(&row) {
            if let Some(bytes) = cell.as_ref().filter(|b| b.len() > self.max_text_length) {
                return Err(FlowError::Config(format!(
                    "value of column '{}' ({} bytes) is longer than maxTextLength ({} bytes)",
                    name,
                    bytes.len(),
                    self.max_text_length
                )));
            }
        }
        Ok(Some(row))
    }
}

struct MemoryInsert {
    db: MemoryDatabase,
    table: String,
    params: usize,
    capacity: usize,
}

impl InsertStatement for MemoryInsert {
    fn execute_batch(&mut self, rows: &[Vec<SqlValue>]) -> Result<u64> {
        let mut state = self.db.state.borrow_mut();
        for chunk in rows.chunks(self.capacity) {
            state.executions.push(chunk.len());
        }
        for row in rows {
            if row.len() != self.params {
                return Err(db_error(format!(
                    "expected {} parameters, got {}",
                    self.params,
                    row.len()
                )));
            }
            if state.insert_limit.is_some_and(|limit| state.inserted >= limit) {
                return Err(db_error("disk full"));
            }
            state.inserted += 1;
            if state.auto_commit {
                if let Some(t) = state.tables.get_mut(&self.table) {
                    t.rows.push(row.clone());
                }
            } else {
                state.pending.push((self.table.clone(), row.clone()));
            }
        }
        Ok(rows.len() as u64)
    }
}

/// Connector handing out connections to registered in-memory databases by URL.
#[derive(Default)]
pub struct MemoryConnector {
    databases: HashMap<String, MemoryDatabase>,
    connections: RefCell<Vec<String>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, db: MemoryDatabase) -> Self {
        self.databases.insert(url.to_string(), db);
        self
    }

    /// URLs connected to, in order.
    pub fn connections(&self) -> Vec<String> {
        self.connections.borrow().clone()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>> {
        let db = self
            .databases
            .get(&endpoint.url)
            .ok_or_else(|| db_error(format!("unknown database {}", endpoint.url)))?;
        self.connections.borrow_mut().push(endpoint.url.clone());
        Ok(Box::new(db.clone()))
    }
}

/// Column metadata shorthand.
pub fn column(name: &str, generic_type: GenericType, nullability: Nullability) -> GeneratedColumn {
    GeneratedColumn {
        name: name.to_string(),
        generic_type,
        precision: if generic_type == GenericType::VarChar { 50 } else { 10 },
        scale: 0,
        nullability,
    }
}

/// A two-column `(id INT, name VARCHAR)` table with `n` rows.
pub fn numbered_rows(n: usize) -> (Vec<GeneratedColumn>, Vec<Vec<SqlValue>>) {
    let columns = vec![
        column("id", GenericType::Integer, Nullability::NoNulls),
        column("name", GenericType::VarChar, Nullability::Nullable),
    ];
    let rows = (0..n)
        .map(|i| vec![SqlValue::I32(i as i32), SqlValue::Text(format!("row {}", i))])
        .collect();
    (columns, rows)
}

/// Progress sink that keeps every event.
#[derive(Default)]
pub struct RecordingProgress {
    events: RefCell<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.borrow().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, event: &ProgressEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
