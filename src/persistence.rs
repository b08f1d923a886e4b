//! # Persistence Module
//!
//! Snapshot sources backed by files: a JSON snapshot document and a
//! read-only SQLite family-tree cache. Loading is the only blocking step of
//! a run; the returned [`Snapshot`] is fully materialized.

use crate::error::LoadError;
use crate::model::{Fact, FactKind, Gender, NameVariant, ParentRole, Person, PersonId, Relationship};
use crate::store::{QueryScope, Snapshot, SnapshotDocument, SnapshotSource};
use crate::temporal::{DateRange, MAX_YEAR, MIN_YEAR};
use hashbrown::HashMap;
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Name type sorted first among a person's name variants
const PRIMARY_NAME_TYPE: &str = "BirthName";

/// Snapshot stored as a JSON [`SnapshotDocument`].
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSource for JsonFileSource {
    #[instrument(skip(self), fields(path = %self.path.display()), level = "debug")]
    fn load(&self, scope: &QueryScope) -> Result<Snapshot, LoadError> {
        let text = fs::read_to_string(&self.path)?;
        let document: SnapshotDocument = serde_json::from_str(&text)?;
        debug!(
            persons = document.persons.len(),
            relationships = document.relationships.len(),
            "json snapshot read"
        );
        Ok(Snapshot::scoped(document, scope)?)
    }
}

/// Read-only family-tree cache in SQLite.
///
/// Expected tables: `persons`, `person_names`, `facts`,
/// `parent_child_relationships`, and optionally `couple_relationships` and
/// `person_source_refs`. `facts.date_original` and `person_source_refs.tag`
/// are used when present.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, LoadError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }

    /// Read the whole tree into a document
    pub fn read_document(&self) -> Result<SnapshotDocument, LoadError> {
        let conn = self.open()?;
        let mut persons = read_persons(&conn)?;
        read_names(&conn, &mut persons)?;
        read_facts(&conn, &mut persons)?;
        read_source_refs(&conn, &mut persons)?;

        let mut relationships = read_parent_links(&conn)?;
        relationships.extend(read_couples(&conn)?);

        let mut persons: Vec<Person> = persons.into_values().collect();
        persons.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(SnapshotDocument {
            persons,
            relationships,
        })
    }
}

impl SnapshotSource for SqliteSource {
    #[instrument(skip(self), fields(path = %self.path.display()), level = "debug")]
    fn load(&self, scope: &QueryScope) -> Result<Snapshot, LoadError> {
        let document = self.read_document()?;
        debug!(
            persons = document.persons.len(),
            relationships = document.relationships.len(),
            "sqlite snapshot read"
        );
        Ok(Snapshot::scoped(document, scope)?)
    }
}

fn has_column(conn: &Connection, table: &str, column: &str) -> bool {
    conn.prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
        .is_ok()
}

fn has_table(conn: &Connection, table: &str) -> bool {
    conn.prepare(&format!("SELECT 1 FROM {} LIMIT 1", table))
        .is_ok()
}

fn parse_gender(raw: Option<&str>) -> Gender {
    match raw.map(|g| g.trim().to_ascii_lowercase()).as_deref() {
        Some("m") | Some("male") => Gender::Male,
        Some("f") | Some("female") => Gender::Female,
        _ => Gender::Unknown,
    }
}

fn read_persons(conn: &Connection) -> Result<HashMap<PersonId, Person>, LoadError> {
    let mut stmt = conn.prepare("SELECT person_id, display_name, gender FROM persons")?;
    let rows = stmt.query_map([], |row| {
        let id: String = row.get(0)?;
        let display_name: Option<String> = row.get(1)?;
        let gender: Option<String> = row.get(2)?;
        Ok((id, display_name, gender))
    })?;

    let mut persons = HashMap::new();
    for row in rows {
        let (id, display_name, gender) = row?;
        let mut person = Person::new(id).with_gender(parse_gender(gender.as_deref()));
        person.display_name = display_name.filter(|name| !name.trim().is_empty());
        persons.insert(person.id.clone(), person);
    }
    Ok(persons)
}

fn read_names(conn: &Connection, persons: &mut HashMap<PersonId, Person>) -> Result<(), LoadError> {
    let mut stmt = conn.prepare(
        "SELECT person_id, name_type, given_name, surname FROM person_names
         ORDER BY person_id, CASE WHEN name_type = ?1 THEN 0 ELSE 1 END, rowid",
    )?;
    let rows = stmt.query_map([PRIMARY_NAME_TYPE], |row| {
        let id: String = row.get(0)?;
        let name_type: Option<String> = row.get(1)?;
        let given: Option<String> = row.get(2)?;
        let surname: Option<String> = row.get(3)?;
        Ok((id, name_type, given, surname))
    })?;

    for row in rows {
        let (id, name_type, given, surname) = row?;
        let Some(person) = persons.get_mut(&PersonId::from(id)) else {
            continue;
        };
        let mut name = NameVariant::new(given.unwrap_or_default(), surname.unwrap_or_default());
        name.source = name_type;
        person.names.push(name);
    }
    Ok(())
}

/// Decode a `yyyymmdd` sort key where month and day may be zero.
fn date_from_sort_key(key: i64) -> Option<DateRange> {
    let year = i32::try_from(key / 10_000).ok()?;
    let month = u8::try_from((key / 100) % 100).ok()?;
    let day = u8::try_from(key % 100).ok()?;
    if year == 0 {
        return None;
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        warn!(key, "date sort key outside the supported years, ignoring");
        return None;
    }
    match (month, day) {
        (0, _) => Some(DateRange::year(year)),
        (m, 0) => DateRange::year_month(year, m).ok(),
        (m, d) => DateRange::ymd(year, m, d)
            .or_else(|_| DateRange::year_month(year, m))
            .ok(),
    }
}

fn resolve_date(person: &str, original: Option<&str>, sort_key: Option<i64>) -> DateRange {
    if let Some(text) = original.filter(|text| !text.trim().is_empty()) {
        match text.parse::<DateRange>() {
            Ok(date) => return date,
            Err(e) => {
                warn!(person, date = text, error = %e, "unparseable date, using sort key");
            }
        }
    }
    sort_key
        .and_then(date_from_sort_key)
        .unwrap_or_else(DateRange::unknown)
}

fn read_facts(conn: &Connection, persons: &mut HashMap<PersonId, Person>) -> Result<(), LoadError> {
    let original = if has_column(conn, "facts", "date_original") {
        "date_original"
    } else {
        "NULL"
    };
    let sql = format!(
        "SELECT person_id, fact_type, {}, date_sort, place_normalized FROM facts
         ORDER BY person_id, date_sort, rowid",
        original
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let id: String = row.get(0)?;
        let fact_type: Option<String> = row.get(1)?;
        let date_original: Option<String> = row.get(2)?;
        let date_sort: Option<i64> = row.get(3)?;
        let place: Option<String> = row.get(4)?;
        Ok((id, fact_type, date_original, date_sort, place))
    })?;

    for row in rows {
        let (id, fact_type, date_original, date_sort, place) = row?;
        let date = resolve_date(&id, date_original.as_deref(), date_sort);
        let Some(person) = persons.get_mut(&PersonId::from(id)) else {
            continue;
        };
        let label = fact_type.unwrap_or_default();
        let kind = FactKind::from_label(&label);
        let mut fact = Fact::new(kind, date);
        fact.place = place.filter(|place| !place.trim().is_empty());
        if kind == FactKind::Other && !label.is_empty() {
            fact.label = Some(label);
        }
        person.facts.push(fact);
    }
    Ok(())
}

fn read_source_refs(
    conn: &Connection,
    persons: &mut HashMap<PersonId, Person>,
) -> Result<(), LoadError> {
    if !has_table(conn, "person_source_refs") {
        return Ok(());
    }
    let tag = if has_column(conn, "person_source_refs", "tag") {
        "tag"
    } else {
        "NULL"
    };
    let sql = format!("SELECT person_id, source_id, {} FROM person_source_refs", tag);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let id: String = row.get(0)?;
        let source: String = row.get(1)?;
        let tag: Option<String> = row.get(2)?;
        Ok((id, source, tag))
    })?;

    for row in rows {
        let (id, source, tag) = row?;
        let Some(person) = persons.get_mut(&PersonId::from(id)) else {
            continue;
        };
        let reference = match tag.as_deref().map(str::trim) {
            Some(tag) if !tag.is_empty() => format!("{}:{}", tag, source),
            _ => source,
        };
        person.sources.insert(reference);
    }
    Ok(())
}

fn read_parent_links(conn: &Connection) -> Result<Vec<Relationship>, LoadError> {
    let mut stmt = conn.prepare(
        "SELECT parent_id, child_id, parent_role FROM parent_child_relationships
         ORDER BY child_id, parent_id",
    )?;
    let rows = stmt.query_map([], |row| {
        let parent: String = row.get(0)?;
        let child: String = row.get(1)?;
        let role: Option<String> = row.get(2)?;
        Ok((parent, child, role))
    })?;

    let mut links = Vec::new();
    for row in rows {
        let (parent, child, role) = row?;
        let role = ParentRole::from_label(role.as_deref().unwrap_or_default());
        links.push(Relationship::parent_child(parent, child).with_role(role));
    }
    Ok(links)
}

fn read_couples(conn: &Connection) -> Result<Vec<Relationship>, LoadError> {
    if !has_table(conn, "couple_relationships") {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(
        "SELECT person1_id, person2_id, marriage_date FROM couple_relationships
         ORDER BY person1_id, person2_id",
    )?;
    let rows = stmt.query_map([], |row| {
        let a: String = row.get(0)?;
        let b: String = row.get(1)?;
        let date: Option<String> = row.get(2)?;
        Ok((a, b, date))
    })?;

    let mut couples = Vec::new();
    for row in rows {
        let (a, b, date) = row?;
        let mut edge = Relationship::spouse(a.as_str(), b.as_str());
        if let Some(text) = date.as_deref().filter(|text| !text.trim().is_empty()) {
            match text.parse::<DateRange>() {
                Ok(date) => edge = edge.with_date(date),
                Err(e) => warn!(person = %a, date = text, error = %e, "unparseable marriage date"),
            }
        }
        couples.push(edge);
    }
    Ok(couples)
}
