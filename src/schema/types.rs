use std::collections::HashSet;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// ISO date kept as text (`YYYY-MM-DD`)
    Date,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
        }
    }
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
}

impl Column {
    /// Create an optional (nullable) column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
            unique: false,
            primary_key: false,
        }
    }

    /// Create a required (non-nullable) column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            nullable: false,
            ..Self::new(name, col_type)
        }
    }

    /// Add a UNIQUE constraint
    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    /// Mark as the table's primary key (implies NOT NULL)
    pub const fn primary_key(self) -> Self {
        Self {
            primary_key: true,
            nullable: false,
            ..self
        }
    }

    /// Column definition as it appears inside CREATE TABLE
    pub fn definition(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.col_type.sql_type());
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        sql
    }
}

/// Foreign key reference
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
    pub on_delete_cascade: bool,
}

impl ForeignKey {
    /// Reference to another table's `geonames_id`, cascading deletes
    pub const fn cascade(column: &'static str, references_table: &'static str) -> Self {
        Self {
            column,
            references_table,
            references_column: "geonames_id",
            on_delete_cascade: true,
        }
    }
}

/// Index definition
#[derive(Debug, Clone)]
pub struct Index {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl Index {
    pub const fn on(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self { name, columns }
    }
}

/// Table schema definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    /// Columns in insert order. The first `source_columns` of them come
    /// straight from the dump file, the rest are resolved by the loader.
    pub columns: &'static [Column],
    pub source_columns: usize,
    pub foreign_keys: &'static [ForeignKey],
    pub indexes: &'static [Index],
}

impl TableSchema {
    /// Get all tables this table depends on (FK parents)
    pub fn dependencies(&self) -> HashSet<&'static str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.references_table)
            .collect()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns read from the source file, in file order
    pub fn source(&self) -> &'static [Column] {
        &self.columns[..self.source_columns]
    }
}
