use crate::schema::TableSchema;

/// Generate CREATE TABLE SQL for a table schema
pub fn generate_create_table(schema: &TableSchema) -> String {
    let mut sql = format!("CREATE TABLE {} (\n", schema.name);
    let mut columns: Vec<String> = schema
        .columns
        .iter()
        .map(|col| format!("    {}", col.definition()))
        .collect();

    // Add foreign key constraints
    for fk in schema.foreign_keys {
        let on_delete = if fk.on_delete_cascade {
            " ON DELETE CASCADE"
        } else {
            ""
        };
        columns.push(format!(
            "    FOREIGN KEY ({}) REFERENCES {}({}){}",
            fk.column, fk.references_table, fk.references_column, on_delete
        ));
    }

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n)");

    sql
}

pub fn generate_drop_table(schema: &TableSchema) -> String {
    format!("DROP TABLE IF EXISTS {}", schema.name)
}

/// Generate CREATE INDEX statements for foreign key columns and explicit indexes
pub fn generate_indexes(schema: &TableSchema) -> Vec<String> {
    let fk_indexes = schema.foreign_keys.iter().map(|fk| {
        format!(
            "CREATE INDEX idx_{}_{} ON {}({})",
            schema.name, fk.column, schema.name, fk.column
        )
    });

    let explicit = schema.indexes.iter().map(|index| {
        format!(
            "CREATE INDEX \"{}\" ON {}({})",
            index.name,
            schema.name,
            index.columns.join(", ")
        )
    });

    fk_indexes.chain(explicit).collect()
}

/// Generate the INSERT statement covering every column of the table
pub fn generate_insert(schema: &TableSchema) -> String {
    let columns = schema.column_names();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.name,
        columns.join(", "),
        placeholders.join(", ")
    )
}
