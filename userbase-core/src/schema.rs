use crate::dialect::SqlDialect;

/// Metadata about a database column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    /// The name of the column.
    pub name: String,
    /// The SQL type of the column (e.g., "INTEGER", "TEXT").
    pub sql_type: String,
    /// Whether the column can contain NULL values.
    pub nullable: bool,
    /// Whether the column is the auto-incrementing Primary Key.
    pub primary_key: bool,
}

/// A UNIQUE constraint over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaUnique {
    pub columns: Vec<String>,
}

/// Metadata about a foreign key relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaForeignKey {
    /// The column in the current table.
    pub column: String,
    /// The table being referenced.
    pub ref_table: String,
    /// The column being referenced in the target table.
    pub ref_column: String,
    /// Delete referencing rows together with the referenced row.
    pub on_delete_cascade: bool,
}

/// Metadata about a database table, enough to render its `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTable {
    /// The name of the table.
    pub name: String,
    /// The columns in the table.
    pub columns: Vec<SchemaColumn>,
    /// Table-level UNIQUE constraints.
    pub uniques: Vec<SchemaUnique>,
    /// The foreign keys in the table.
    pub foreign_keys: Vec<SchemaForeignKey>,
}

impl SchemaTable {
    /// Starts a table whose first column is an auto-incrementing `id` primary key.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: vec![SchemaColumn {
                name: "id".to_string(),
                sql_type: String::new(),
                nullable: false,
                primary_key: true,
            }],
            uniques: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Adds a NOT NULL column.
    pub fn column(mut self, name: &str, sql_type: &str) -> Self {
        self.columns.push(SchemaColumn {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: false,
            primary_key: false,
        });
        self
    }

    /// Adds a nullable column.
    pub fn nullable_column(mut self, name: &str, sql_type: &str) -> Self {
        self.columns.push(SchemaColumn {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: true,
            primary_key: false,
        });
        self
    }

    /// Adds a UNIQUE constraint over `columns`.
    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.uniques.push(SchemaUnique {
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    /// Adds `column REFERENCES ref_table(ref_column) ON DELETE CASCADE`.
    pub fn references_cascade(mut self, column: &str, ref_table: &str, ref_column: &str) -> Self {
        self.foreign_keys.push(SchemaForeignKey {
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
            on_delete_cascade: true,
        });
        self
    }

    /// Returns a column by name if it exists in the table.
    pub fn find_column(&self, name: &str) -> Option<&SchemaColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Generates a `CREATE TABLE IF NOT EXISTS` statement in the dialect of `DB`.
    pub fn to_create_sql<DB: SqlDialect>(&self) -> String {
        let mut defs = Vec::with_capacity(self.columns.len() + self.uniques.len());
        for col in &self.columns {
            let name = DB::quote_identifier(&col.name);
            if col.primary_key {
                defs.push(format!("{} {}", name, DB::auto_increment_pk()));
                continue;
            }
            let mut def = format!("{} {}", name, col.sql_type);
            if !col.nullable {
                def.push_str(" NOT NULL");
            }
            defs.push(def);
        }
        for unique in &self.uniques {
            let cols = unique
                .columns
                .iter()
                .map(|c| DB::quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            defs.push(format!("UNIQUE ({})", cols));
        }
        for fk in &self.foreign_keys {
            let mut def = format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                DB::quote_identifier(&fk.column),
                DB::quote_identifier(&fk.ref_table),
                DB::quote_identifier(&fk.ref_column)
            );
            if fk.on_delete_cascade {
                def.push_str(" ON DELETE CASCADE");
            }
            defs.push(def);
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            DB::quote_identifier(&self.name),
            defs.join(", ")
        )
    }
}
