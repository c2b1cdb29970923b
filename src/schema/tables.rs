//! Table schema definitions for the GeoNames store

use super::types::*;
use crate::config::{
    ADMINISTRATIVE_TABLE_NAME, ALTERNATE_NAME_TABLE_NAME, CITY_TABLE_NAME, COUNTRY_TABLE_NAME,
};

// =============================================================================
// Root table (no FK dependencies)
// =============================================================================

/// `countryInfo.txt`
pub static COUNTRY: TableSchema = TableSchema {
    name: COUNTRY_TABLE_NAME,
    columns: &[
        Column::required("iso", ColumnType::Text).unique(),
        Column::required("iso3", ColumnType::Text).unique(),
        Column::required("iso_numeric", ColumnType::Text).unique(),
        Column::new("fips", ColumnType::Text),
        Column::required("name", ColumnType::Text).unique(),
        Column::new("capital", ColumnType::Text),
        Column::required("area_sq_km", ColumnType::Real),
        Column::required("population", ColumnType::Integer),
        Column::required("continent", ColumnType::Text),
        Column::new("tld", ColumnType::Text),
        Column::new("currency_code", ColumnType::Text),
        Column::new("currency_name", ColumnType::Text),
        Column::new("phone", ColumnType::Text),
        Column::new("postal_code_format", ColumnType::Text),
        Column::new("postal_code_regex", ColumnType::Text),
        Column::new("languages", ColumnType::Text),
        Column::new("geonames_id", ColumnType::Integer).primary_key(),
        Column::new("neighbours", ColumnType::Text),
        Column::new("equivalent_fips_code", ColumnType::Text),
    ],
    source_columns: 19,
    foreign_keys: &[],
    indexes: &[],
};

// =============================================================================
// Dependent tables
// =============================================================================

/// `admin1CodesASCII.txt`
pub static ADMINISTRATIVE_UNIT: TableSchema = TableSchema {
    name: ADMINISTRATIVE_TABLE_NAME,
    columns: &[
        Column::required("key", ColumnType::Text).unique(),
        Column::required("name", ColumnType::Text),
        Column::required("ascii_name", ColumnType::Text),
        Column::new("geonames_id", ColumnType::Integer).primary_key(),
        // resolved from the key prefix
        Column::required("country_id", ColumnType::Integer),
    ],
    source_columns: 4,
    foreign_keys: &[ForeignKey::cascade("country_id", COUNTRY_TABLE_NAME)],
    indexes: &[],
};

/// `cities500.txt` .. `cities15000.txt`
pub static CITY: TableSchema = TableSchema {
    name: CITY_TABLE_NAME,
    columns: &[
        Column::new("geonames_id", ColumnType::Integer).primary_key(),
        Column::required("name", ColumnType::Text),
        Column::required("ascii_name", ColumnType::Text),
        Column::new("alternate_names", ColumnType::Text),
        Column::required("latitude", ColumnType::Real),
        Column::required("longitude", ColumnType::Real),
        Column::required("feature_class", ColumnType::Text),
        Column::new("feature_code", ColumnType::Text),
        Column::required("country_code", ColumnType::Text),
        Column::new("cc2", ColumnType::Text),
        Column::new("admin1_code", ColumnType::Text),
        Column::new("admin2_code", ColumnType::Text),
        Column::new("admin3_code", ColumnType::Text),
        Column::new("admin4_code", ColumnType::Text),
        Column::required("population", ColumnType::Integer),
        Column::new("elevation", ColumnType::Integer),
        Column::required("dem", ColumnType::Integer),
        Column::required("timezone", ColumnType::Text),
        Column::new("modification", ColumnType::Date),
        Column::new("administrative_unit_id", ColumnType::Integer),
        Column::required("country_id", ColumnType::Integer),
    ],
    source_columns: 19,
    foreign_keys: &[
        ForeignKey::cascade("administrative_unit_id", ADMINISTRATIVE_TABLE_NAME),
        ForeignKey::cascade("country_id", COUNTRY_TABLE_NAME),
    ],
    indexes: &[],
};

/// `alternateNamesV2.txt`. Parents are looked up at load time, so there is no
/// FK here.
pub static ALTERNATE_NAME: TableSchema = TableSchema {
    name: ALTERNATE_NAME_TABLE_NAME,
    columns: &[
        Column::new("id", ColumnType::Integer).primary_key(),
        Column::required("geonames_id", ColumnType::Integer),
        Column::new("lang", ColumnType::Text),
        Column::new("name", ColumnType::Text),
        Column::new("is_preferred", ColumnType::Integer),
        Column::new("is_short", ColumnType::Integer),
        Column::new("is_colloquial", ColumnType::Integer),
        Column::new("is_historic", ColumnType::Integer),
        Column::new("used_from", ColumnType::Text),
        Column::new("used_to", ColumnType::Text),
    ],
    source_columns: 10,
    foreign_keys: &[],
    indexes: &[Index::on("geonames_ids_idx", &["geonames_id", "lang"])],
};

/// All table schemas in load order
pub static ALL_TABLES: &[&TableSchema] = &[
    &COUNTRY,
    &ADMINISTRATIVE_UNIT,
    &CITY,
    &ALTERNATE_NAME,
];

/// Tables that receive derived `name_<lang>` columns
pub static LOCALIZED_TABLES: &[&TableSchema] = &[&COUNTRY, &ADMINISTRATIVE_UNIT, &CITY];

#[cfg(test)]
mod tests {
    use super::*;

    fn get_table(name: &str) -> Option<&'static TableSchema> {
        ALL_TABLES.iter().find(|t| t.name == name).copied()
    }

    #[test]
    fn test_parents_precede_children() {
        for (pos, table) in ALL_TABLES.iter().enumerate() {
            for dep in table.dependencies() {
                let parent_pos = ALL_TABLES.iter().position(|t| t.name == dep).unwrap();
                assert!(parent_pos < pos, "{} must load before {}", dep, table.name);
            }
        }
    }

    #[test]
    fn test_foreign_key_columns_exist() {
        for table in ALL_TABLES {
            for fk in table.foreign_keys {
                assert!(table.column(fk.column).is_some());
                let parent = get_table(fk.references_table).unwrap();
                assert!(parent.column(fk.references_column).is_some());
            }
        }
    }

    #[test]
    fn test_source_column_counts() {
        assert_eq!(COUNTRY.source().len(), 19);
        assert_eq!(ADMINISTRATIVE_UNIT.source().last().unwrap().name, "geonames_id");
        assert_eq!(CITY.source().last().unwrap().name, "modification");
        assert_eq!(ALTERNATE_NAME.source().len(), ALTERNATE_NAME.columns.len());
    }

    #[test]
    fn test_table_names() {
        assert_eq!(
            ALL_TABLES.iter().map(|t| t.name).collect::<Vec<_>>(),
            vec!["country", "administrative_unit", "city", "alternate_name"]
        );
    }
}
