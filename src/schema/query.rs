//! Fetch-field catalog and SELECT templates over the city tables

use std::fmt;
use std::str::FromStr;

use crate::config::{
    ADMINISTRATIVE_TABLE_NAME, CITY_FTS_TABLE_NAME, CITY_TABLE_NAME, COUNTRY_TABLE_NAME,
};

/// A named field callers can request from the query engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CityField {
    Id,
    GeonamesId,
    Name,
    AdministrativeName,
    CountryName,
    Longitude,
    Latitude,
    Population,
    Timezone,
    AsciiName,
    AlternateNames,
    FeatureClass,
    FeatureCode,
    CountryCode,
    Cc2,
    Admin1Code,
    Admin2Code,
    Admin3Code,
    Admin4Code,
    Elevation,
    Dem,
    Modification,
    /// Every native column of the city table
    All,
}

impl CityField {
    pub const ALL: &'static [CityField] = &[
        CityField::Id,
        CityField::GeonamesId,
        CityField::Name,
        CityField::AdministrativeName,
        CityField::CountryName,
        CityField::Longitude,
        CityField::Latitude,
        CityField::Population,
        CityField::Timezone,
        CityField::AsciiName,
        CityField::AlternateNames,
        CityField::FeatureClass,
        CityField::FeatureCode,
        CityField::CountryCode,
        CityField::Cc2,
        CityField::Admin1Code,
        CityField::Admin2Code,
        CityField::Admin3Code,
        CityField::Admin4Code,
        CityField::Elevation,
        CityField::Dem,
        CityField::Modification,
        CityField::All,
    ];

    /// The fields backing [`crate::query::CityInfo`]
    pub const MINIMAL: &'static [CityField] = &[
        CityField::Id,
        CityField::Name,
        CityField::AdministrativeName,
        CityField::CountryName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CityField::Id => "id",
            CityField::GeonamesId => "geonames_id",
            CityField::Name => "name",
            CityField::AdministrativeName => "administrative_name",
            CityField::CountryName => "country_name",
            CityField::Longitude => "longitude",
            CityField::Latitude => "latitude",
            CityField::Population => "population",
            CityField::Timezone => "timezone",
            CityField::AsciiName => "ascii_name",
            CityField::AlternateNames => "alternate_names",
            CityField::FeatureClass => "feature_class",
            CityField::FeatureCode => "feature_code",
            CityField::CountryCode => "country_code",
            CityField::Cc2 => "cc2",
            CityField::Admin1Code => "admin1_code",
            CityField::Admin2Code => "admin2_code",
            CityField::Admin3Code => "admin3_code",
            CityField::Admin4Code => "admin4_code",
            CityField::Elevation => "elevation",
            CityField::Dem => "dem",
            CityField::Modification => "modification",
            CityField::All => "*",
        }
    }

    /// Whether the expression changes with the requested language
    pub fn is_localized(&self) -> bool {
        self.localized_table().is_some()
    }

    fn localized_table(&self) -> Option<&'static str> {
        match self {
            CityField::Name => Some(CITY_TABLE_NAME),
            CityField::AdministrativeName => Some(ADMINISTRATIVE_TABLE_NAME),
            CityField::CountryName => Some(COUNTRY_TABLE_NAME),
            _ => None,
        }
    }

    /// SQL select-list expression for this field.
    ///
    /// `lang` must already be a validated language code; it is spliced into
    /// a column name.
    pub fn expression(&self, lang: Option<&str>) -> String {
        if let Some(table) = self.localized_table() {
            return match lang {
                Some(lang) => format!(
                    "COALESCE({table}.name_{lang}, {table}.name) AS {}",
                    self.as_str()
                ),
                None => format!("{table}.name AS {}", self.as_str()),
            };
        }

        match self {
            CityField::Id => format!("{CITY_TABLE_NAME}.geonames_id AS id"),
            CityField::All => format!("{CITY_TABLE_NAME}.*"),
            other => format!("{CITY_TABLE_NAME}.{0} AS {0}", other.as_str()),
        }
    }
}

impl fmt::Display for CityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a field name is not in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown field: {}", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for CityField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CityField::ALL
            .iter()
            .find(|f| f.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Logical query shapes understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryTemplate {
    /// Params: fts match expression, limit
    Search,
    /// Params: geonames id
    ById,
    /// Params: latitude, longitude, limit
    Nearest,
}

impl QueryTemplate {
    fn tail(&self) -> String {
        match self {
            QueryTemplate::Search => format!(
                "INNER JOIN {fts} ON {city}.geonames_id = {fts}.geonames_id\n\
                 WHERE {fts}.name MATCH ?1\n\
                 LIMIT ?2",
                fts = CITY_FTS_TABLE_NAME,
                city = CITY_TABLE_NAME,
            ),
            QueryTemplate::ById => format!("WHERE {CITY_TABLE_NAME}.geonames_id = ?1"),
            QueryTemplate::Nearest => format!(
                "ORDER BY DISTANCE(?1, ?2, {city}.latitude, {city}.longitude)\n\
                 LIMIT ?3",
                city = CITY_TABLE_NAME,
            ),
        }
    }
}

/// Compile the SELECT statement for the given fields, template and language
pub fn compile_select(fields: &[CityField], template: QueryTemplate, lang: Option<&str>) -> String {
    let projection: Vec<String> = fields.iter().map(|f| f.expression(lang)).collect();

    format!(
        "SELECT\n    {projection}\n\
         FROM {city}\n\
         LEFT JOIN {admin} ON {city}.administrative_unit_id = {admin}.geonames_id\n\
         LEFT JOIN {country} ON {city}.country_id = {country}.geonames_id\n\
         {tail}",
        projection = projection.join(",\n    "),
        city = CITY_TABLE_NAME,
        admin = ADMINISTRATIVE_TABLE_NAME,
        country = COUNTRY_TABLE_NAME,
        tail = template.tail(),
    )
}

/// Turn free text into an FTS5 prefix query: every token is quoted and the
/// last one gets the `*` prefix operator. Returns `None` for blank input.
pub fn fts_prefix_query(query: &str) -> Option<String> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();

    if tokens.is_empty() {
        return None;
    }

    Some(format!("{}*", tokens.join(" ")))
}
