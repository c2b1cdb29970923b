//! Great-circle distance, usable from SQL as `DISTANCE(lat1, lon1, lat2, lon2)`

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Name of the SQL scalar function registered by [`register_distance_function`]
pub const DISTANCE_FUNCTION: &str = "DISTANCE";

/// Haversine distance in kilometres between two points given in degrees.
pub fn haversine_km(lat_1: f64, lon_1: f64, lat_2: f64, lon_2: f64) -> f64 {
    if lat_1 == lat_2 && lon_1 == lon_2 {
        return 0.0;
    }

    let (lat_1, lon_1) = (lat_1.to_radians(), lon_1.to_radians());
    let (lat_2, lon_2) = (lat_2.to_radians(), lon_2.to_radians());
    let d_lat = lat_2 - lat_1;
    let d_lon = lon_2 - lon_1;

    let a = (d_lat / 2.0).sin().powi(2) + lat_1.cos() * lat_2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    c * EARTH_RADIUS_KM
}

/// Register `DISTANCE` on the connection as a deterministic scalar function
pub fn register_distance_function(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        DISTANCE_FUNCTION,
        4,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(haversine_km(
                ctx.get::<f64>(0)?,
                ctx.get::<f64>(1)?,
                ctx.get::<f64>(2)?,
                ctx.get::<f64>(3)?,
            ))
        },
    )
}
