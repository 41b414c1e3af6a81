//! Node configuration, from flags or `REPARTO_*` environment variables.

use clap::Parser;
use reparto_geo::{GeoCoord, DEFAULT_INFLUENCE_RADIUS_KM};

/// Runtime configuration for a mesh node.
#[derive(Debug, Clone, Parser)]
#[command(name = "reparto-node", about = "Reparto delivery mesh node")]
pub struct NodeConfig {
    /// Public base url other peers reach this node at
    #[arg(long, env = "REPARTO_HOST")]
    pub host: String,

    /// Geographic center as "long,lat"
    #[arg(long, env = "REPARTO_CENTER", value_parser = parse_center, allow_hyphen_values = true)]
    pub center: GeoCoord,

    /// City this node serves
    #[arg(long, env = "REPARTO_CITY")]
    pub city: String,

    /// Country this node serves
    #[arg(long, env = "REPARTO_COUNTRY")]
    pub country: String,

    /// Url of an existing mesh node to bootstrap from; omit for the
    /// first node of a mesh
    #[arg(long, env = "REPARTO_INITIAL_PEER")]
    pub initial_peer: Option<String>,

    /// Port to listen on
    #[arg(long, default_value = "7370", env = "REPARTO_PORT")]
    pub port: u16,

    /// Event loop polling interval in milliseconds
    #[arg(long, default_value = "1000", env = "REPARTO_TICK_MS")]
    pub tick_ms: u64,

    /// Influence radius in kilometers
    #[arg(long, default_value_t = DEFAULT_INFLUENCE_RADIUS_KM, env = "REPARTO_INFLUENCE_RADIUS_KM")]
    pub influence_radius_km: f64,

    /// Initial delivery radius in kilometers
    #[arg(long, default_value = "0", env = "REPARTO_DELIVERY_RADIUS_KM")]
    pub delivery_radius_km: f64,

    /// Outbound request timeout in seconds
    #[arg(long, default_value = "10", env = "REPARTO_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,
}

/// Parse a "long,lat" pair into a validated coordinate.
fn parse_center(s: &str) -> Result<GeoCoord, String> {
    let (long, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"long,lat\", got {s:?}"))?;
    let long: f64 = long
        .trim()
        .parse()
        .map_err(|e| format!("bad longitude: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    let coord = GeoCoord::new(long, lat);
    if !coord.is_valid() {
        return Err(format!("coordinate out of range: {coord}"));
    }
    Ok(coord)
}
