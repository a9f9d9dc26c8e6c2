//! Signal identifiers and radio observations.
//!
//! Types here represent empirical radio data: which transmitter was
//! heard and how loudly. Everything geographic is derived later by the
//! estimators; nothing in this module knows where a transmitter is.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Plausible radius bounds for a Wi-Fi reading, in metres.
const WIFI_RADIUS_BOUNDS_M: (f64, f64) = (25.0, 1_000.0);

/// Plausible radius bounds for a cell reading, in metres.
const CELL_RADIUS_BOUNDS_M: (f64, f64) = (500.0, 5_000.0);

/// Reference signal level for a very close Wi-Fi access point, in dBm.
const WIFI_NEAR_DBM: f64 = -40.0;

/// Reference signal level for a very close cell tower, in dBm.
const CELL_NEAR_DBM: f64 = -50.0;

/// Error parsing a signal identifier from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseIdentifierError {
    /// The BSSID was not six colon-separated hex octets.
    #[error("invalid BSSID '{0}', expected aa:bb:cc:dd:ee:ff")]
    InvalidBssid(String),
}

/// A Wi-Fi access point hardware address (BSSID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bssid(pub [u8; 6]);

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for Bssid {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in &mut octets {
            let part = parts
                .next()
                .ok_or_else(|| ParseIdentifierError::InvalidBssid(s.to_string()))?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| ParseIdentifierError::InvalidBssid(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(ParseIdentifierError::InvalidBssid(s.to_string()));
        }
        Ok(Self(octets))
    }
}

/// The two kinds of local radio signal the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// Cellular network cells.
    Cell,
    /// Wi-Fi access points.
    Wifi,
}

impl SignalKind {
    /// Number of signal kinds; used to size per-kind tables.
    pub const COUNT: usize = 2;

    /// Stable index for per-kind tables.
    pub const fn index(self) -> usize {
        match self {
            SignalKind::Cell => 0,
            SignalKind::Wifi => 1,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Cell => write!(f, "cell"),
            SignalKind::Wifi => write!(f, "wifi"),
        }
    }
}

/// Opaque stable key naming one cell tower or one Wi-Fi access point.
///
/// Immutable once observed; used as the cache key in the signal maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalIdentifier {
    /// A GSM/UMTS/LTE cell, identified by its operator and cell numbers.
    Cell {
        /// Mobile country code.
        mcc: u16,
        /// Mobile network code.
        mnc: u16,
        /// Location area code.
        lac: u16,
        /// Cell id within the location area.
        cid: u32,
    },
    /// A Wi-Fi access point, identified by its BSSID.
    Wifi(Bssid),
}

impl SignalIdentifier {
    /// Which kind of signal this identifier names.
    pub const fn kind(&self) -> SignalKind {
        match self {
            SignalIdentifier::Cell { .. } => SignalKind::Cell,
            SignalIdentifier::Wifi(_) => SignalKind::Wifi,
        }
    }
}

impl fmt::Display for SignalIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalIdentifier::Cell { mcc, mnc, lac, cid } => {
                write!(f, "cell:{mcc}-{mnc}-{lac}-{cid}")
            }
            SignalIdentifier::Wifi(bssid) => write!(f, "wifi:{bssid}"),
        }
    }
}

/// A single timestamped radio reading.
///
/// Ephemeral: produced by the host's radio stack and consumed once by
/// the matching estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Which transmitter was heard.
    pub identifier: SignalIdentifier,
    /// Received signal strength in dBm (typically -120..-20).
    pub signal_dbm: i16,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    /// Create a new observation.
    pub fn new(identifier: SignalIdentifier, signal_dbm: i16, timestamp: DateTime<Utc>) -> Self {
        Self {
            identifier,
            signal_dbm,
            timestamp,
        }
    }
}

/// Estimate how far a device plausibly is from a transmitter heard at
/// the given signal level.
///
/// A rough free-space path-loss shape: the radius doubles for every
/// fixed drop in received power below the "very close" reference level,
/// clamped to per-kind bounds. The result seeds the accuracy radius of
/// the live per-identifier reading that estimators feed back into the
/// signal map, so it only needs to be plausible, not calibrated.
pub fn plausible_radius_m(kind: SignalKind, signal_dbm: i16) -> f64 {
    let (near_dbm, doubling_db, bounds) = match kind {
        SignalKind::Wifi => (WIFI_NEAR_DBM, 12.0, WIFI_RADIUS_BOUNDS_M),
        SignalKind::Cell => (CELL_NEAR_DBM, 30.0, CELL_RADIUS_BOUNDS_M),
    };
    let drop_db = near_dbm - f64::from(signal_dbm);
    let radius = bounds.0 * 1.2 * 2.0_f64.powf(drop_db / doubling_db);
    radius.clamp(bounds.0, bounds.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bssid_display_roundtrip() {
        let bssid: Bssid = "00:1a:2b:3c:4d:5e".parse().unwrap();
        assert_eq!(bssid.to_string(), "00:1a:2b:3c:4d:5e");
    }

    #[test]
    fn test_bssid_parse_rejects_garbage() {
        assert!("not-a-mac".parse::<Bssid>().is_err());
        assert!("00:1a:2b:3c:4d".parse::<Bssid>().is_err());
        assert!("00:1a:2b:3c:4d:5e:6f".parse::<Bssid>().is_err());
        assert!("zz:1a:2b:3c:4d:5e".parse::<Bssid>().is_err());
    }

    #[test]
    fn test_identifier_kind() {
        let cell = SignalIdentifier::Cell {
            mcc: 262,
            mnc: 2,
            lac: 434,
            cid: 7_465_392,
        };
        let wifi = SignalIdentifier::Wifi(Bssid([0, 1, 2, 3, 4, 5]));
        assert_eq!(cell.kind(), SignalKind::Cell);
        assert_eq!(wifi.kind(), SignalKind::Wifi);
    }

    #[test]
    fn test_identifier_display() {
        let cell = SignalIdentifier::Cell {
            mcc: 262,
            mnc: 2,
            lac: 434,
            cid: 7_465_392,
        };
        assert_eq!(cell.to_string(), "cell:262-2-434-7465392");

        let wifi = SignalIdentifier::Wifi(Bssid([0xaa, 0xbb, 0xcc, 0, 1, 2]));
        assert_eq!(wifi.to_string(), "wifi:aa:bb:cc:00:01:02");
    }

    #[test]
    fn test_radius_grows_as_signal_weakens() {
        let strong = plausible_radius_m(SignalKind::Wifi, -40);
        let medium = plausible_radius_m(SignalKind::Wifi, -70);
        let weak = plausible_radius_m(SignalKind::Wifi, -90);
        assert!(strong < medium);
        assert!(medium < weak);
    }

    #[test]
    fn test_radius_is_clamped() {
        assert_eq!(
            plausible_radius_m(SignalKind::Wifi, -10),
            WIFI_RADIUS_BOUNDS_M.0
        );
        assert_eq!(
            plausible_radius_m(SignalKind::Wifi, -127),
            WIFI_RADIUS_BOUNDS_M.1
        );
        assert_eq!(
            plausible_radius_m(SignalKind::Cell, -20),
            CELL_RADIUS_BOUNDS_M.0
        );
        assert_eq!(
            plausible_radius_m(SignalKind::Cell, -127),
            CELL_RADIUS_BOUNDS_M.1
        );
    }

    #[test]
    fn test_cell_readings_are_wider_than_wifi() {
        assert!(
            plausible_radius_m(SignalKind::Cell, -60) > plausible_radius_m(SignalKind::Wifi, -60)
        );
    }

    #[test]
    fn test_kind_indices_are_distinct() {
        assert_ne!(SignalKind::Cell.index(), SignalKind::Wifi.index());
        assert!(SignalKind::Cell.index() < SignalKind::COUNT);
        assert!(SignalKind::Wifi.index() < SignalKind::COUNT);
    }
}
