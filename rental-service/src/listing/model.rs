//! Rental listing snapshot types
//!
//! Every value here is a read-only snapshot of a row at query time. The JSON
//! shape matches the public API (`primary_image_url`, `price.day`, `user`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Primary identifier of a rental listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RentalId(i32);

impl RentalId {
    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// The raw identifier value
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for RentalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for RentalId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Error returned when a string is not a valid rental identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rental id '{0}'")]
pub struct ParseRentalIdError(String);

impl FromStr for RentalId {
    type Err = ParseRentalIdError;

    /// Accepts non-negative decimal integers that fit in `i32`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i32>() {
            Ok(id) if id >= 0 => Ok(Self(id)),
            _ => Err(ParseRentalIdError(s.to_string())),
        }
    }
}

/// Daily price in the currency's smallest whole unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub day: i32,
}

/// Where the rental is parked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
}

/// Owner of a listing, joined from the users table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
}

/// A rental listing with its owner attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rental {
    pub id: RentalId,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub length: f64,
    pub sleeps: i32,
    /// Empty when the listing has no image
    pub primary_image_url: String,
    pub price: Price,
    pub location: Location,
    #[serde(rename = "user")]
    pub owner: Owner,
}
