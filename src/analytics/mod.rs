//! Client-side analytics: `POST /api/analytics` records one event into the
//! daily counters, `GET /api/analytics` sums them over a period.

pub mod dimensions;
pub mod handler;
pub mod types;
