//! State probers
//!
//! Read-only queries against the platform. A probe never mutates system
//! state; it either reports an observation or fails with
//! [`MendError::ProbeUnavailable`](crate::error::MendError::ProbeUnavailable).

pub mod network;
pub mod trust;

pub use network::{classify, NetworkCategory, NetworkLocation, NetworkProber, NetworkProfile};
pub use trust::{TrustProber, TrustState};

use crate::error::MendResult;
use std::fmt::{Debug, Display};

/// A probe result
pub trait Observation: Clone + PartialEq + Debug + Display {
    /// Whether this observation is the desired end state (healthy, home)
    fn is_settled(&self) -> bool;
}

/// Produces a fresh observation on every call
#[allow(async_fn_in_trait)]
pub trait Prober {
    type Output: Observation;

    /// Query the platform for the current condition
    async fn probe(&mut self) -> MendResult<Self::Output>;
}
