//! Location core for the dalil directory: the geographic hierarchy cache,
//! slug resolution, the per-session "current location" slot, and the
//! one-shot geolocation bootstrapper.
//!
//! The flow between the pieces:
//!
//! 1. [`HierarchyStore`] lazily fetches countries, regions, and cities once
//!    per session and answers id/slug/name lookups from memory.
//! 2. [`LocationResolver`] turns a free-form URL slug into a typed
//!    [`LocationDescriptor`], most specific type first (city beats region
//!    beats country), with a remote city-by-slug fallback.
//! 3. [`SessionState`] owns the single mutable "current location" slot.
//!    Writers are the user's explicit selection and the bootstrapper; the
//!    bootstrapper never overwrites an explicit choice.
//! 4. [`GeoBootstrapper`] upgrades the default location in the background
//!    from a device position fix, reverse-geocoded and cascaded through the
//!    hierarchy. Every failure path lands on the configured default city.

mod bootstrap;
mod descriptor;
mod geocode;
mod hierarchy;
mod resolver;
mod session;

pub use bootstrap::{BootstrapOutcome, FixedPosition, GeoBootstrapper, PositionError, PositionSource};
pub use descriptor::{LocationAncestry, LocationDescriptor, LocationKind};
pub use geocode::{Address, Coordinates, GeocodeError, ReverseGeocoder};
pub use hierarchy::HierarchyStore;
pub use resolver::{LocationResolver, Resolution};
pub use session::{SelectionSource, SessionState};
