//! Location-scoped content targeting: picking the single right
//! advertisement for a placement, and scoping business search results with
//! explicit fallback broadening.

mod ads;
mod businesses;

pub use ads::select_ad;
pub use businesses::{BusinessFinder, LocationContext, LocationRef, ScopedResults};
