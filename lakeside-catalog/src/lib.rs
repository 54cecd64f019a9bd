pub mod pricing;
pub mod availability;
pub mod allocation;

pub use allocation::{Allocation, AllocationError, RoomAllocator, RoomSelection, RoomTypeRequest};
pub use availability::{AvailabilityFinder, AvailableRoom};
pub use pricing::{CurrencySettings, PriceQuote, PricingError, PricingResolver};
