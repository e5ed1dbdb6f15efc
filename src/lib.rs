//! Lava lamp core: a stylized thermal integrator for wax blobs in a
//! cylindrical vessel, and a metaball rasterizer that turns blob state
//! into RGBA frames.
//!
//! [`Simulation`] is the entry point for a frame driver. The lower-level
//! pieces ([`integrator::advance`], [`field::FieldSampler`],
//! [`raster::Rasterizer`], [`clock::SimulationClock`]) are usable on
//! their own.

pub mod blob;
pub mod clock;
pub mod field;
pub mod integrator;
pub mod math;
pub mod palette;
pub mod params;
pub mod raster;
pub mod sim;

pub use blob::Blob;
pub use clock::SimulationClock;
pub use integrator::TickReport;
pub use palette::{Palette, Rgb};
pub use params::Parameters;
pub use raster::{Frame, Rasterizer};
pub use sim::{Impulse, Simulation};
