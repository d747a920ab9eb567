#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]

//! ANT+ protocol primitives and sensor nodes.
//!
//! Layout: `device.rs` (profiles), `message.rs` (serial framing),
//! `page.rs` (data pages), `calc.rs` (rate calculators), `node.rs`
//! (node seam and scan plans), `simulator.rs` (in-process node).

pub mod calc;
pub mod device;
pub mod error;
pub mod message;
pub mod node;
pub mod page;
pub mod simulator;

pub use calc::{PowerCalculator, RevolutionCalculator, STALL_PAGES, speed_kmh};
pub use device::DeviceType;
pub use error::{SensorError, SensorResult};
pub use message::{ChannelId, Message};
pub use node::{
    ChannelRequest, FrameReceiver, MAX_CHANNELS, NodeFactory, RF_FREQUENCY, ScanPlan, SensorNode,
};
pub use page::DeviceData;
pub use simulator::{SimulatedDevice, SimulatedNode, SimulatedNodeFactory};
