//! ---
//! ess_section: "05-networking-external-interfaces"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Fixed register map and word codec for telemetry transmission."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Register map shared with the remote controller.
//!
//! Every telemetry field lives at a fixed holding-register address inside one of three
//! per-device ranges. Floats occupy two words (low half first), enumerations and small
//! integers occupy one. The layout is a wire contract: new fields are appended after
//! the last used offset of a range and existing ones are never renumbered.
#![warn(missing_docs)]

pub mod codec;
pub mod frame;
pub mod map;

pub use codec::{float_to_words, words_to_float, RegisterValue, RegisterWrite};
pub use frame::{
    apply_writes, decode_descriptor, decode_field, encode_frame, snapshot_image, RegisterImage,
    RegisterSource,
};
pub use map::{
    descriptors, validate_layout, BmsRegister, ClimateRegister, Encoding, LayoutError,
    PcsRegister, RegisterDescriptor, RegisterField, Subsystem, BMS_BASE, CLIMATE_BASE, PCS_BASE,
};
