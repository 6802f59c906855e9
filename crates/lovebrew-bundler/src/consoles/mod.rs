//! Pipelines for each supported target.

mod cafe;
mod ctr;
mod hac;

pub use cafe::{Cafe, ELF_TO_RPL, WUHB_TOOL};
pub use ctr::{BINARY_TOOL as CTR_BINARY_TOOL, Ctr, MAX_DESCRIPTION_BYTES, SMDH_TOOL};
pub use hac::{BINARY_TOOL as HAC_BINARY_TOOL, Hac, NACP_TOOL};

pub(crate) static CTR: Ctr = Ctr;
pub(crate) static HAC: Hac = Hac;
pub(crate) static CAFE: Cafe = Cafe;
