//! PL2303 chip specifics: variant detection and the vendor init sequence
//!
//! The chip exposes undocumented vendor registers that must be poked in a
//! fixed order before the serial lines behave. The sequence below is the one
//! every known PL2303 driver performs; the final register write differs
//! between the legacy chips and the HX revision.

use crate::usb::bridge::TransferBridge;
use common::{Error, Result};
use tracing::{debug, trace};

/// Expected size of a standard device descriptor
pub const DEVICE_DESCRIPTOR_SIZE: usize = 18;

/// PL2303 silicon revisions with differing init behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipVariant {
    /// Original chips reporting device class 0x02
    Type0,
    /// Later non-HX revisions
    Type1,
    /// HX and newer, recognized by a 64-byte EP0
    Hx,
}

impl ChipVariant {
    /// Classify the chip from its raw device descriptor
    pub fn detect(descriptor: &[u8]) -> Result<Self> {
        if descriptor.len() < DEVICE_DESCRIPTOR_SIZE {
            return Err(Error::ConfigurationMismatch("device descriptor truncated"));
        }
        let device_class = descriptor[4];
        let max_packet_size_0 = descriptor[7];

        let variant = if device_class == 0x02 {
            ChipVariant::Type0
        } else if max_packet_size_0 == 0x40 {
            ChipVariant::Hx
        } else {
            ChipVariant::Type1
        };
        debug!(
            "PL2303 variant {:?} (class {:#04x}, ep0 max packet {})",
            variant, device_class, max_packet_size_0
        );
        Ok(variant)
    }
}

/// Run the vendor register init dance
///
/// Register reads are only performed for their side effects; their values are
/// traced but otherwise ignored. Any failing step aborts bring-up with that
/// step's error.
pub async fn run_init_sequence(bridge: &TransferBridge, variant: ChipVariant) -> Result<()> {
    let r = bridge.vendor_read(0x8484, 0).await?;
    trace!("vendor 0x8484 -> {:#04x}", r);
    bridge.vendor_write(0x0404, 0).await?;
    let r = bridge.vendor_read(0x8484, 0).await?;
    trace!("vendor 0x8484 -> {:#04x}", r);
    let r = bridge.vendor_read(0x8383, 0).await?;
    trace!("vendor 0x8383 -> {:#04x}", r);
    let r = bridge.vendor_read(0x8484, 0).await?;
    trace!("vendor 0x8484 -> {:#04x}", r);
    bridge.vendor_write(0x0404, 1).await?;
    let r = bridge.vendor_read(0x8484, 0).await?;
    trace!("vendor 0x8484 -> {:#04x}", r);
    let r = bridge.vendor_read(0x8383, 0).await?;
    trace!("vendor 0x8383 -> {:#04x}", r);
    bridge.vendor_write(0x0000, 1).await?;
    bridge.vendor_write(0x0001, 0).await?;

    let flow_setup = if variant == ChipVariant::Hx { 0x44 } else { 0x24 };
    bridge.vendor_write(0x0002, flow_setup).await?;

    debug!("Vendor init sequence complete ({:?})", variant);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(class: u8, ep0: u8) -> [u8; DEVICE_DESCRIPTOR_SIZE] {
        let mut desc = [0u8; DEVICE_DESCRIPTOR_SIZE];
        desc[0] = DEVICE_DESCRIPTOR_SIZE as u8;
        desc[1] = 1;
        desc[4] = class;
        desc[7] = ep0;
        desc
    }

    #[test]
    fn test_detect_type0_by_class() {
        let variant = ChipVariant::detect(&descriptor(0x02, 0x40)).unwrap();
        assert_eq!(variant, ChipVariant::Type0);
    }

    #[test]
    fn test_detect_hx_by_ep0_size() {
        let variant = ChipVariant::detect(&descriptor(0x00, 0x40)).unwrap();
        assert_eq!(variant, ChipVariant::Hx);
    }

    #[test]
    fn test_detect_type1_fallback() {
        let variant = ChipVariant::detect(&descriptor(0xFF, 0x10)).unwrap();
        assert_eq!(variant, ChipVariant::Type1);
    }

    #[test]
    fn test_truncated_descriptor_rejected() {
        assert!(ChipVariant::detect(&[0u8; 8]).is_err());
    }
}
