use std::time::Duration;

use log::{info, warn};
use nusb::{transfer::RequestBuffer, DeviceInfo};
use tokio::runtime::Runtime;

use crate::{
    consts::{ENDPOINT_IN_ADDR, ENDPOINT_OUT_ADDR, VENDOR_ID_GRAPHTEC},
    profile::{DeviceProfile, DEVICES},
    transport::Transport,
    CutterError, CutterResult,
};

/// A cutter attached via USB.
///
/// nusb transfers are futures, they are driven to completion on a private single threaded runtime,
/// which keeps the public interface blocking.
pub struct UsbTransport {
    interface: nusb::Interface,
    runtime: Runtime,
    in_addr: u8,
    out_addr: u8,
}

impl std::fmt::Debug for UsbTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbTransport")
            .field("in_addr", &self.in_addr)
            .field("out_addr", &self.out_addr)
            .finish_non_exhaustive()
    }
}

/// Picks the first attached device of the table, in table order, then any other Graphtec device.
fn find_device(devices: &[DeviceInfo]) -> Option<(&DeviceInfo, DeviceProfile)> {
    for profile in DEVICES {
        let found = devices
            .iter()
            .find(|d| d.vendor_id() == profile.vendor_id && Some(d.product_id()) == profile.product_id);

        if let Some(info) = found {
            return Some((info, *profile));
        }
    }

    devices
        .iter()
        .find(|d| d.vendor_id() == VENDOR_ID_GRAPHTEC)
        .map(|info| (info, DeviceProfile::unknown(info.product_id())))
}

fn describe(info: &DeviceInfo) -> String {
    format!(
        "{:04x}:{:04x} {} {}",
        info.vendor_id(),
        info.product_id(),
        info.manufacturer_string().unwrap_or("?"),
        info.product_string().unwrap_or("?"),
    )
}

impl UsbTransport {
    /// Opens the first known cutter and claims its interface.
    ///
    /// Returns the transport together with the profile of the device found.
    pub fn open() -> CutterResult<(Self, DeviceProfile)> {
        let devices: Vec<DeviceInfo> = nusb::list_devices()?.collect();

        let Some((info, profile)) = find_device(&devices) else {
            let seen = devices.iter().map(describe).collect::<Vec<_>>().join(", ");

            return Err(CutterError::NoDeviceFound {
                vid: VENDOR_ID_GRAPHTEC,
                seen,
            });
        };

        if profile.product().is_none() {
            warn!("Unknown Graphtec device {:#06x} found, trying anyway", info.product_id());
        }

        info!(
            "{profile} found on usb bus={} addr={}",
            info.bus_number(),
            info.device_address()
        );

        let device = info.open()?;
        let interface = device.detach_and_claim_interface(0)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        Ok((
            Self {
                interface,
                runtime,
                in_addr: ENDPOINT_IN_ADDR,
                out_addr: ENDPOINT_OUT_ADDR,
            },
            profile,
        ))
    }
}

impl Transport for UsbTransport {
    fn write(&mut self, chunk: &[u8], timeout: Duration) -> CutterResult<usize> {
        let transfer = self.interface.bulk_out(self.out_addr, chunk.to_vec());

        let written = self
            .runtime
            .block_on(async { tokio::time::timeout(timeout, transfer).await })
            .map_err(|_| CutterError::Timeout)?
            .into_result()?;

        Ok(written.actual_length())
    }

    fn read(&mut self, size: usize, timeout: Duration) -> CutterResult<Vec<u8>> {
        let transfer = self.interface.bulk_in(self.in_addr, RequestBuffer::new(size));

        let data = self
            .runtime
            .block_on(async { tokio::time::timeout(timeout, transfer).await })
            .map_err(|_| CutterError::Timeout)?
            .into_result()?;

        Ok(data)
    }
}
