//! Sources of serial port candidates.

use super::DeviceCandidate;
use crate::port::PortError;
use serialport::{SerialPortInfo, SerialPortType};

/// Lists the serial endpoints visible to the host.
#[cfg_attr(test, mockall::automock)]
pub trait PortEnumerator {
    fn enumerate(&self) -> Result<Vec<DeviceCandidate>, PortError>;
}

/// Enumerates the host's ports through `serialport::available_ports`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnumerator;

impl PortEnumerator for SystemEnumerator {
    fn enumerate(&self) -> Result<Vec<DeviceCandidate>, PortError> {
        let ports = serialport::available_ports()?;
        Ok(ports.iter().map(DeviceCandidate::from).collect())
    }
}

/// A fixed list of candidates, for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct StaticEnumerator(pub Vec<DeviceCandidate>);

impl PortEnumerator for StaticEnumerator {
    fn enumerate(&self) -> Result<Vec<DeviceCandidate>, PortError> {
        Ok(self.0.clone())
    }
}

impl From<&SerialPortInfo> for DeviceCandidate {
    fn from(info: &SerialPortInfo) -> Self {
        match &info.port_type {
            SerialPortType::UsbPort(usb) => {
                let description = non_blank(&usb.product)
                    .or_else(|| non_blank(&usb.manufacturer))
                    .unwrap_or("n/a");
                DeviceCandidate::new(&info.port_name, Some(usb.vid), Some(usb.pid), description)
            }
            SerialPortType::BluetoothPort => {
                DeviceCandidate::new(&info.port_name, None, None, "Bluetooth serial port")
            }
            SerialPortType::PciPort => {
                DeviceCandidate::new(&info.port_name, None, None, "PCI serial port")
            }
            SerialPortType::Unknown => DeviceCandidate::new(&info.port_name, None, None, "n/a"),
        }
    }
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.trim().is_empty())
}
