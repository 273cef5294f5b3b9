//! RMT-backed one-wire link (ESP-IDF only).

use esp_idf_hal::onewire::OWDriver;
use log::warn;

use crate::error::SensorError;
use crate::sensors::ds18b20::{OneWire, Rom};

pub struct RmtOneWire<'d> {
    driver: OWDriver<'d>,
}

impl<'d> RmtOneWire<'d> {
    pub fn new(driver: OWDriver<'d>) -> Self {
        Self { driver }
    }

    /// ROM codes of every device that answers a bus search, in bus order.
    pub fn discover(&mut self) -> heapless::Vec<Rom, 8> {
        let mut found = heapless::Vec::new();
        let search = match self.driver.search() {
            Ok(s) => s,
            Err(e) => {
                warn!("onewire: search failed: {}", e);
                return found;
            }
        };
        for device in search {
            match device {
                Ok(addr) => {
                    if found.push(addr.address().to_le_bytes()).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("onewire: search step failed: {}", e),
            }
        }
        found
    }
}

impl OneWire for RmtOneWire<'_> {
    fn reset(&mut self) -> Result<(), SensorError> {
        self.driver.reset().map_err(|_| SensorError::BusFault)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SensorError> {
        self.driver.write(bytes).map_err(|_| SensorError::BusFault)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
        self.driver.read(buf).map_err(|_| SensorError::BusFault)
    }
}
