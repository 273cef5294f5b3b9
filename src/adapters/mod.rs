//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to                   |
//! |-------------|---------------------|-------------------------------|
//! | `console`   | (command source)    | Serial console lines          |
//! | `hardware`  | SensorPort          | DS18B20 bus, flow pulse ISR   |
//! |             | ActuatorPort        | Relay bank, pump PWM          |
//! | `log_sink`  | EventSink           | Serial log output             |
//! |             | AlertSink           | Serial log (no buzzer fitted) |
//! | `nvs`       | ConfigPort          | NVS / in-memory store         |
//! | `onewire`   | OneWire             | ESP32 RMT one-wire driver     |
//! | `time`      | –                   | ESP32 system timer            |

pub mod console;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
#[cfg(target_os = "espidf")]
pub mod onewire;
pub mod time;
