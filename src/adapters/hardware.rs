//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the one-wire bus, the relay bank and the pump driver, exposing them
//! through [`SensorPort`] and [`ActuatorPort`].  Every peripheral arrives as
//! an `embedded-hal` implementation, so the same adapter runs on the ESP32
//! and against mock pins on the host.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::pump::PumpDriver;
use crate::drivers::relay::Relay;
use crate::error::{ActuatorError, SensorError};
use crate::sensors::flow::PulseCounter;
use crate::sensors::temperature::{SensorRole, TemperatureBus};

/// The four switched outputs of the still.
pub struct RelayBank<H1, H2, V, C> {
    pub heater_one: Relay<H1>,
    pub heater_two: Relay<H2>,
    pub valve: Relay<V>,
    pub cooler: Relay<C>,
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<B, H1, H2, V, C, P> {
    bus: B,
    pulses: &'static PulseCounter,
    relays: RelayBank<H1, H2, V, C>,
    pump: PumpDriver<P>,
}

impl<B, H1, H2, V, C, P> HardwareAdapter<B, H1, H2, V, C, P>
where
    B: TemperatureBus,
    H1: OutputPin,
    H2: OutputPin,
    V: OutputPin,
    C: OutputPin,
    P: SetDutyCycle,
{
    pub fn new(
        bus: B,
        pulses: &'static PulseCounter,
        relays: RelayBank<H1, H2, V, C>,
        pump: PumpDriver<P>,
    ) -> Self {
        Self {
            bus,
            pulses,
            relays,
            pump,
        }
    }

    /// Drop every output to its safe level.  Best effort: keeps going past
    /// a failed write and reports the first error.
    pub fn all_off(&mut self) -> Result<(), ActuatorError> {
        let results = [
            self.relays.heater_one.set(false),
            self.relays.heater_two.set(false),
            self.relays.valve.set(false),
            self.relays.cooler.set(false),
            self.pump.stop(),
        ];
        results.into_iter().collect()
    }

    pub fn relays(&self) -> &RelayBank<H1, H2, V, C> {
        &self.relays
    }

    pub fn pump(&self) -> &PumpDriver<P> {
        &self.pump
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<B, H1, H2, V, C, P> SensorPort for HardwareAdapter<B, H1, H2, V, C, P>
where
    B: TemperatureBus,
{
    fn request_conversion(&mut self) -> Result<(), SensorError> {
        self.bus.start_conversion()
    }

    fn read_celsius(&mut self, role: SensorRole) -> Result<f32, SensorError> {
        self.bus.read_celsius(role)
    }

    fn drain_flow_pulses(&mut self) -> u32 {
        self.pulses.drain()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<B, H1, H2, V, C, P> ActuatorPort for HardwareAdapter<B, H1, H2, V, C, P>
where
    H1: OutputPin,
    H2: OutputPin,
    V: OutputPin,
    C: OutputPin,
    P: SetDutyCycle,
{
    fn set_heater_one(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.relays.heater_one.set(on)
    }

    fn set_heater_two(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.relays.heater_two.set(on)
    }

    fn set_valve(&mut self, open: bool) -> Result<(), ActuatorError> {
        self.relays.valve.set(open)
    }

    fn set_cooler(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.relays.cooler.set(on)
    }

    fn set_pump_duty(&mut self, duty: u16) -> Result<(), ActuatorError> {
        self.pump.set_duty(duty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::relay::Polarity;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType as PinErrorType;
    use embedded_hal::pwm::ErrorType as PwmErrorType;

    #[derive(Default)]
    struct Pin(bool);
    impl PinErrorType for Pin {
        type Error = Infallible;
    }
    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0 = false;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0 = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Pwm(u16);
    impl PwmErrorType for Pwm {
        type Error = Infallible;
    }
    impl SetDutyCycle for Pwm {
        fn max_duty_cycle(&self) -> u16 {
            1023
        }
        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.0 = duty;
            Ok(())
        }
    }

    struct Bus {
        converting: bool,
    }
    impl TemperatureBus for Bus {
        fn start_conversion(&mut self) -> Result<(), SensorError> {
            self.converting = true;
            Ok(())
        }
        fn read_celsius(&mut self, role: SensorRole) -> Result<f32, SensorError> {
            match role {
                SensorRole::Reference => Ok(25.0),
                SensorRole::Boiler => Ok(78.4),
                SensorRole::Output => Err(SensorError::NotConnected),
            }
        }
    }

    static PULSES: PulseCounter = PulseCounter::new();

    fn adapter() -> HardwareAdapter<Bus, Pin, Pin, Pin, Pin, Pwm> {
        let relays = RelayBank {
            heater_one: Relay::new(Pin::default(), Polarity::ActiveLow).unwrap(),
            heater_two: Relay::new(Pin::default(), Polarity::ActiveLow).unwrap(),
            valve: Relay::new(Pin::default(), Polarity::ActiveHigh).unwrap(),
            cooler: Relay::new(Pin::default(), Polarity::ActiveHigh).unwrap(),
        };
        HardwareAdapter::new(
            Bus { converting: false },
            &PULSES,
            relays,
            PumpDriver::new(Pwm::default()),
        )
    }

    #[test]
    fn sensor_port_forwards_to_bus_and_counter() {
        let mut hw = adapter();
        hw.request_conversion().unwrap();
        assert!(hw.bus.converting);
        assert_eq!(hw.read_celsius(SensorRole::Boiler), Ok(78.4));
        assert!(hw.read_celsius(SensorRole::Output).is_err());

        PULSES.on_edge();
        PULSES.on_edge();
        assert_eq!(hw.drain_flow_pulses(), 2);
        assert_eq!(hw.drain_flow_pulses(), 0);
    }

    #[test]
    fn actuator_port_drives_relays() {
        let mut hw = adapter();
        hw.set_heater_one(true).unwrap();
        hw.set_valve(true).unwrap();
        hw.set_pump_duty(1000).unwrap();
        assert!(hw.relays().heater_one.is_on());
        assert!(hw.relays().valve.is_on());
        assert_eq!(hw.pump().duty(), 1000);

        hw.all_off().unwrap();
        assert!(!hw.relays().heater_one.is_on());
        assert!(!hw.relays().valve.is_on());
        assert!(!hw.pump().is_running());
    }
}
