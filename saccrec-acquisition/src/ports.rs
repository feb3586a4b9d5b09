const SIMULATED_PORTS: [&str; 2] = ["/dev/ttyUSB0", "/dev/ttyUSB1"];
const PORT_PREFIXES: [&str; 4] = ["ttyUSB", "ttyACM", "cu.usbserial", "COM"];

/// Candidate serial devices for the board, sorted by name.
pub fn list_ports(simulated: bool) -> Vec<String> {
    if simulated {
        return SIMULATED_PORTS.iter().map(|p| p.to_string()).collect();
    }
    match serialport::available_ports() {
        Ok(ports) => candidate_ports(ports.into_iter().map(|info| info.port_name)),
        Err(err) => {
            tracing::warn!(error = %err, "cannot enumerate serial ports");
            Vec::new()
        }
    }
}

/// Keeps the device names a USB serial dongle shows up under.
fn candidate_ports(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut ports: Vec<String> = names
        .into_iter()
        .filter(|name| {
            let device = name.rsplit('/').next().unwrap_or(name);
            PORT_PREFIXES.iter().any(|prefix| device.starts_with(prefix))
        })
        .collect();
    ports.sort();
    ports.dedup();
    tracing::debug!(count = ports.len(), "serial ports found");
    ports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_lists_fixed_ports() {
        assert_eq!(list_ports(true), vec!["/dev/ttyUSB0", "/dev/ttyUSB1"]);
    }

    #[test]
    fn keeps_usb_serial_devices() {
        let found = [
            "/dev/ttyUSB1",
            "/dev/ttyS0",
            "/dev/cu.usbserial-DM01",
            "/dev/ttyACM0",
            "COM3",
            "/dev/ttyUSB1",
            "/dev/cu.Bluetooth-Incoming-Port",
        ];
        let ports = candidate_ports(found.iter().map(|p| p.to_string()));
        assert_eq!(
            ports,
            vec!["/dev/cu.usbserial-DM01", "/dev/ttyACM0", "/dev/ttyUSB1", "COM3"]
        );
        assert!(candidate_ports(Vec::new()).is_empty());
    }
}
