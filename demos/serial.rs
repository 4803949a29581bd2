use std::env;

use dph5005::{
    psu::{DEFAULT_DEVICE_ADDRESS, Dph5005},
    register::Register,
    scaling,
    serial::{self, SerialConfig, SerialConnector},
};
use inquire::Select;

// Configuration constants - adjust these for your setup
const OUTPUT_VOLTAGE_MV: u32 = 5500; // 5.5V
const CURRENT_LIMIT_MA: u32 = 100; // 0.1A
const STABILIZATION_DELAY_MS: u64 = 1000;

fn main() {
    env_logger::init();

    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let port_names = serial::available_ports();

        if port_names.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        // Interactive selection
        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let psu = Dph5005::new(
        SerialConnector::new(SerialConfig::default()),
        DEFAULT_DEVICE_ADDRESS,
    )
    .unwrap();
    if !psu.connect(&port_name) {
        eprintln!("Failed to open {port_name}");
        std::process::exit(1);
    }

    // Get and display the product model
    let model_number = psu.get_model().unwrap();
    let version = psu.get_firmware_version().unwrap();
    println!("Product model: {} (firmware v{:.1})", model_number, version as f32 / 10.0);

    // Set output voltage and current limit in one go
    psu.set_output_limits(OUTPUT_VOLTAGE_MV, CURRENT_LIMIT_MA).unwrap();
    println!(
        "Set output voltage to {}V, current limit to {}A",
        OUTPUT_VOLTAGE_MV as f32 / 1000.0,
        CURRENT_LIMIT_MA as f32 / 1000.0
    );

    // Enable the output
    psu.set_output_state(true).unwrap();
    println!("Output enabled");

    // Wait for output to stabilize
    std::thread::sleep(std::time::Duration::from_millis(STABILIZATION_DELAY_MS));

    // Measure and display the output voltage
    let measured_voltage = psu.read_output_voltage_mv().unwrap();
    println!(
        "Measured output voltage: {:.3}V",
        measured_voltage as f32 / 1000.0
    );

    // Dump every register as the front panel would show it
    println!("\n--- Registers ---");
    let response = psu.read_registers(Register::VSet, 13).unwrap();
    for (register, raw) in response.iter() {
        println!("{:>8}: {}", register.name(), scaling::to_display(register, raw));
    }

    println!("\n--- Status ---");
    println!("{:#?}", psu.read_status().unwrap());

    psu.set_output_state(false).unwrap();
    println!("\nOutput disabled");
    psu.disconnect();
}
