use clap::Parser;
use dds409b::{
    Channel, Generator, ProfileTable, SerialSettings, SerialTransport, TableEntry,
    DEFAULT_MULTIPLIER, TABLE_HOLD_MS,
};
use log::info;
use std::io::{self, BufRead, Write};
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "generator_cli")]
#[command(about = "Console for the Novatech 409B DDS signal generator")]
struct Args {
    /// Serial port of the generator. Asks for one when omitted.
    #[arg(short, long)]
    port: Option<String>,
    #[arg(short, long, default_value_t = 19200)]
    baud: u32,
    /// Time to wait for response lines after each command.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,
    /// Run from an external reference clock of this frequency.
    #[arg(long)]
    external_reference_hz: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_MULTIPLIER)]
    multiplier: u32,
}

// The main entry point for the command-line console.
fn main() {
    env_logger::init();
    let args = Args::parse();

    println!("==========================");
    println!("  Novatech 409B Console   ");
    println!("==========================");

    let path = match args.port {
        Some(path) => path,
        None => choose_port().unwrap_or_else(|| process::exit(1)),
    };
    let settings = SerialSettings {
        path,
        baud_rate: args.baud,
        timeout: Duration::from_millis(args.timeout_ms),
    };

    let mut generator = match Generator::open(&settings) {
        Ok(generator) => generator,
        Err(e) => {
            eprintln!("[ERROR] Failed to open port '{}': {}", settings.path, e);
            process::exit(1);
        }
    };

    if let Err(e) = generator.disable_echo() {
        eprintln!("[ERROR] Could not disable echo: {}", e);
    }
    if let Some(reference_hz) = args.external_reference_hz {
        if let Err(e) = generator.use_external_clock(reference_hz, args.multiplier) {
            eprintln!("[ERROR] Could not switch to the external clock: {}", e);
            process::exit(1);
        }
    }
    info!("connected to {} at {} baud", settings.path, settings.baud_rate);

    // Main menu loop.
    loop {
        println!("\nSelect mode:");
        println!("  1. Manual Command Input");
        println!("  2. Load Demo Table");
        println!("  3. Read Back Table");
        println!("  4. Device Status");
        println!("  5. Exit");

        let Some(choice) = prompt("> ") else { break };
        match choice.as_str() {
            "1" => run_manual_mode(&mut generator),
            "2" => load_demo_table(&mut generator),
            "3" => read_back_table(&mut generator),
            "4" => show_status(&mut generator),
            "5" => break,
            _ => eprintln!("[ERROR] Invalid choice. Please enter 1 to 5."),
        }
    }
}

// Prints `message` and reads one trimmed line. `None` on end of input.
fn prompt(message: &str) -> Option<String> {
    print!("{}", message);
    io::stdout().flush().ok()?;
    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()),
    }
}

// Lists the available serial ports and lets the user pick one.
fn choose_port() -> Option<String> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            eprintln!("[ERROR] Could not enumerate serial ports: {}", e);
            return None;
        }
    };

    if ports.is_empty() {
        eprintln!("[ERROR] No serial ports found.");
        return None;
    }

    println!("Available serial ports:");
    for (i, port) in ports.iter().enumerate() {
        println!("  {}: {}", i, port.port_name);
    }

    match prompt("Select a port (number): ")?.parse::<usize>() {
        Ok(i) if i < ports.len() => Some(ports[i].port_name.clone()),
        _ => {
            eprintln!("[ERROR] Invalid port selection.");
            None
        }
    }
}

// Sends raw command lines until the user types 'back'.
fn run_manual_mode(generator: &mut Generator<SerialTransport>) {
    println!("\n--- Manual Mode ---");
    println!("Enter commands, or type 'back' to return to the main menu.");
    print!("> ");
    let _ = io::stdout().flush();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(input) = line else { break };
        let command = input.trim();

        if command == "back" {
            break;
        }

        if !command.is_empty() {
            match generator.send_raw(command) {
                Ok(response) => response.iter().for_each(|line| println!("< {}", line)),
                Err(e) => eprintln!("[ERROR] {}", e),
            }
        }
        print!("> ");
        let _ = io::stdout().flush();
    }
}

// Two points on both channels: 1 MHz held at zero amplitude until triggered, then full scale.
fn load_demo_table(generator: &mut Generator<SerialTransport>) {
    let rows = vec![
        TableEntry::new(1e6, 0.0, 0.0, TABLE_HOLD_MS),
        TableEntry::new(1e6, 0.0, 1.0, 0.0),
    ];
    let result = ProfileTable::new(rows.clone(), rows)
        .and_then(|table| generator.fill_table(&table))
        .and_then(|program| generator.toggle_table().map(|_| program));

    match result {
        Ok(program) => {
            for command in &program.commands {
                println!("  {}", command);
            }
            println!("Table loaded and enabled. Send 'TS' to advance.");
        }
        Err(e) => eprintln!("[ERROR] Table upload failed: {}", e),
    }
}

fn read_back_table(generator: &mut Generator<SerialTransport>) {
    let channel = match prompt("Channel (0 or 1): ").map(|s| s.parse::<u8>()) {
        Some(Ok(n)) => match Channel::new(n).and_then(Channel::require_table) {
            Ok(channel) => channel,
            Err(e) => {
                eprintln!("[ERROR] {}", e);
                return;
            }
        },
        _ => {
            eprintln!("[ERROR] Invalid channel.");
            return;
        }
    };
    let points = match prompt("Number of profile points: ").map(|s| s.parse::<usize>()) {
        Some(Ok(n)) => n,
        _ => {
            eprintln!("[ERROR] Invalid number of points.");
            return;
        }
    };

    match generator.read_table(channel, points) {
        Ok(records) => {
            for (i, record) in records.iter().enumerate() {
                println!("Profile point: {:04x}", i);
                println!("Frequency: {} MHz", record.frequency_mhz);
                println!("Phase: {}", record.phase_degrees);
                println!("Amplitude: {}", record.amplitude);
                println!("Dwell time: {}\n", record.dwell);
            }
        }
        Err(e) => eprintln!("[ERROR] Readback failed: {}", e),
    }
}

fn show_status(generator: &mut Generator<SerialTransport>) {
    match generator.status() {
        Ok(lines) => lines.iter().for_each(|line| println!("< {}", line)),
        Err(e) => eprintln!("[ERROR] Status request failed: {}", e),
    }
}
