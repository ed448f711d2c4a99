mod cli;
mod console;
mod delegate;
mod device_enumerator;
mod sim_capture;
mod sim_playback;

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::mpsc::TryRecvError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use ringdeck_core::{TransportController, TransportError};

use cli::Args;
use console::Command;
use delegate::ConsoleDelegate;
use sim_capture::SimulatedCapture;
use sim_playback::SimulatedPlayback;

type Transport = TransportController<SimulatedCapture, SimulatedPlayback>;

fn main() -> ExitCode {
    let args = Args::parse();
    cli::init_logging(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("ringdeck: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Startup errors are returned; everything inside the loop is reported by
/// the delegate and the loop carries on.
fn run(args: &Args) -> Result<(), TransportError> {
    let config = args.to_config();
    let tick = Duration::from_millis(config.tick_interval_ms);

    let capture = SimulatedCapture::new(tick, args.capture_speed, args.tone_hz);
    let playback = SimulatedPlayback::new(tick, args.playback_speed);
    let mut transport = TransportController::new(capture, playback, config)?;
    transport.set_delegate(Arc::new(ConsoleDelegate));

    println!("{}\n", console::HELP);
    let commands = console::spawn_stdin_reader()?;

    let mut last_line = String::new();
    'control: loop {
        loop {
            match commands.try_recv() {
                Ok(Command::Quit) | Err(TryRecvError::Disconnected) => break 'control,
                Ok(command) => handle_command(&mut transport, command),
                Err(TryRecvError::Empty) => break,
            }
        }

        // Failures are already reported through the delegate.
        let _ = transport.tick();

        let line = format!(
            "{} : Underruns {}",
            transport.status(),
            transport.playback_device().underruns()
        );
        if line != last_line {
            print!("{}\r", line);
            let _ = io::stdout().flush();
            last_line = line;
        }

        thread::sleep(tick);
    }

    println!();
    let result = transport.stop();
    log::info!(
        "last playback: {} bytes, {} underruns",
        transport.playback_device().bytes_played(),
        transport.playback_device().underruns()
    );
    result
}

fn handle_command(transport: &mut Transport, command: Command) {
    let _ = match command {
        Command::Record => transport.record(),
        Command::Play => transport.play(),
        Command::ToggleLoop => {
            transport.toggle_loop();
            Ok(())
        }
        Command::Stop => transport.stop(),
        Command::Save => {
            println!("\nWriting to {} ...", transport.config().output_path.display());
            transport.save().map(|_| ())
        }
        Command::Devices => transport.available_devices().map(|devices| {
            let active = transport.capture_device().active_device().map(|d| d.id.as_str());
            println!();
            for device in &devices {
                println!(
                    "{} {:?} {:<14} {}{}",
                    if active == Some(device.id.as_str()) { "*" } else { " " },
                    device.kind,
                    device.id,
                    device.name,
                    if device.is_default { " (default)" } else { "" }
                );
            }
        }),
        Command::Quit => Ok(()),
    };
}
