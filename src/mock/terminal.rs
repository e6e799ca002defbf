use std::io::{self, Write};
use std::time::Instant;

use super::display::render_frame;
use super::{
    MemoryStore, ScriptedProvisioner, SimulatedBus, SimulatedClock, SimulatedLink,
    SimulatedTimeSync, TerminalDisplay,
};
use crate::app::{ClockApp, CycleReport};
use crate::config::ClockConfig;
use crate::connectivity::Supervisor;
use crate::control::control_channel;
use crate::time::TimeOfDay;

type SimulatedApp =
    ClockApp<TerminalDisplay, SimulatedClock, SimulatedLink, SimulatedBus, SimulatedTimeSync>;

/// Clears the screen and moves cursor to top-left.
#[inline]
fn clear_screen() {
    print!("\x1B[2J\x1B[H");
}

/// Runs an interactive terminal simulation of the clock face.
///
/// Each command is followed by one cycle of the render loop. Commands publish
/// on the simulated broker or break the simulated network, so overrides and
/// reconnects behave as they would on the device.
pub fn run_interactive_terminal(config: ClockConfig) {
    let (tx, inbox) = control_channel();
    let supervisor = Supervisor::new(
        SimulatedLink::new(),
        SimulatedBus::with_sender(tx),
        SimulatedTimeSync::new(),
        config.clone(),
    );
    let mut app = ClockApp::new(
        supervisor,
        TerminalDisplay::new(),
        SimulatedClock::new(),
        inbox,
    );

    // Stands in for the setup page when no credentials were built in
    let mut provisioner = ScriptedProvisioner::with_submission(ClockConfig {
        wifi_ssid: "simulated".into(),
        mqtt_host: "localhost".into(),
        ..config
    });
    if let Err(e) = app.start(Instant::now(), &mut provisioner, &mut MemoryStore::new()) {
        eprintln!("Failed to start: {}", e);
        return;
    }

    let mut status = cycle(&mut app);
    let mut link_blocked = false;

    loop {
        print!("> ");
        if let Err(e) = io::stdout().flush() {
            eprintln!("Failed to flush stdout: {}", e);
            break;
        }

        let mut input = String::new();
        if let Err(e) = io::stdin().read_line(&mut input) {
            eprintln!("Failed to read input: {}", e);
            break;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        let arg = parts.get(1).copied().unwrap_or("");

        let note = match parts[0] {
            "c" => publish(&app, Topic::Color, arg),
            "b" => publish(&app, Topic::Brightness, arg),
            "t" if arg == "now" => {
                app.clock_mut().unpin();
                "Following host clock".to_string()
            }
            "t" => match arg.parse::<TimeOfDay>() {
                Ok(time) => {
                    app.clock_mut().pin(time);
                    format!("Time pinned to {time}")
                }
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            },
            "drop" => {
                app.supervisor_mut().bus_mut().drop_session();
                "Broker session dropped".to_string()
            }
            "link" => {
                let link = app.supervisor_mut().link_mut();
                link_blocked = !link_blocked;
                if link_blocked {
                    // No SSID matches the empty name
                    link.set_reachable_ssid("");
                    link.drop_link();
                    "Wi-Fi out of range".to_string()
                } else {
                    link.reach_all();
                    "Wi-Fi back in range".to_string()
                }
            }
            "n" => String::new(),
            "p" => {
                redraw(&app, &status);
                continue;
            }
            "q" => break,
            _ => {
                println!("Unknown command");
                continue;
            }
        };

        status = cycle(&mut app);
        if !note.is_empty() {
            println!("\n{note}");
        }
    }
}

#[derive(Clone, Copy)]
enum Topic {
    Color,
    Brightness,
}

fn publish(app: &SimulatedApp, topic: Topic, payload: &str) -> String {
    let config = app.supervisor().config();
    let topic = match topic {
        Topic::Color => &config.color_topic,
        Topic::Brightness => &config.brightness_topic,
    };
    if app.supervisor().bus().publish(topic, payload.as_bytes()) {
        format!("Published '{payload}' to {topic}")
    } else {
        format!("Broker offline, '{payload}' on {topic} was lost")
    }
}

/// Run one loop iteration and redraw. Returns the status line shown.
fn cycle(app: &mut SimulatedApp) -> String {
    clear_screen();
    draw_header();
    match app.tick(Instant::now()) {
        Ok(report) => {
            let status = status_line(&report);
            println!("{status}");
            status
        }
        Err(e) => {
            let status = format!("Display error: {e}");
            println!("{status}");
            status
        }
    }
}

fn redraw(app: &SimulatedApp, status: &str) {
    clear_screen();
    draw_header();
    let brightness = app.overrides().brightness();
    if let Err(e) = render_frame(&mut io::stdout(), app.frame(), brightness) {
        eprintln!("Failed to draw frame: {}", e);
    }
    println!("{status}");
}

fn draw_header() {
    println!("🕒 Ring Clock Simulator");
    println!();
    println!(
        "Commands: c <#rrggbb> | b <0-255> | t <HH:MM|now> | drop | link (toggle) | n (next) | p (refresh) | q (quit)"
    );
    println!();
}

fn status_line(report: &CycleReport) -> String {
    let connection = report.service.connection;
    format!(
        "{} | {:?} | wifi {} | mqtt {} | color #{:02x}{:02x}{:02x}{}{}",
        report.time,
        report.service.state,
        if connection.link_up { "up" } else { "down" },
        if connection.bus_connected { "up" } else { "down" },
        report.color.r,
        report.color.g,
        report.color.b,
        if report.service.override_cleared {
            " | override cleared"
        } else {
            ""
        },
        if report.service.resynced { " | time synced" } else { "" },
    )
}
