//! Host simulator for the checkout terminal.
//!
//! Runs the real terminal core against an in-memory flash. Every line
//! read from stdin is fed byte by byte into the receive queue, exactly as
//! the UART interrupt would, and replies are written to stdout. Lines
//! starting with `!` stand in for the hardware around the core:
//!
//! ```text
//! !begin | !checkout | !pay      operator panel
//! !sensor <celsius> <humidity>   environment reading
//! !dump                          catalog dump to stdout
//! ```
//!
//! A 1 Hz thread plays the part of the periodic timer interrupt.
use checkout_terminal_lib::{
    config::{DATA_SECTORS, PAGE_SIZE, RECORDS_ADDRESS, RING_BUFFER_SIZE, SECTOR_SIZE},
    devices::{
        catalog::Catalog,
        interfaces::{Display, Door, Input, Panel},
        protocol::{ring_buffer::RingBuffer, Decoder},
        terminal::{cart::CartLine, SensorReading, StateMirror, Terminal},
    },
    drivers::clock::SecondsClock,
    hal::{doubles::flash::FakeFlash, serial},
    log_error, log_info, log_warn,
};
use std::{
    io::{self, BufRead, Write},
    sync::mpsc::{self, Receiver, Sender},
    thread,
    time::Duration,
};

static CLOCK: SecondsClock = SecondsClock::new();
static MIRROR: StateMirror = StateMirror::new();

/// Byte transport over a standard stream.
struct Console<W: Write>(W);

impl<W: Write> serial::Write for Console<W> {
    type Error = io::ErrorKind;

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.write_all(bytes).and_then(|_| self.0.flush()).map_err(|e| e.kind())
    }
}

struct ConsoleDisplay {
    lines: usize,
}

impl Display for ConsoleDisplay {
    fn load_cart(&mut self, lines: &[CartLine]) { self.lines = lines.len(); }
    fn render_list(&mut self) { log_info!("[Display] {} products in cart", self.lines); }
    fn render_total(&mut self, total: f32) { log_info!("[Display] Total: {:.2}", total); }
}

struct ChannelPanel(Receiver<Input>);

impl Panel for ChannelPanel {
    fn poll_input(&mut self) -> Option<Input> { self.0.try_recv().ok() }
}

struct ConsoleDoor;

impl Door for ConsoleDoor {
    fn open(&mut self) { log_info!("[Door] Opened"); }
    fn close(&mut self) { log_info!("[Door] Closed"); }
}

enum Control {
    Sensor(SensorReading),
    Dump,
    Quit,
}

fn operator_line(line: &str, inputs: &Sender<Input>, controls: &Sender<Control>) {
    let mut words = line.trim_start_matches('!').split_whitespace();
    let sent = match words.next() {
        Some("begin") => inputs.send(Input::Begin).is_ok(),
        Some("checkout") => inputs.send(Input::Checkout).is_ok(),
        Some("pay") => inputs.send(Input::ConfirmPayment).is_ok(),
        Some("dump") => controls.send(Control::Dump).is_ok(),
        Some("sensor") => {
            let temperature = words.next().and_then(|w| w.parse().ok());
            let humidity = words.next().and_then(|w| w.parse().ok());
            match (temperature, humidity) {
                (Some(temperature), Some(humidity)) => controls
                    .send(Control::Sensor(SensorReading { temperature, humidity }))
                    .is_ok(),
                _ => {
                    log_warn!("[Sim] Usage: !sensor <celsius> <humidity>");
                    true
                }
            }
        }
        _ => {
            log_warn!("[Sim] Unknown operator command: {}", line);
            true
        }
    };
    if !sent {
        log_error!("[Sim] Terminal loop is gone");
    }
}

fn main() {
    let ring: &'static mut RingBuffer<RING_BUFFER_SIZE> = Box::leak(Box::new(RingBuffer::new()));
    let (mut producer, consumer) = ring.split();
    let mut decoder: Decoder<'_> = Decoder::new(consumer);
    let (inputs, panel) = mpsc::channel();
    let (controls, control_queue) = mpsc::channel();

    thread::spawn(|| loop {
        thread::sleep(Duration::from_secs(1));
        CLOCK.tick();
    });

    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if line.starts_with('!') {
                operator_line(&line, &inputs, &controls);
                continue;
            }
            for byte in line.bytes().chain(Some(b'\n')) {
                // A piped file outruns the loop; hold back instead of dropping.
                while producer.ingest_byte(byte).is_err() {
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
        controls.send(Control::Quit).ok();
    });

    let device_size = RECORDS_ADDRESS as usize + DATA_SECTORS * SECTOR_SIZE;
    let catalog = Catalog::init(FakeFlash::new(PAGE_SIZE, SECTOR_SIZE, device_size));
    let mut terminal = Terminal::new(
        catalog,
        Console(io::stdout()),
        ConsoleDisplay { lines: 0 },
        ChannelPanel(panel),
        ConsoleDoor,
        &CLOCK,
        Some(&MIRROR),
    );
    log_info!("[Sim] Terminal ready");

    let mut closing = false;
    loop {
        for control in control_queue.try_iter() {
            match control {
                Control::Sensor(reading) if MIRROR.should_refresh_sensors() => {
                    terminal.on_sensor_reading(reading)
                }
                Control::Sensor(_) => log_info!("[Sim] Sensor reading skipped while syncing"),
                Control::Dump => {
                    if let Err(error) = terminal.catalog().dump(&mut Console(io::stdout())) {
                        error.report(&mut Console(io::stderr()));
                    }
                }
                Control::Quit => closing = true,
            }
        }

        if let Err(error) = terminal.step(&mut decoder) {
            error.report(&mut Console(io::stderr()));
        }

        if closing && decoder.is_drained() {
            log_info!("[Sim] Input closed, shutting down");
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
}
