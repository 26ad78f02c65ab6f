//! Terminal orchestration.
//!
//! The terminal owns every piece of mutable state in the application
//! loop: the catalog, the sync session, the shopping flow and the cart.
//! Each loop iteration feeds at most one protocol event through
//! [`Terminal::handle_event`] and then advances the shopping flow with
//! whatever the operator panel reports.
//!
//! Shopping flow:
//!
//! ```text
//!  Idle --Begin--> Scanning --Checkout--> AwaitingConfirmation
//!   ^                  ^                     |        |
//!   |                  +------timeout--------+        |
//!   +---------------------ConfirmPayment--------------+
//! ```
//!
//! `Emergency` is entered from any non syncing state on out of range
//! sensor readings, and `Syncing` for the duration of a sync session.
use crate::{
    config::{MAX_HUMIDITY, MAX_TEMPERATURE, PAYMENT_TIMEOUT_S},
    devices::{
        catalog::Catalog,
        interfaces::{Display, Door, Input, Panel},
        protocol::{
            reply::{Alarm, Reply},
            Decoder, Event,
        },
        sync::SyncSession,
    },
    error::Error,
    hal::{
        flash::BlockDevice,
        serial,
        time::{Now, Seconds, Tick},
    },
};
use cart::{Cart, CartFull};
use core::sync::atomic::{AtomicU8, Ordering};

pub mod cart;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
#[repr(u8)]
pub enum TerminalState {
    Idle = 0,
    Scanning = 1,
    AwaitingConfirmation = 2,
    Emergency = 3,
    Syncing = 4,
}

impl TerminalState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => TerminalState::Scanning,
            2 => TerminalState::AwaitingConfirmation,
            3 => TerminalState::Emergency,
            4 => TerminalState::Syncing,
            _ => TerminalState::Idle,
        }
    }
}

/// Copy of the terminal state readable from the tick interrupt.
///
/// Written only by the application loop. The tick context may observe a
/// transition one tick late.
pub struct StateMirror(AtomicU8);

impl StateMirror {
    pub const fn new() -> Self { Self(AtomicU8::new(TerminalState::Idle as u8)) }

    pub fn publish(&self, state: TerminalState) { self.0.store(state as u8, Ordering::Release) }

    pub fn load(&self) -> TerminalState { TerminalState::from_u8(self.0.load(Ordering::Acquire)) }

    /// Sensors are left alone while the catalog is being rewritten.
    pub fn should_refresh_sensors(&self) -> bool { self.load() != TerminalState::Syncing }
}

impl Default for StateMirror {
    fn default() -> Self { Self::new() }
}

/// Current terminal state plus the one it came from, so a sync session
/// can hand control back to whatever it interrupted.
pub struct StateRegister<'a> {
    current: TerminalState,
    previous: TerminalState,
    mirror: Option<&'a StateMirror>,
}

impl<'a> StateRegister<'a> {
    pub fn new(initial: TerminalState) -> Self {
        Self { current: initial, previous: initial, mirror: None }
    }

    pub fn mirrored(initial: TerminalState, mirror: &'a StateMirror) -> Self {
        mirror.publish(initial);
        Self { current: initial, previous: initial, mirror: Some(mirror) }
    }

    pub fn current(&self) -> TerminalState { self.current }

    pub fn previous(&self) -> TerminalState { self.previous }

    pub fn transition(&mut self, to: TerminalState) {
        self.previous = self.current;
        self.current = to;
        if let Some(mirror) = self.mirror {
            mirror.publish(to);
        }
    }

    /// Returns to the state preceding the last transition.
    pub fn restore(&mut self) { self.transition(self.previous) }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorReading {
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity, percent
    pub humidity: u8,
}

impl SensorReading {
    pub fn exceeds_limits(&self) -> bool {
        self.temperature > MAX_TEMPERATURE || self.humidity > MAX_HUMIDITY
    }
}

pub struct Terminal<'a, F, S, D, P, R, C>
where
    F: BlockDevice,
    S: serial::Write,
    D: Display,
    P: Panel,
    R: Door,
    C: Now,
{
    catalog: Catalog<F>,
    serial: S,
    display: D,
    panel: P,
    door: R,
    clock: &'a C,
    session: SyncSession,
    state: StateRegister<'a>,
    cart: Cart,
    awaiting_since: Tick,
}

impl<'a, F, S, D, P, R, C> Terminal<'a, F, S, D, P, R, C>
where
    F: BlockDevice,
    Error: From<F::Error>,
    S: serial::Write,
    D: Display,
    P: Panel,
    R: Door,
    C: Now,
{
    pub fn new(
        catalog: Catalog<F>,
        serial: S,
        display: D,
        panel: P,
        door: R,
        clock: &'a C,
        mirror: Option<&'a StateMirror>,
    ) -> Self {
        let state = match mirror {
            Some(mirror) => StateRegister::mirrored(TerminalState::Idle, mirror),
            None => StateRegister::new(TerminalState::Idle),
        };
        Self {
            catalog,
            serial,
            display,
            panel,
            door,
            clock,
            session: SyncSession::new(),
            state,
            cart: Cart::new(),
            awaiting_since: Tick::default(),
        }
    }

    pub fn state(&self) -> TerminalState { self.state.current() }
    pub fn session(&self) -> &SyncSession { &self.session }
    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn catalog(&mut self) -> &mut Catalog<F> { &mut self.catalog }
    pub fn serial(&mut self) -> &mut S { &mut self.serial }
    pub fn display(&self) -> &D { &self.display }
    pub fn panel(&mut self) -> &mut P { &mut self.panel }
    pub fn door(&self) -> &R { &self.door }

    /// Shuts the terminal down, handing back its catalog.
    pub fn into_catalog(self) -> Catalog<F> { self.catalog }

    /// One application loop iteration.
    pub fn step<const N: usize, const L: usize>(
        &mut self,
        decoder: &mut Decoder<'_, N, L>,
    ) -> Result<(), Error> {
        if let Some(event) = decoder.try_parse_line() {
            self.handle_event(event)?;
        }
        self.advance()
    }

    pub fn handle_event(&mut self, event: Event) -> Result<(), Error> {
        match event {
            Event::SyncStart { expected_count } => self.session.on_sync_start(
                expected_count,
                &mut self.catalog,
                &mut self.state,
                &mut self.serial,
            ),
            Event::SyncData(data) => {
                self.session.on_sync_data(&data, &mut self.catalog, &mut self.serial)
            }
            Event::SyncEnd { reported_count } => self.session.on_sync_end(
                reported_count,
                self.clock.now(),
                &mut self.catalog,
                &mut self.state,
                &mut self.serial,
            ),
            Event::Scan { id } => self.on_scan(id),
        }
    }

    fn on_scan(&mut self, id: Option<u64>) -> Result<(), Error> {
        let shopping = matches!(self.state.current(), TerminalState::Idle | TerminalState::Scanning);
        if !shopping || !self.session.is_idle() {
            log_warn!("[Scan] Rejected, terminal busy");
            return Reply::Alarm(Alarm::SystemBusy).send(&mut self.serial);
        }

        let id = match id {
            Some(id) => id,
            None => return Reply::Alarm(Alarm::InvalidId).send(&mut self.serial),
        };

        let record = match self.catalog.find_by_id(id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                log_info!("[Scan] Item {} not found", id);
                return Reply::Alarm(Alarm::ItemNotFound).send(&mut self.serial);
            }
            Err(_) => {
                log_error!("[Scan] Catalog lookup failed for item {}", id);
                return Reply::Alarm(Alarm::ItemNotFound).send(&mut self.serial);
            }
        };

        let line = match self.cart.add(record) {
            Ok(line) => line,
            Err(CartFull) => {
                log_warn!("[Scan] Cart full, item {} not added", id);
                return Reply::Alarm(Alarm::CartFull).send(&mut self.serial);
            }
        };
        log_info!("[Scan] Item {} added, quantity {}", id, line.quantity);
        Reply::Report(&line.record).send(&mut self.serial)?;
        self.refresh_display();
        Ok(())
    }

    /// Advances the shopping flow: operator inputs and the payment timeout.
    pub fn advance(&mut self) -> Result<(), Error> {
        let current = self.state.current();
        let input = match current {
            TerminalState::Idle | TerminalState::Scanning | TerminalState::AwaitingConfirmation => {
                self.panel.poll_input()
            }
            TerminalState::Emergency | TerminalState::Syncing => None,
        };

        match (current, input) {
            (TerminalState::Idle, Some(Input::Begin)) => {
                log_info!("[Shop] Shopping started");
                self.door.pulse();
                self.state.transition(TerminalState::Scanning);
            }
            (TerminalState::Scanning, Some(Input::Checkout)) => {
                log_info!("[Shop] Awaiting payment confirmation");
                self.awaiting_since = self.clock.now();
                self.state.transition(TerminalState::AwaitingConfirmation);
            }
            (TerminalState::AwaitingConfirmation, Some(Input::ConfirmPayment)) => {
                return self.confirm_payment();
            }
            (TerminalState::AwaitingConfirmation, _)
                if self.clock.now() - self.awaiting_since >= Seconds(PAYMENT_TIMEOUT_S) =>
            {
                log_info!("[Shop] Payment timed out, back to scanning");
                self.state.transition(TerminalState::Scanning);
            }
            _ => {}
        }
        Ok(())
    }

    fn confirm_payment(&mut self) -> Result<(), Error> {
        let total = self.cart.distinct() as u32;
        log_info!("[Shop] Payment confirmed for {} products", total);
        self.door.pulse();
        self.cart.clear();
        self.refresh_display();
        self.state.transition(TerminalState::Idle);
        Reply::PayOff { total }.send(&mut self.serial)
    }

    /// Feeds a fresh sensor sample. Readings are ignored while syncing,
    /// since the tick context stops refreshing them.
    pub fn on_sensor_reading(&mut self, reading: SensorReading) {
        match self.state.current() {
            TerminalState::Syncing => {}
            TerminalState::Emergency if !reading.exceeds_limits() => {
                log_info!("[Emergency] Readings back to normal");
                self.door.close();
                self.cart.clear();
                self.refresh_display();
                self.state.transition(TerminalState::Idle);
            }
            TerminalState::Emergency => {}
            _ if reading.exceeds_limits() => {
                log_error!(
                    "[Emergency] Limits exceeded. Temperature: {}, humidity: {}",
                    reading.temperature,
                    reading.humidity
                );
                self.door.open();
                self.state.transition(TerminalState::Emergency);
            }
            _ => {}
        }
    }

    fn refresh_display(&mut self) {
        self.display.load_cart(self.cart.lines());
        self.display.render_list();
        self.display.render_total(self.cart.total());
    }
}
